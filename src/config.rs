//! Application config loading
//!
//! A config declares the entry panel and the panel templates. YAML and JSON
//! are both accepted (JSON is read through the YAML parser). Loading runs
//! three layers:
//!
//! 1. Parse text into a `serde_json::Value`
//! 2. Validate the value against the embedded JSON Schema
//! 3. Deserialize into [`ApplicationConfig`] and build a [`TemplateRegistry`]

use std::path::Path;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::PanelFlowError;
use crate::panel::PanelTemplate;
use crate::registry::TemplateRegistry;

/// Raw config as written by the user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    #[serde(rename = "entryPanel")]
    pub entry_panel: String,
    pub panels: Vec<PanelTemplate>,
}

impl ApplicationConfig {
    /// Check references and build the registry
    pub fn into_registry(self) -> Result<TemplateRegistry, PanelFlowError> {
        TemplateRegistry::new(self.entry_panel, self.panels)
    }
}

static CONFIG_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "required": ["entryPanel", "panels"],
        "properties": {
            "entryPanel": { "type": "string" },
            "panels": {
                "type": "array",
                "items": { "$ref": "#/definitions/panel" }
            }
        },
        "definitions": {
            "panel": {
                "type": "object",
                "required": ["id", "title"],
                "properties": {
                    "id": { "type": "string" },
                    "title": { "type": "string" },
                    "description": { "type": "string" },
                    "handler_class_name": { "type": ["string", "null"] },
                    "handler": { "type": ["string", "null"] },
                    "widgets": {
                        "type": "array",
                        "items": { "$ref": "#/definitions/widget" }
                    }
                }
            },
            "widget": {
                "type": "object",
                "required": ["id", "type", "title"],
                "properties": {
                    "id": { "type": "string" },
                    "type": {
                        "type": "string",
                        "enum": ["text_input", "button", "option_select", "panel_link"]
                    },
                    "title": { "type": "string" },
                    "value": {},
                    "handler_class_name": { "type": ["string", "null"] },
                    "handler": { "type": ["string", "null"] }
                },
                "allOf": [
                    {
                        "if": { "properties": { "type": { "const": "text_input" } } },
                        "then": { "properties": { "placeholder": { "type": "string" } } }
                    },
                    {
                        "if": { "properties": { "type": { "const": "option_select" } } },
                        "then": {
                            "properties": {
                                "options": { "type": "array", "items": { "type": "string" } }
                            }
                        }
                    },
                    {
                        "if": { "properties": { "type": { "const": "panel_link" } } },
                        "then": {
                            "required": ["target_panel_id"],
                            "properties": {
                                "target_panel_id": { "type": "string" },
                                "description": { "type": "string" }
                            }
                        }
                    }
                ]
            }
        }
    })
});

/// Validate a parsed config value against the schema
pub fn validate_schema(value: &Value) -> Result<(), PanelFlowError> {
    let validator =
        jsonschema::validator_for(&CONFIG_SCHEMA).map_err(|e| PanelFlowError::SchemaViolation {
            details: format!("embedded schema does not compile: {}", e),
        })?;

    let errors: Vec<String> = validator.iter_errors(value).map(|e| e.to_string()).collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(PanelFlowError::SchemaViolation {
            details: errors.join("; "),
        })
    }
}

/// Parse and validate config text into a raw [`ApplicationConfig`]
pub fn parse_application_config(source: &str) -> Result<ApplicationConfig, PanelFlowError> {
    let value: Value = serde_yaml::from_str(source)?;
    validate_schema(&value)?;
    serde_json::from_value(value).map_err(|e| PanelFlowError::SchemaViolation {
        details: e.to_string(),
    })
}

/// Parse, validate and check config text
pub fn parse_config(source: &str) -> Result<TemplateRegistry, PanelFlowError> {
    let registry = parse_application_config(source)?.into_registry()?;
    debug!(panels = registry.len(), "config parsed");
    Ok(registry)
}

/// Read a config file from disk
pub fn load_config(path: impl AsRef<Path>) -> Result<TemplateRegistry, PanelFlowError> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|source| PanelFlowError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    let registry = parse_config(&source)?;
    info!(
        path = %path.display(),
        panels = registry.len(),
        entry = registry.entry_panel_id(),
        "config loaded"
    );
    Ok(registry)
}
