//! Error types with fix suggestions
//!
//! Every failure the engine can produce carries a `PF-0xx` code and belongs to
//! one [`ErrorClass`]. Configuration errors are fatal at construction time;
//! the other classes are caught at the dispatch boundary and turned into
//! error notifications.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tree::NodeId;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// Error taxonomy used for routing and for the title of error notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    Configuration,
    Navigation,
    Handler,
    Internal,
}

impl ErrorClass {
    /// Human-readable title shown by renderers
    pub fn title(&self) -> &'static str {
        match self {
            ErrorClass::Configuration => "Configuration error",
            ErrorClass::Navigation => "Navigation error",
            ErrorClass::Handler => "Handler error",
            ErrorClass::Internal => "Internal error",
        }
    }
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Error, Debug)]
pub enum PanelFlowError {
    // ─────────────────────────────────────────────────────────────
    // Configuration errors (PF-010 to PF-014), fatal
    // ─────────────────────────────────────────────────────────────
    #[error("PF-010: Cannot read config '{path}': {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("PF-011: Config parse error: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("PF-012: Config does not match schema: {details}")]
    SchemaViolation { details: String },

    #[error("PF-013: Config integrity check failed:\n{}", format_problems(.problems))]
    Integrity { problems: Vec<String> },

    #[error("PF-014: Entry panel '{panel_id}' not found")]
    MissingEntryPanel { panel_id: String },

    // ─────────────────────────────────────────────────────────────
    // Navigation errors (PF-020 to PF-022), recovered
    // ─────────────────────────────────────────────────────────────
    #[error("PF-020: Panel '{panel_id}' not found in template registry")]
    UnknownPanel { panel_id: String },

    #[error("PF-021: No panel in the tree owns widget '{widget_id}'")]
    UnknownWidget { widget_id: String },

    #[error("PF-022: Inline panel '{panel_id}' is invalid: {details}")]
    InvalidInlinePanel { panel_id: String, details: String },

    // ─────────────────────────────────────────────────────────────
    // Handler errors (PF-030 to PF-031), recovered
    // ─────────────────────────────────────────────────────────────
    #[error("PF-030: Handler '{name}' is not registered")]
    HandlerNotRegistered { name: String },

    #[error("PF-031: Handler '{name}' failed on widget '{widget_id}': {message}")]
    HandlerFailed {
        name: String,
        widget_id: String,
        message: String,
    },

    // ─────────────────────────────────────────────────────────────
    // Internal errors (PF-040 to PF-041), recovered but a defect
    // ─────────────────────────────────────────────────────────────
    #[error("PF-040: Node {node_id} is not part of the tree")]
    NodeNotFound { node_id: NodeId },

    #[error("PF-041: Tree invariant violated: {details}")]
    InvariantViolation { details: String },
}

fn format_problems(problems: &[String]) -> String {
    problems
        .iter()
        .map(|p| format!("  - {}", p))
        .collect::<Vec<_>>()
        .join("\n")
}

impl PanelFlowError {
    /// Which part of the taxonomy this error belongs to
    pub fn class(&self) -> ErrorClass {
        match self {
            PanelFlowError::ConfigRead { .. }
            | PanelFlowError::ConfigParse(_)
            | PanelFlowError::SchemaViolation { .. }
            | PanelFlowError::Integrity { .. }
            | PanelFlowError::MissingEntryPanel { .. } => ErrorClass::Configuration,
            PanelFlowError::UnknownPanel { .. }
            | PanelFlowError::UnknownWidget { .. }
            | PanelFlowError::InvalidInlinePanel { .. } => ErrorClass::Navigation,
            PanelFlowError::HandlerNotRegistered { .. } | PanelFlowError::HandlerFailed { .. } => {
                ErrorClass::Handler
            }
            PanelFlowError::NodeNotFound { .. } | PanelFlowError::InvariantViolation { .. } => {
                ErrorClass::Internal
            }
        }
    }

    /// Shorthand for building an invariant violation
    pub(crate) fn invariant(details: impl Into<String>) -> Self {
        PanelFlowError::InvariantViolation {
            details: details.into(),
        }
    }
}

impl FixSuggestion for PanelFlowError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            PanelFlowError::ConfigRead { .. } => Some("Check file path and permissions"),
            PanelFlowError::ConfigParse(_) => {
                Some("Check YAML/JSON syntax: indentation, quoting and brackets")
            }
            PanelFlowError::SchemaViolation { .. } => {
                Some("Every panel needs id and title; every widget needs id, type and title")
            }
            PanelFlowError::Integrity { .. } => {
                Some("Fix the listed references so every id and handler name resolves")
            }
            PanelFlowError::MissingEntryPanel { .. } => {
                Some("Set entryPanel to the id of a panel declared in panels")
            }
            PanelFlowError::UnknownPanel { .. } => {
                Some("Return a panel id that exists in the config, or an inline panel")
            }
            PanelFlowError::UnknownWidget { .. } => {
                Some("Submit only widgets that belong to a panel currently in the tree")
            }
            PanelFlowError::InvalidInlinePanel { .. } => {
                Some("Give every widget of an inline panel a unique id")
            }
            PanelFlowError::HandlerNotRegistered { .. } => {
                Some("Register the handler name in the HandlerRegistry before posting events")
            }
            PanelFlowError::HandlerFailed { .. } => {
                Some("Inspect the handler's on_widget_update for the reported failure")
            }
            PanelFlowError::NodeNotFound { .. } | PanelFlowError::InvariantViolation { .. } => {
                Some("This is a bug in the navigation engine, please report it")
            }
        }
    }
}
