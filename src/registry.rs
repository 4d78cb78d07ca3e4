//! Template registry: the immutable panel catalogue built at startup
//!
//! Construction enforces the reference contract: the entry panel exists,
//! panel and widget ids are unique, and every panel link resolves. Handler
//! names are checked separately against a [`HandlerRegistry`] because the
//! two are usually supplied by different parties.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::PanelFlowError;
use crate::handler::HandlerRegistry;
use crate::panel::PanelTemplate;

#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    entry_panel_id: String,
    panels: HashMap<String, Arc<PanelTemplate>>,
    /// Declaration order, for stable reporting
    order: Vec<String>,
}

impl TemplateRegistry {
    /// Build and check a registry; every problem found is reported at once
    pub fn new(
        entry_panel_id: impl Into<String>,
        panels: impl IntoIterator<Item = PanelTemplate>,
    ) -> Result<Self, PanelFlowError> {
        let entry_panel_id = entry_panel_id.into();
        let mut problems = Vec::new();
        let mut map: HashMap<String, Arc<PanelTemplate>> = HashMap::new();
        let mut order = Vec::new();

        for panel in panels {
            for dup in panel.duplicate_widget_ids() {
                problems.push(format!(
                    "Widget id '{}' is declared more than once in panel '{}'",
                    dup, panel.id
                ));
            }
            if map.contains_key(&panel.id) {
                problems.push(format!("Panel id '{}' is declared more than once", panel.id));
                continue;
            }
            order.push(panel.id.clone());
            map.insert(panel.id.clone(), Arc::new(panel));
        }

        if !map.contains_key(&entry_panel_id) {
            if problems.is_empty() {
                return Err(PanelFlowError::MissingEntryPanel {
                    panel_id: entry_panel_id,
                });
            }
            problems.insert(
                0,
                format!("Entry panel '{}' is not declared", entry_panel_id),
            );
        }

        for id in &order {
            let panel = &map[id];
            for widget in &panel.widgets {
                if let Some(target) = widget.link_target() {
                    if !map.contains_key(target) {
                        problems.push(format!(
                            "Target panel '{}' of link '{}' in panel '{}' is not declared",
                            target, widget.id, panel.id
                        ));
                    }
                }
            }
        }

        if !problems.is_empty() {
            return Err(PanelFlowError::Integrity { problems });
        }

        debug!(panels = order.len(), entry = %entry_panel_id, "template registry built");
        Ok(Self {
            entry_panel_id,
            panels: map,
            order,
        })
    }

    /// Check that every panel-level and widget-level handler name is registered
    pub fn validate_handlers(&self, handlers: &HandlerRegistry) -> Result<(), PanelFlowError> {
        let mut problems = Vec::new();
        for (panel_id, name) in self.handler_references() {
            if !handlers.contains(name) {
                problems.push(format!(
                    "Handler '{}' used by '{}' is not registered",
                    name, panel_id
                ));
            }
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(PanelFlowError::Integrity { problems })
        }
    }

    /// Every handler name referenced, as (owner, handler) pairs.
    /// Owners are `panel` or `panel.widget`.
    pub fn handler_references(&self) -> Vec<(String, &str)> {
        let mut refs = Vec::new();
        for panel in self.panels() {
            if let Some(name) = panel.handler.as_deref() {
                refs.push((panel.id.clone(), name));
            }
            for widget in &panel.widgets {
                if let Some(name) = widget.handler.as_deref() {
                    refs.push((format!("{}.{}", panel.id, widget.id), name));
                }
            }
        }
        refs
    }

    pub fn entry_panel_id(&self) -> &str {
        &self.entry_panel_id
    }

    /// Template of the entry panel
    pub fn entry(&self) -> Option<Arc<PanelTemplate>> {
        self.get(&self.entry_panel_id)
    }

    pub fn get(&self, panel_id: &str) -> Option<Arc<PanelTemplate>> {
        self.panels.get(panel_id).cloned()
    }

    pub fn contains(&self, panel_id: &str) -> bool {
        self.panels.contains_key(panel_id)
    }

    /// Panels in declaration order
    pub fn panels(&self) -> impl Iterator<Item = &PanelTemplate> {
        self.order.iter().filter_map(|id| self.panels.get(id)).map(|p| p.as_ref())
    }

    pub fn panel_ids(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.panels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }
}
