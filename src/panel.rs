//! Panel templates and widget descriptors
//!
//! Templates are immutable once built. Registry templates live as long as the
//! [`TemplateRegistry`](crate::registry::TemplateRegistry); handler-supplied
//! inline templates live as long as the nodes that reference them.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Context and form data of a node: widget id -> value
pub type FormData = serde_json::Map<String, Value>;

/// Immutable panel definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelTemplate {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub widgets: Vec<Widget>,
    /// Name of the handler invoked on widget submission
    #[serde(
        default,
        rename = "handler_class_name",
        alias = "handler",
        skip_serializing_if = "Option::is_none"
    )]
    pub handler: Option<String>,
}

impl PanelTemplate {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            widgets: Vec::new(),
            handler: None,
        }
    }

    pub fn with_widget(mut self, widget: Widget) -> Self {
        self.widgets.push(widget);
        self
    }

    pub fn with_handler(mut self, handler: impl Into<String>) -> Self {
        self.handler = Some(handler.into());
        self
    }

    /// Look up a widget by id
    pub fn widget(&self, widget_id: &str) -> Option<&Widget> {
        self.widgets.iter().find(|w| w.id == widget_id)
    }

    #[inline]
    pub fn has_widget(&self, widget_id: &str) -> bool {
        self.widget(widget_id).is_some()
    }

    /// Widget ids that appear more than once, in first-duplicate order
    pub fn duplicate_widget_ids(&self) -> Vec<&str> {
        let mut seen = HashSet::with_capacity(self.widgets.len());
        let mut dupes = Vec::new();
        for widget in &self.widgets {
            if !seen.insert(widget.id.as_str()) && !dupes.contains(&widget.id.as_str()) {
                dupes.push(widget.id.as_str());
            }
        }
        dupes
    }
}

/// A widget descriptor inside a panel template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    /// Unique within its panel
    pub id: String,
    pub title: String,
    /// Initial (or last submitted) value declared in the template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Overrides the panel handler for this widget
    #[serde(
        default,
        rename = "handler_class_name",
        alias = "handler",
        skip_serializing_if = "Option::is_none"
    )]
    pub handler: Option<String>,
    #[serde(flatten)]
    pub kind: WidgetKind,
}

impl Widget {
    pub fn new(id: impl Into<String>, title: impl Into<String>, kind: WidgetKind) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            value: None,
            handler: None,
            kind,
        }
    }

    pub fn text_input(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(
            id,
            title,
            WidgetKind::TextInput {
                placeholder: String::new(),
            },
        )
    }

    pub fn button(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(id, title, WidgetKind::Button {})
    }

    pub fn option_select(
        id: impl Into<String>,
        title: impl Into<String>,
        options: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self::new(
            id,
            title,
            WidgetKind::OptionSelect {
                options: options.into_iter().map(Into::into).collect(),
            },
        )
    }

    pub fn panel_link(
        id: impl Into<String>,
        title: impl Into<String>,
        target_panel_id: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            title,
            WidgetKind::PanelLink {
                target_panel_id: target_panel_id.into(),
                description: String::new(),
            },
        )
    }

    pub fn with_handler(mut self, handler: impl Into<String>) -> Self {
        self.handler = Some(handler.into());
        self
    }

    /// Target panel id if this widget is a panel link
    pub fn link_target(&self) -> Option<&str> {
        match &self.kind {
            WidgetKind::PanelLink {
                target_panel_id, ..
            } => Some(target_panel_id),
            _ => None,
        }
    }
}

/// The four widget variants, tagged by `type` in config files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WidgetKind {
    TextInput {
        #[serde(default)]
        placeholder: String,
    },
    Button {},
    OptionSelect {
        #[serde(default)]
        options: Vec<String>,
    },
    PanelLink {
        target_panel_id: String,
        #[serde(default)]
        description: String,
    },
}

impl WidgetKind {
    /// Config tag of this variant
    pub fn type_name(&self) -> &'static str {
        match self {
            WidgetKind::TextInput { .. } => "text_input",
            WidgetKind::Button {} => "button",
            WidgetKind::OptionSelect { .. } => "option_select",
            WidgetKind::PanelLink { .. } => "panel_link",
        }
    }
}
