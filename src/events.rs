//! Events exchanged with the renderer
//!
//! - [`IncomingEvent`]: renderer -> engine (4 kinds)
//! - [`OutgoingEvent`]: engine -> subscribers (2 kinds)
//!
//! Both are serde-tagged by `type` so event scripts and logs can be written
//! as YAML or JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ErrorClass, PanelFlowError};
use crate::tree::TreeSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HorizontalDirection {
    Next,
    Previous,
}

/// `Up` moves toward higher stack positions, `Down` toward lower ones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IncomingEvent {
    /// Enter in a text input, a choice in a select, a click on a button or link
    WidgetSubmitted { widget_id: String, value: Value },
    HorizontalNavigation { direction: HorizontalDirection },
    VerticalNavigation { direction: VerticalDirection },
    /// Close the active panel
    BackNavigation,
}

impl IncomingEvent {
    pub fn widget_submitted(widget_id: impl Into<String>, value: impl Into<Value>) -> Self {
        IncomingEvent::WidgetSubmitted {
            widget_id: widget_id.into(),
            value: value.into(),
        }
    }

    pub fn next() -> Self {
        IncomingEvent::HorizontalNavigation {
            direction: HorizontalDirection::Next,
        }
    }

    pub fn previous() -> Self {
        IncomingEvent::HorizontalNavigation {
            direction: HorizontalDirection::Previous,
        }
    }

    pub fn up() -> Self {
        IncomingEvent::VerticalNavigation {
            direction: VerticalDirection::Up,
        }
    }

    pub fn down() -> Self {
        IncomingEvent::VerticalNavigation {
            direction: VerticalDirection::Down,
        }
    }

    pub fn back() -> Self {
        IncomingEvent::BackNavigation
    }

    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            IncomingEvent::WidgetSubmitted { .. } => "widget_submitted",
            IncomingEvent::HorizontalNavigation { .. } => "horizontal_navigation",
            IncomingEvent::VerticalNavigation { .. } => "vertical_navigation",
            IncomingEvent::BackNavigation => "back_navigation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutgoingEvent {
    /// The tree changed shape, focus or form data; redraw from `tree`
    StateChanged { tree: TreeSnapshot },
    /// Processing an incoming event failed
    ErrorOccurred {
        class: ErrorClass,
        title: String,
        message: String,
    },
}

impl OutgoingEvent {
    pub fn kind(&self) -> OutgoingKind {
        match self {
            OutgoingEvent::StateChanged { .. } => OutgoingKind::StateChanged,
            OutgoingEvent::ErrorOccurred { .. } => OutgoingKind::ErrorOccurred,
        }
    }
}

impl From<&PanelFlowError> for OutgoingEvent {
    fn from(err: &PanelFlowError) -> Self {
        let class = err.class();
        OutgoingEvent::ErrorOccurred {
            class,
            title: class.title().to_string(),
            message: err.to_string(),
        }
    }
}

/// Subscription key for outgoing events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutgoingKind {
    StateChanged,
    ErrorOccurred,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn incoming_deserializes_from_tagged_yaml() {
        let yaml = r#"
- type: widget_submitted
  widget_id: name
  value: Alice
- type: horizontal_navigation
  direction: previous
- type: vertical_navigation
  direction: up
- type: back_navigation
"#;
        let events: Vec<IncomingEvent> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            events,
            vec![
                IncomingEvent::widget_submitted("name", "Alice"),
                IncomingEvent::previous(),
                IncomingEvent::up(),
                IncomingEvent::back(),
            ]
        );
    }

    #[test]
    fn incoming_serializes_with_type_tag() {
        let json = serde_json::to_value(IncomingEvent::down()).unwrap();
        assert_eq!(json, json!({"type": "vertical_navigation", "direction": "down"}));
        assert_eq!(IncomingEvent::next().name(), "horizontal_navigation");
    }

    #[test]
    fn error_event_from_panelflow_error() {
        let err = PanelFlowError::UnknownPanel {
            panel_id: "ghost".into(),
        };
        let event = OutgoingEvent::from(&err);
        assert_eq!(event.kind(), OutgoingKind::ErrorOccurred);
        match event {
            OutgoingEvent::ErrorOccurred {
                class,
                title,
                message,
            } => {
                assert_eq!(class, ErrorClass::Navigation);
                assert_eq!(title, "Navigation error");
                assert!(message.contains("ghost"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn error_event_serializes_class() {
        let event = OutgoingEvent::ErrorOccurred {
            class: ErrorClass::Handler,
            title: "Handler error".into(),
            message: "boom".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "error_occurred");
        assert_eq!(json["class"], "handler");
    }
}
