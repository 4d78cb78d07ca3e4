//! # Handler Invocation Adapter
//!
//! User business logic plugs into the engine through [`PanelHandler`].
//! Handlers are registered by name in a [`HandlerRegistry`]; panels (and
//! individual widgets) refer to them by that name in the config.
//!
//! A fresh handler is built for every widget submission from a
//! [`HandlerContext`] holding copies of the node's context and form data.
//!
//! ```rust
//! use panelflow::handler::{HandlerRegistry, NavigationCommand, PanelHandler};
//! use serde_json::Value;
//!
//! struct Wizard;
//!
//! impl PanelHandler for Wizard {
//!     fn on_widget_update(
//!         &mut self,
//!         widget_id: &str,
//!         _value: &Value,
//!     ) -> anyhow::Result<Option<NavigationCommand>> {
//!         Ok((widget_id == "next").then(|| NavigationCommand::navigate_to("step2")))
//!     }
//! }
//!
//! let mut handlers = HandlerRegistry::new();
//! handlers.register("Wizard", |_ctx| Box::new(Wizard));
//! assert!(handlers.contains("Wizard"));
//! ```

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use serde_json::Value;
use tracing::debug;

use crate::error::PanelFlowError;
use crate::panel::{FormData, PanelTemplate};

/// What a handler asks the engine to do after a submission
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationCommand {
    NavigateDown(NavigationTarget),
}

impl NavigationCommand {
    /// Navigate down to a registry panel
    pub fn navigate_to(panel_id: impl Into<String>) -> Self {
        NavigationCommand::NavigateDown(NavigationTarget::Panel(panel_id.into()))
    }

    /// Navigate down to an ephemeral panel built by the handler
    pub fn navigate_inline(template: PanelTemplate) -> Self {
        NavigationCommand::NavigateDown(NavigationTarget::Inline(template))
    }
}

/// Panel to instantiate on down-navigation
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationTarget {
    /// Id of a template in the registry
    Panel(String),
    /// Template supplied directly, not stored in the registry
    Inline(PanelTemplate),
}

impl From<&str> for NavigationTarget {
    fn from(panel_id: &str) -> Self {
        NavigationTarget::Panel(panel_id.to_string())
    }
}

impl From<String> for NavigationTarget {
    fn from(panel_id: String) -> Self {
        NavigationTarget::Panel(panel_id)
    }
}

impl From<PanelTemplate> for NavigationTarget {
    fn from(template: PanelTemplate) -> Self {
        NavigationTarget::Inline(template)
    }
}

/// Data a handler is constructed with
#[derive(Debug, Clone, Default)]
pub struct HandlerContext {
    /// Parent form data captured when the node was created
    pub context: FormData,
    /// The node's form data, including the value just submitted
    pub form_data: FormData,
}

/// Business logic attached to a panel
pub trait PanelHandler {
    /// Called after the submitted value has been stored in the node's form data
    fn on_widget_update(
        &mut self,
        widget_id: &str,
        value: &Value,
    ) -> anyhow::Result<Option<NavigationCommand>>;
}

type HandlerFactory = Box<dyn Fn(HandlerContext) -> Box<dyn PanelHandler>>;

/// Name -> handler constructor
#[derive(Default)]
pub struct HandlerRegistry {
    factories: HashMap<String, HandlerFactory>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a handler constructor under `name`
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(HandlerContext) -> Box<dyn PanelHandler> + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Build a handler instance for one invocation
    pub fn instantiate(
        &self,
        name: &str,
        ctx: HandlerContext,
    ) -> Result<Box<dyn PanelHandler>, PanelFlowError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| PanelFlowError::HandlerNotRegistered {
                name: name.to_string(),
            })?;
        Ok(factory(ctx))
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("names", &self.names())
            .finish()
    }
}

/// Resolve, instantiate and run the handler `name`.
///
/// Errors returned by the handler and panics raised inside it (or its
/// constructor) both come back as [`PanelFlowError::HandlerFailed`].
pub fn invoke_handler(
    registry: &HandlerRegistry,
    name: &str,
    ctx: HandlerContext,
    widget_id: &str,
    value: &Value,
) -> Result<Option<NavigationCommand>, PanelFlowError> {
    if !registry.contains(name) {
        return Err(PanelFlowError::HandlerNotRegistered {
            name: name.to_string(),
        });
    }
    debug!(handler = name, widget = widget_id, "invoking handler");

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut handler = registry.instantiate(name, ctx)?;
        handler
            .on_widget_update(widget_id, value)
            .map_err(|e| PanelFlowError::HandlerFailed {
                name: name.to_string(),
                widget_id: widget_id.to_string(),
                message: format!("{:#}", e),
            })
    }));

    match outcome {
        Ok(result) => result,
        Err(payload) => Err(PanelFlowError::HandlerFailed {
            name: name.to_string(),
            widget_id: widget_id.to_string(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}

/// Handler that accepts every submission and never navigates.
///
/// Stands in for user handlers when a config is replayed outside its host
/// application.
#[derive(Debug, Default)]
pub struct StubHandler {
    name: String,
}

impl StubHandler {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Registry with a stub registered under each of `names`
    pub fn registry_for<'a>(names: impl IntoIterator<Item = &'a str>) -> HandlerRegistry {
        let mut registry = HandlerRegistry::new();
        for name in names {
            let owned = name.to_string();
            registry.register(name, move |_ctx| Box::new(StubHandler::new(owned.clone())));
        }
        registry
    }
}

impl PanelHandler for StubHandler {
    fn on_widget_update(
        &mut self,
        widget_id: &str,
        value: &Value,
    ) -> anyhow::Result<Option<NavigationCommand>> {
        debug!(handler = %self.name, widget = widget_id, %value, "stub handler received update");
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Recording {
        ctx: HandlerContext,
        seen: Rc<RefCell<Vec<HandlerContext>>>,
    }

    impl PanelHandler for Recording {
        fn on_widget_update(
            &mut self,
            widget_id: &str,
            _value: &Value,
        ) -> anyhow::Result<Option<NavigationCommand>> {
            self.seen.borrow_mut().push(self.ctx.clone());
            match widget_id {
                "go" => Ok(Some(NavigationCommand::navigate_to("child"))),
                "fail" => anyhow::bail!("refused"),
                "panic" => panic!("handler exploded"),
                _ => Ok(None),
            }
        }
    }

    fn registry(seen: &Rc<RefCell<Vec<HandlerContext>>>) -> HandlerRegistry {
        let seen = Rc::clone(seen);
        let mut registry = HandlerRegistry::new();
        registry.register("Recording", move |ctx| {
            Box::new(Recording {
                ctx,
                seen: Rc::clone(&seen),
            })
        });
        registry
    }

    #[test]
    fn handler_receives_context_and_form_data() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let registry = registry(&seen);

        let mut ctx = HandlerContext::default();
        ctx.context.insert("from_parent".into(), json!(1));
        ctx.form_data.insert("go".into(), json!(true));

        let command = invoke_handler(&registry, "Recording", ctx, "go", &json!(true)).unwrap();
        assert_eq!(command, Some(NavigationCommand::navigate_to("child")));

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].context["from_parent"], json!(1));
        assert_eq!(seen[0].form_data["go"], json!(true));
    }

    #[test]
    fn handler_error_becomes_handler_failed() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let registry = registry(&seen);

        let err = invoke_handler(&registry, "Recording", HandlerContext::default(), "fail", &json!(null))
            .unwrap_err();
        match err {
            PanelFlowError::HandlerFailed { message, widget_id, .. } => {
                assert_eq!(widget_id, "fail");
                assert!(message.contains("refused"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn handler_panic_is_contained() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let registry = registry(&seen);

        let err = invoke_handler(&registry, "Recording", HandlerContext::default(), "panic", &json!(null))
            .unwrap_err();
        assert!(err.to_string().contains("handler exploded"));
    }

    #[test]
    fn unknown_handler_is_reported() {
        let registry = HandlerRegistry::new();
        let err = invoke_handler(&registry, "Ghost", HandlerContext::default(), "w", &json!(1))
            .unwrap_err();
        assert!(matches!(err, PanelFlowError::HandlerNotRegistered { ref name } if name == "Ghost"));
    }

    #[test]
    fn stub_registry_covers_names() {
        let registry = StubHandler::registry_for(["B", "A"]);
        assert_eq!(registry.names(), vec!["A", "B"]);
        let command =
            invoke_handler(&registry, "A", HandlerContext::default(), "w", &json!("x")).unwrap();
        assert!(command.is_none());
    }

    #[test]
    fn targets_convert_from_ids_and_templates() {
        assert_eq!(
            NavigationTarget::from("child"),
            NavigationTarget::Panel("child".into())
        );
        let inline = PanelTemplate::new("tmp", "Temporary");
        assert_eq!(
            NavigationTarget::from(inline.clone()),
            NavigationTarget::Inline(inline)
        );
    }
}
