//! Event dispatcher: the engine's single entry point
//!
//! [`Dispatcher`] owns the node tree, the template and handler registries
//! and the subscriber list. `post_event` routes each incoming event to its
//! navigation algorithm and never fails: errors come back to subscribers as
//! [`OutgoingEvent::ErrorOccurred`].
//!
//! ```rust
//! use panelflow::{Dispatcher, HandlerRegistry, IncomingEvent, OutgoingKind};
//! use panelflow::panel::{PanelTemplate, Widget};
//! use panelflow::registry::TemplateRegistry;
//!
//! let templates = TemplateRegistry::new(
//!     "main",
//!     vec![
//!         PanelTemplate::new("main", "Main")
//!             .with_widget(Widget::panel_link("goto_child", "Open", "child")),
//!         PanelTemplate::new("child", "Child"),
//!     ],
//! )
//! .unwrap();
//!
//! let mut app = Dispatcher::new(templates, HandlerRegistry::new()).unwrap();
//! app.subscribe(OutgoingKind::StateChanged, |event| println!("{event:?}"));
//! app.post_event(IncomingEvent::widget_submitted("goto_child", true));
//! assert_eq!(app.active_node().panel_id(), "child");
//! ```

use std::path::Path;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::bus::{EventBus, SubscriptionId};
use crate::config::load_config;
use crate::error::PanelFlowError;
use crate::events::{IncomingEvent, OutgoingEvent, OutgoingKind};
use crate::handler::{invoke_handler, HandlerContext, HandlerRegistry, NavigationCommand};
use crate::navigation::{Navigator, Outcome};
use crate::registry::TemplateRegistry;
use crate::tree::{NodeId, NodeTree, TreeNode, TreeSnapshot};

pub struct Dispatcher {
    templates: TemplateRegistry,
    handlers: HandlerRegistry,
    tree: NodeTree,
    bus: EventBus,
}

impl Dispatcher {
    /// Build the engine: checks handler names and creates the active root.
    ///
    /// Fails with a configuration error; no tree exists in that case.
    pub fn new(
        templates: TemplateRegistry,
        handlers: HandlerRegistry,
    ) -> Result<Self, PanelFlowError> {
        templates.validate_handlers(&handlers)?;
        let entry = templates
            .entry()
            .ok_or_else(|| PanelFlowError::MissingEntryPanel {
                panel_id: templates.entry_panel_id().to_string(),
            })?;
        let tree = NodeTree::with_root(entry);
        info!(
            entry = templates.entry_panel_id(),
            panels = templates.len(),
            handlers = handlers.len(),
            "panelflow engine ready"
        );
        Ok(Self {
            templates,
            handlers,
            tree,
            bus: EventBus::new(),
        })
    }

    /// Load the config at `path` and build the engine
    pub fn from_config_file(
        path: impl AsRef<Path>,
        handlers: HandlerRegistry,
    ) -> Result<Self, PanelFlowError> {
        Self::new(load_config(path)?, handlers)
    }

    pub fn subscribe<F>(&mut self, kind: OutgoingKind, listener: F) -> SubscriptionId
    where
        F: FnMut(&OutgoingEvent) + 'static,
    {
        self.bus.subscribe(kind, listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    pub fn active_node(&self) -> &TreeNode {
        self.tree.active_node()
    }

    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    /// Owned view of the current tree
    pub fn snapshot(&self) -> TreeSnapshot {
        TreeSnapshot::capture(&self.tree)
    }

    /// Process one incoming event to completion.
    ///
    /// Publishes `StateChanged` when the tree changed and `ErrorOccurred`
    /// when processing failed; publishes nothing for no-ops.
    #[instrument(skip(self, event), fields(event = event.name()))]
    pub fn post_event(&mut self, event: IncomingEvent) {
        let result = self.route(event).and_then(|outcome| {
            self.tree.check_invariants()?;
            Ok(outcome)
        });

        match result {
            Ok(Outcome::Changed) => self.publish_state(),
            Ok(Outcome::Unchanged) => debug!("event left the tree unchanged"),
            Err(err) => {
                warn!(class = ?err.class(), error = %err, "event failed");
                self.bus.publish(&OutgoingEvent::from(&err));
            }
        }
    }

    fn route(&mut self, event: IncomingEvent) -> Result<Outcome, PanelFlowError> {
        match event {
            IncomingEvent::WidgetSubmitted { widget_id, value } => {
                let source = self
                    .tree
                    .find_node_owning_widget(&widget_id)
                    .ok_or_else(|| PanelFlowError::UnknownWidget {
                        widget_id: widget_id.clone(),
                    })?;
                self.submit_widget(source, &widget_id, value)
            }
            IncomingEvent::HorizontalNavigation { direction } => {
                self.navigator().navigate_horizontal(direction)
            }
            IncomingEvent::VerticalNavigation { direction } => {
                self.navigator().navigate_vertical(direction)
            }
            IncomingEvent::BackNavigation => self.navigator().navigate_back(),
        }
    }

    fn navigator(&mut self) -> Navigator<'_> {
        Navigator::new(&mut self.tree, &self.templates)
    }

    /// Store the value, run the handler, then navigate if asked to.
    ///
    /// The stored value stays even when the handler fails.
    fn submit_widget(
        &mut self,
        source: NodeId,
        widget_id: &str,
        value: Value,
    ) -> Result<Outcome, PanelFlowError> {
        let node = self.tree.node_mut(source)?;
        node.form_data.insert(widget_id.to_string(), value.clone());
        debug!(node = %source, widget = widget_id, "stored submitted value");

        let template = node.template().clone();
        let widget = template.widget(widget_id);
        let handler_name = widget
            .and_then(|w| w.handler.as_deref())
            .or(template.handler.as_deref());

        let mut command = None;
        if let Some(name) = handler_name {
            let node = self.tree.node(source)?;
            let ctx = HandlerContext {
                context: node.context().clone(),
                form_data: node.form_data().clone(),
            };
            command = invoke_handler(&self.handlers, name, ctx, widget_id, &value)?;
        }

        // links navigate on their own unless the handler already decided
        if command.is_none() {
            if let Some(target) = widget.and_then(|w| w.link_target()) {
                command = Some(NavigationCommand::navigate_to(target));
            }
        }

        match command {
            Some(NavigationCommand::NavigateDown(target)) => {
                self.navigator().navigate_down(source, widget_id, target)?;
            }
            None => debug!(widget = widget_id, "submission without navigation"),
        }
        Ok(Outcome::Changed)
    }

    fn publish_state(&mut self) {
        if !self.bus.has_listeners(OutgoingKind::StateChanged) {
            return;
        }
        let event = OutgoingEvent::StateChanged {
            tree: TreeSnapshot::capture(&self.tree),
        };
        self.bus.publish(&event);
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("entry", &self.templates.entry_panel_id())
            .field("nodes", &self.tree.len())
            .field("active", &self.tree.active())
            .field("bus", &self.bus)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{HorizontalDirection, VerticalDirection};
    use crate::panel::{PanelTemplate, Widget};
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn templates() -> TemplateRegistry {
        TemplateRegistry::new(
            "main",
            vec![
                PanelTemplate::new("main", "Main")
                    .with_widget(Widget::panel_link("goto_child", "Child", "child"))
                    .with_widget(Widget::text_input("name", "Name")),
                PanelTemplate::new("child", "Child"),
            ],
        )
        .unwrap()
    }

    fn recorder(app: &mut Dispatcher) -> Rc<RefCell<Vec<OutgoingEvent>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        for kind in [OutgoingKind::StateChanged, OutgoingKind::ErrorOccurred] {
            let events = Rc::clone(&events);
            app.subscribe(kind, move |e| events.borrow_mut().push(e.clone()));
        }
        events
    }

    #[test]
    fn unknown_handler_name_fails_construction() {
        let templates = TemplateRegistry::new(
            "main",
            vec![PanelTemplate::new("main", "Main").with_handler("Missing")],
        )
        .unwrap();
        let err = Dispatcher::new(templates, HandlerRegistry::new()).unwrap_err();
        assert!(err.to_string().contains("Missing"));
    }

    #[test]
    fn link_submission_navigates_without_handler() {
        let mut app = Dispatcher::new(templates(), HandlerRegistry::new()).unwrap();
        let events = recorder(&mut app);

        app.post_event(IncomingEvent::widget_submitted("goto_child", true));

        assert_eq!(app.active_node().panel_id(), "child");
        let events = events.borrow();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), OutgoingKind::StateChanged);
    }

    #[test]
    fn plain_submission_publishes_state() {
        let mut app = Dispatcher::new(templates(), HandlerRegistry::new()).unwrap();
        let events = recorder(&mut app);

        app.post_event(IncomingEvent::widget_submitted("name", "Ada"));

        assert_eq!(app.active_node().form_data()["name"], json!("Ada"));
        let events = events.borrow();
        match &events[0] {
            OutgoingEvent::StateChanged { tree } => {
                assert_eq!(tree.form_data["name"], json!("Ada"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn unknown_widget_reports_navigation_error() {
        let mut app = Dispatcher::new(templates(), HandlerRegistry::new()).unwrap();
        let events = recorder(&mut app);

        app.post_event(IncomingEvent::widget_submitted("ghost", 1));

        let events = events.borrow();
        match &events[0] {
            OutgoingEvent::ErrorOccurred { class, message, .. } => {
                assert_eq!(*class, crate::error::ErrorClass::Navigation);
                assert!(message.contains("ghost"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(app.tree().len(), 1);
    }

    #[test]
    fn corrupted_tree_reports_internal_error() {
        let mut app = Dispatcher::new(templates(), HandlerRegistry::new()).unwrap();
        app.post_event(IncomingEvent::widget_submitted("goto_child", true));
        let events = recorder(&mut app);

        let root = app.tree.root();
        app.tree.node_mut(root).unwrap().is_active = true;
        app.post_event(IncomingEvent::widget_submitted("name", "Ada"));

        let events = events.borrow();
        assert_eq!(events.len(), 1);
        match &events[0] {
            OutgoingEvent::ErrorOccurred { class, message, .. } => {
                assert_eq!(*class, crate::error::ErrorClass::Internal);
                assert!(message.contains("PF-041"), "message was: {message}");
                assert!(message.contains("found 2"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn noops_publish_nothing() {
        let mut app = Dispatcher::new(templates(), HandlerRegistry::new()).unwrap();
        let events = recorder(&mut app);

        app.post_event(IncomingEvent::back());
        app.post_event(IncomingEvent::HorizontalNavigation {
            direction: HorizontalDirection::Previous,
        });
        app.post_event(IncomingEvent::VerticalNavigation {
            direction: VerticalDirection::Up,
        });

        assert!(events.borrow().is_empty());
    }

    #[test]
    fn unsubscribed_listener_is_silent() {
        let mut app = Dispatcher::new(templates(), HandlerRegistry::new()).unwrap();
        let count = Rc::new(RefCell::new(0));
        let c = Rc::clone(&count);
        let id = app.subscribe(OutgoingKind::StateChanged, move |_| *c.borrow_mut() += 1);

        app.post_event(IncomingEvent::widget_submitted("name", "a"));
        assert!(app.unsubscribe(id));
        app.post_event(IncomingEvent::widget_submitted("name", "b"));

        assert_eq!(*count.borrow(), 1);
    }
}
