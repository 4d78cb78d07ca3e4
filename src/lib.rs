//! PanelFlow - state and navigation core for multi-panel applications

pub mod bus;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod handler;
pub mod logging;
pub mod navigation;
pub mod panel;
pub mod registry;
pub mod tree;

pub use bus::{EventBus, SubscriptionId};
pub use config::{load_config, parse_config, ApplicationConfig};
pub use dispatcher::Dispatcher;
pub use error::{ErrorClass, FixSuggestion, PanelFlowError};
pub use events::{HorizontalDirection, IncomingEvent, OutgoingEvent, OutgoingKind, VerticalDirection};
pub use handler::{HandlerContext, HandlerRegistry, NavigationCommand, NavigationTarget, PanelHandler};
pub use navigation::{Navigator, Outcome};
pub use panel::{FormData, PanelTemplate, Widget, WidgetKind};
pub use registry::TemplateRegistry;
pub use tree::{NodeId, NodeTree, TreeNode, TreeSnapshot};
