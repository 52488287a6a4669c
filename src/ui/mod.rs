//! User interface state, rendering and flows.

/// User-facing flows bound to the API client.
pub mod controller;
pub mod form;
pub mod render;
pub mod terminal;
pub mod view;

pub use controller::{Tab, UiController, UiError};
pub use form::{CounterLevel, QueryForm, QueryMode, ValidationError};
pub use terminal::TerminalView;
pub use view::{Control, Panel, PanelBoard, Toast, ToastLevel, View};
