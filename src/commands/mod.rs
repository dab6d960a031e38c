//! Command Handlers
//!
//! Entry points used by the CLI. Every handler takes the shared
//! [`AppState`](crate::state::AppState) and returns a
//! [`CommandResponse`](crate::models::response::CommandResponse).

pub mod editor;
pub mod health;
pub mod repos;
pub mod settings;
pub mod workflows;

pub use editor::*;
pub use health::*;
pub use repos::*;
pub use settings::*;
pub use workflows::*;
