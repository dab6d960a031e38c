//! Data Models
//!
//! Contains all data structures used throughout the application.

pub mod job;
pub mod phase;
pub mod plan;
pub mod response;
pub mod settings;

pub use job::*;
pub use phase::*;
pub use plan::*;
pub use response::*;
pub use settings::*;
