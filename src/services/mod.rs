//! Services
//!
//! Business logic for the editor and the AI workflows.
//! Services are called by the command handlers.

pub mod fallback;
pub mod generation;
pub mod job_board;
pub mod planning;
pub mod roster;
pub mod runner;
pub mod sanitizer;
pub mod session;
pub mod workflows;

#[cfg(test)]
pub(crate) mod test_support;

pub use fallback::{FallbackError, ModelFallback};
pub use job_board::JobBoard;
pub use planning::Planner;
pub use roster::ModelRoster;
pub use session::EditorSession;
pub use workflows::{EventSink, WorkflowContext, WorkflowEvent};
