//! Workflow Orchestrators
//!
//! Bulk edit, project generation, project expansion and the advanced
//! edit/verify loop. Each workflow publishes its progress through a
//! [`JobBoard`](crate::services::job_board::JobBoard) and an [`EventSink`].

pub mod advanced_edit;
pub mod bulk_edit;
pub mod executor;
pub mod project_expansion;
pub mod project_generation;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::models::job::JobStatus;
use crate::models::phase::AdvancedEditPhase;

pub use advanced_edit::{
    AdvancedEditMonitor, AdvancedEditOutcome, AdvancedEditRequest, AdvancedEditSnapshot,
    VerificationConfig, MAX_VERIFICATION_ATTEMPTS,
};
pub use bulk_edit::{BulkEditRequest, BulkEditSummary};
pub use executor::WorkflowContext;
pub use project_expansion::{ExpansionRequest, ExpansionSummary};
pub use project_generation::{ProjectGenerationRequest, ProjectGenerationSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    BulkEdit,
    ProjectGeneration,
    ProjectExpansion,
    AdvancedEdit,
}

impl std::fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkflowKind::BulkEdit => "bulk_edit",
            WorkflowKind::ProjectGeneration => "project_generation",
            WorkflowKind::ProjectExpansion => "project_expansion",
            WorkflowKind::AdvancedEdit => "advanced_edit",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Success,
    Error,
}

/// Progress published while a workflow runs
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    /// Free-form progress line
    Status { message: String },
    /// Plan accepted; `jobs` files queued
    Planned { workflow: WorkflowKind, jobs: usize },
    /// A job changed status
    JobUpdated {
        id: String,
        status: JobStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// Advanced edit moved to another phase
    PhaseChanged { phase: AdvancedEditPhase, attempt: u32 },
    /// Planner's explanation for the current attempt
    ReasoningUpdated { reasoning: String },
    /// Latest observation of the verification run
    RunObserved { url: String, status: String },
    /// An expansion plan asked to edit seed files; the edits were dropped
    SeedEditRejected { paths: Vec<String> },
    /// All jobs settled
    Finished {
        workflow: WorkflowKind,
        succeeded: usize,
        failed: usize,
    },
    /// User-facing notice
    Alert { kind: AlertKind, message: String },
}

/// Optional, fire-and-forget event channel
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<WorkflowEvent>>,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<WorkflowEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink that drops everything.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: WorkflowEvent) {
        if let Some(tx) = &self.tx {
            // Receiver gone means nobody is watching any more.
            let _ = tx.send(event);
        }
    }

    pub fn alert_error(&self, message: impl Into<String>) {
        self.emit(WorkflowEvent::Alert {
            kind: AlertKind::Error,
            message: message.into(),
        });
    }

    pub fn alert_success(&self, message: impl Into<String>) {
        self.emit(WorkflowEvent::Alert {
            kind: AlertKind::Success,
            message: message.into(),
        });
    }
}

/// First `n` characters of `text`, for commit messages and descriptions.
pub(crate) fn truncate_chars(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
