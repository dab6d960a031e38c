//! Job Models
//!
//! A job is one file-level unit of work inside a workflow. Its status moves
//! through a closed state machine; every transition is checked against the
//! table in [`JobStatus::can_transition_to`] and rejected transitions leave
//! the job untouched.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::phase::AdvancedEditPhase;
use repo_weaver_core::RepoRef;

/// Status of a single job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting for a runner slot
    Queued,
    /// Waiting on a planning call (advanced edit)
    Planning,
    /// Content is being streamed from a model
    Generating,
    /// The previous model failed; the next one is about to start
    Retrying,
    /// Content is being written to the remote
    Committing,
    /// Committed
    Success,
    /// Gave up; `error` says why
    Failed,
}

impl JobStatus {
    /// Whether this status can never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failed)
    }

    /// Started but not finished.
    pub fn is_active(&self) -> bool {
        !self.is_terminal() && *self != JobStatus::Queued
    }

    /// Check the transition table.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Queued, Generating)
                | (Queued, Planning)
                | (Queued, Failed)
                | (Planning, Generating)
                | (Planning, Failed)
                | (Generating, Retrying)
                | (Generating, Committing)
                | (Generating, Success)
                | (Generating, Failed)
                | (Retrying, Generating)
                | (Retrying, Failed)
                | (Committing, Success)
                | (Committing, Failed)
        )
    }

    fn requires_error(&self) -> bool {
        matches!(self, JobStatus::Retrying | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Queued => "queued",
            JobStatus::Planning => "planning",
            JobStatus::Generating => "generating",
            JobStatus::Retrying => "retrying",
            JobStatus::Committing => "committing",
            JobStatus::Success => "success",
            JobStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// What a job does to its file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Create,
    Edit,
}

/// Rejected job or phase transitions
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransitionError {
    #[error("Invalid status transition for job {job}: {from} -> {to}")]
    Job {
        job: String,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Job {job} entered {to} without an error message")]
    MissingError { job: String, to: JobStatus },

    #[error("Job {job} is {status}; streamed content is only accepted while generating")]
    ContentRejected { job: String, status: JobStatus },

    #[error("Invalid phase transition: {from} -> {to}")]
    Phase {
        from: AdvancedEditPhase,
        to: AdvancedEditPhase,
    },
}

/// One file-level unit of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Stable key: `owner/repo::path` for bulk edits, the path otherwise
    pub id: String,
    pub path: String,
    /// Owning repository, set when a workflow spans repositories
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<RepoRef>,
    pub kind: JobKind,
    /// Per-file purpose or change instructions
    pub description: String,
    /// Expansion only: which of the parallel agents owns this file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_index: Option<u8>,
    status: JobStatus,
    streamed_content: String,
    error: Option<String>,
}

impl Job {
    /// Create a queued job
    pub fn new(
        id: impl Into<String>,
        path: impl Into<String>,
        kind: JobKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            repo: None,
            kind,
            description: description.into(),
            agent_index: None,
            status: JobStatus::Queued,
            streamed_content: String::new(),
            error: None,
        }
    }

    pub fn with_repo(mut self, repo: RepoRef) -> Self {
        self.repo = Some(repo);
        self
    }

    pub fn with_agent_index(mut self, agent_index: u8) -> Self {
        self.agent_index = Some(agent_index);
        self
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn streamed_content(&self) -> &str {
        &self.streamed_content
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Move to `next`, recording `error` for `retrying`/`failed`.
    ///
    /// Entering any other status clears the error. Entering `retrying` also
    /// discards the content streamed by the failed attempt.
    pub fn transition(
        &mut self,
        next: JobStatus,
        error: Option<String>,
    ) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError::Job {
                job: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        if next.requires_error() && error.is_none() {
            return Err(TransitionError::MissingError {
                job: self.id.clone(),
                to: next,
            });
        }

        self.status = next;
        self.error = if next.requires_error() { error } else { None };
        if next == JobStatus::Retrying {
            self.streamed_content.clear();
        }
        Ok(())
    }

    /// Append a streamed fragment for the current attempt.
    pub fn append_content(&mut self, fragment: &str) -> Result<(), TransitionError> {
        if self.status != JobStatus::Generating {
            return Err(TransitionError::ContentRejected {
                job: self.id.clone(),
                status: self.status,
            });
        }
        self.streamed_content.push_str(fragment);
        Ok(())
    }
}
