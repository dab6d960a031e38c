//! Job Board
//!
//! Shared, snapshot-able view of the jobs of one workflow run. Execution
//! paths mutate their own job through the board; readers take cloned
//! snapshots. The lock is only held for the duration of a single update.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::models::job::{Job, JobStatus, TransitionError};
use crate::services::workflows::{EventSink, WorkflowEvent};
use crate::utils::error::{AppError, AppResult};

#[derive(Debug, Default)]
struct BoardState {
    jobs: Vec<Job>,
    peak_active: usize,
}

impl BoardState {
    fn job_mut(&mut self, id: &str) -> AppResult<&mut Job> {
        self.jobs
            .iter_mut()
            .find(|job| job.id == id)
            .ok_or_else(|| AppError::not_found(format!("Job {}", id)))
    }

    fn active(&self) -> usize {
        self.jobs.iter().filter(|j| j.status().is_active()).count()
    }
}

/// Jobs of one workflow run
#[derive(Debug, Clone, Default)]
pub struct JobBoard {
    state: Arc<RwLock<BoardState>>,
    events: EventSink,
}

impl JobBoard {
    pub fn new(events: EventSink) -> Self {
        Self {
            state: Arc::default(),
            events,
        }
    }

    /// Replace the board's contents with freshly queued jobs.
    pub fn reset(&self, jobs: Vec<Job>) {
        let mut state = self.state.write();
        state.jobs = jobs;
        state.peak_active = 0;
    }

    pub fn snapshot(&self) -> Vec<Job> {
        self.state.read().jobs.clone()
    }

    pub fn get(&self, id: &str) -> Option<Job> {
        self.state.read().jobs.iter().find(|j| j.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.read().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Highest number of simultaneously active jobs seen since the last reset.
    pub fn peak_active(&self) -> usize {
        self.state.read().peak_active
    }

    /// `(succeeded, failed)` counts.
    pub fn tally(&self) -> (usize, usize) {
        let state = self.state.read();
        let succeeded = state
            .jobs
            .iter()
            .filter(|j| j.status() == JobStatus::Success)
            .count();
        let failed = state
            .jobs
            .iter()
            .filter(|j| j.status() == JobStatus::Failed)
            .count();
        (succeeded, failed)
    }

    /// Validated status change for one job.
    pub fn transition(&self, id: &str, next: JobStatus, error: Option<String>) -> AppResult<()> {
        let event = {
            let mut state = self.state.write();
            let job = state.job_mut(id)?;
            job.transition(next, error)?;
            let event = WorkflowEvent::JobUpdated {
                id: job.id.clone(),
                status: job.status(),
                error: job.error().map(str::to_string),
            };
            let active = state.active();
            state.peak_active = state.peak_active.max(active);
            event
        };
        self.events.emit(event);
        Ok(())
    }

    /// Record a streamed fragment on a generating job.
    pub fn append_content(&self, id: &str, fragment: &str) -> AppResult<()> {
        let mut state = self.state.write();
        state.job_mut(id)?.append_content(fragment)?;
        Ok(())
    }

    /// Fail a job from whatever non-terminal state it is in.
    pub fn fail(&self, id: &str, error: impl Into<String>) -> AppResult<()> {
        let status = self
            .get(id)
            .map(|j| j.status())
            .ok_or_else(|| AppError::not_found(format!("Job {}", id)))?;
        if status.is_terminal() {
            return Err(TransitionError::Job {
                job: id.to_string(),
                from: status,
                to: JobStatus::Failed,
            }
            .into());
        }
        self.transition(id, JobStatus::Failed, Some(error.into()))
    }
}
