//! Per-Job Execution
//!
//! Shared execution path for the bulk edit, generation and expansion
//! workflows: load the file, stream new content through the model roster,
//! sanitize it and commit it.

use std::sync::Arc;

use tracing::{debug, info, warn};

use repo_weaver_core::RepoRef;
use repo_weaver_github::VcsBackend;
use repo_weaver_llm::ModelBackend;

use crate::models::job::JobStatus;
use crate::models::settings::AppConfig;
use crate::services::fallback::ModelFallback;
use crate::services::generation::stream_to_sink;
use crate::services::job_board::JobBoard;
use crate::services::planning::Planner;
use crate::services::roster::ModelRoster;
use crate::services::sanitizer::sanitize;
use crate::utils::error::{AppError, AppResult};

use super::{AdvancedEditMonitor, EventSink};

/// Everything a workflow needs to run
#[derive(Clone)]
pub struct WorkflowContext {
    pub backend: Arc<dyn ModelBackend>,
    pub vcs: Arc<dyn VcsBackend>,
    pub roster: ModelRoster,
    pub config: AppConfig,
    pub events: EventSink,
}

impl std::fmt::Debug for WorkflowContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowContext")
            .field("backend", &self.backend.name())
            .field("roster", &self.roster)
            .field("config", &self.config)
            .finish()
    }
}

impl WorkflowContext {
    pub fn new(
        backend: Arc<dyn ModelBackend>,
        vcs: Arc<dyn VcsBackend>,
        roster: ModelRoster,
        config: AppConfig,
    ) -> Self {
        Self {
            backend,
            vcs,
            roster,
            config,
            events: EventSink::disabled(),
        }
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    pub fn planner(&self) -> Planner {
        Planner::new(self.backend.clone(), self.config.max_context_chars)
    }

    pub fn fallback(&self) -> ModelFallback {
        ModelFallback::new(self.roster.clone())
    }

    /// A job board publishing into this context's event sink.
    pub fn new_board(&self) -> JobBoard {
        JobBoard::new(self.events.clone())
    }

    pub fn new_monitor(&self) -> AdvancedEditMonitor {
        AdvancedEditMonitor::new(self.events.clone())
    }
}

/// Where a job's starting content comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ContentSource {
    /// Fetch the current content and version token from the remote
    Remote,
    /// The file does not exist yet
    New,
}

/// One file write, as handed to [`execute_file_job`]
#[derive(Debug, Clone)]
pub(crate) struct FileJob {
    pub id: String,
    pub repo: RepoRef,
    pub branch: String,
    pub path: String,
    pub commit_message: String,
    pub source: ContentSource,
}

/// Run one job to a terminal status and return that status.
///
/// Failures stay with the job; they are recorded on the board and never
/// propagate to sibling jobs.
pub(crate) async fn execute_file_job<P>(
    ctx: &WorkflowContext,
    board: &JobBoard,
    job: FileJob,
    build_prompt: P,
) -> JobStatus
where
    P: Fn(&str) -> String,
{
    if let Err(e) = run_file_job(ctx, board, &job, build_prompt).await {
        warn!(job = %job.id, "Job failed: {}", e);
        if let Err(fail_err) = board.fail(&job.id, e.to_string()) {
            debug!(job = %job.id, "Could not record failure: {}", fail_err);
        }
    }
    board
        .get(&job.id)
        .map(|j| j.status())
        .unwrap_or(JobStatus::Failed)
}

async fn run_file_job<P>(
    ctx: &WorkflowContext,
    board: &JobBoard,
    job: &FileJob,
    build_prompt: P,
) -> AppResult<()>
where
    P: Fn(&str) -> String,
{
    let (original, sha) = match job.source {
        ContentSource::Remote => {
            let file = ctx
                .vcs
                .get_file(&job.repo, &job.path, Some(&job.branch))
                .await?;
            (file.content, Some(file.sha))
        }
        ContentSource::New => (String::new(), None),
    };
    let prompt = build_prompt(&original);

    let backend = ctx.backend.as_ref();
    let id = job.id.as_str();
    let prompt = prompt.as_str();
    let (content, log) = ctx
        .fallback()
        .execute(move |attempt| async move {
            if attempt.is_retry() {
                board.transition(
                    id,
                    JobStatus::Retrying,
                    Some(format!("Retrying with {}...", attempt.model)),
                )?;
            }
            board.transition(id, JobStatus::Generating, None)?;

            let mut accumulated = String::new();
            stream_to_sink(backend, &attempt.model, prompt, |fragment| {
                accumulated.push_str(fragment);
                if let Err(e) = board.append_content(id, fragment) {
                    debug!(job = id, "Dropped fragment: {}", e);
                }
            })
            .await?;
            Ok::<_, AppError>(sanitize(&accumulated))
        })
        .await?;

    board.transition(id, JobStatus::Committing, None)?;
    ctx.vcs
        .commit_file(
            &job.repo,
            &job.branch,
            &job.path,
            &content,
            &job.commit_message,
            sha.as_deref(),
        )
        .await?;
    board.transition(id, JobStatus::Success, None)?;

    info!(
        job = id,
        model = log.successful_model.as_deref().unwrap_or_default(),
        attempts = log.attempts.len(),
        "Committed {}",
        job.path
    );
    Ok(())
}
