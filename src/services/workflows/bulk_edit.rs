//! Bulk Edit Workflow
//!
//! Applies one instruction to every selected file, possibly across several
//! repositories. The selection is the plan: one job per file, no planning
//! call.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{info, warn};

use repo_weaver_core::{FileKey, RepoRef};

use crate::models::job::{Job, JobKind};
use crate::services::generation::bulk_edit_prompt;
use crate::services::job_board::JobBoard;
use crate::services::runner::run_bounded;
use crate::utils::error::{AppError, AppResult};

use super::executor::{execute_file_job, ContentSource, FileJob, WorkflowContext};
use super::{truncate_chars, WorkflowEvent, WorkflowKind};

/// Branch used for repositories without an explicit entry.
pub const DEFAULT_BRANCH: &str = "main";

#[derive(Debug, Clone)]
pub struct BulkEditRequest {
    pub instruction: String,
    pub files: Vec<FileKey>,
    /// Working branch per repository
    pub branches: HashMap<RepoRef, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkEditSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub jobs: Vec<Job>,
}

/// Run a bulk edit. Returns once every job has settled.
pub async fn run_bulk_edit(
    ctx: &WorkflowContext,
    board: &JobBoard,
    request: BulkEditRequest,
) -> AppResult<BulkEditSummary> {
    if request.instruction.trim().is_empty() {
        return Err(AppError::validation("Instruction must not be empty"));
    }
    if request.files.is_empty() {
        return Err(AppError::validation("No files selected"));
    }
    let files = unique_files(request.files);

    let commit_message = format!("AI Edit: {}...", truncate_chars(&request.instruction, 50));

    board.reset(
        files
            .iter()
            .map(|key| {
                Job::new(key.to_string(), key.path.clone(), JobKind::Edit, "")
                    .with_repo(key.repo.clone())
            })
            .collect(),
    );
    ctx.events.emit(WorkflowEvent::Planned {
        workflow: WorkflowKind::BulkEdit,
        jobs: files.len(),
    });
    info!(
        files = files.len(),
        limit = ctx.config.bulk_edit_concurrency,
        "Starting bulk edit"
    );

    let instruction = request.instruction.as_str();
    let tasks = files.iter().map(|key| {
        let job = FileJob {
            id: key.to_string(),
            repo: key.repo.clone(),
            branch: request
                .branches
                .get(&key.repo)
                .cloned()
                .unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
            path: key.path.clone(),
            commit_message: commit_message.clone(),
            source: ContentSource::Remote,
        };
        let path = key.path.as_str();
        execute_file_job(ctx, board, job, move |original| {
            bulk_edit_prompt(instruction, path, original)
        })
    });
    run_bounded(tasks, ctx.config.bulk_edit_concurrency).await;

    let (succeeded, failed) = board.tally();
    ctx.events.emit(WorkflowEvent::Finished {
        workflow: WorkflowKind::BulkEdit,
        succeeded,
        failed,
    });
    info!(succeeded, failed, "Bulk edit finished");

    Ok(BulkEditSummary {
        succeeded,
        failed,
        jobs: board.snapshot(),
    })
}

/// The selection in first-seen order; job ids are file keys and must be unique.
fn unique_files(files: Vec<FileKey>) -> Vec<FileKey> {
    let total = files.len();
    let mut seen = HashSet::new();
    let unique: Vec<FileKey> = files
        .into_iter()
        .filter(|key| seen.insert(key.clone()))
        .collect();
    if unique.len() < total {
        warn!(
            dropped = total - unique.len(),
            "Ignoring files selected more than once"
        );
    }
    unique
}
