//! Project Expansion Workflow
//!
//! Grows a codebase around one seed file. The seed is read-only: the plan
//! may only create files, and anything it asks to do to the seed is
//! dropped and reported.

use serde::Serialize;
use tracing::{error, info, warn};

use repo_weaver_core::FileKey;

use crate::models::job::{Job, JobKind};
use crate::models::plan::{ContextFile, ExpansionPlan};
use crate::services::generation::file_generation_prompt;
use crate::services::job_board::JobBoard;
use crate::services::runner::run_bounded;
use crate::utils::error::{AppError, AppResult};

use super::bulk_edit::DEFAULT_BRANCH;
use super::executor::{execute_file_job, ContentSource, FileJob, WorkflowContext};
use super::{WorkflowEvent, WorkflowKind};

#[derive(Debug, Clone)]
pub struct ExpansionRequest {
    pub prompt: String,
    /// Selected seed files; exactly one is accepted
    pub seed_files: Vec<FileKey>,
    /// Session branch; the default branch is read and `main` written when absent
    pub branch: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpansionSummary {
    pub plan: ExpansionPlan,
    /// Paths the plan wanted to edit or overwrite on the seed side
    pub rejected_edits: Vec<String>,
    pub succeeded: usize,
    pub failed: usize,
    pub jobs: Vec<Job>,
}

pub async fn run_project_expansion(
    ctx: &WorkflowContext,
    board: &JobBoard,
    request: ExpansionRequest,
) -> AppResult<ExpansionSummary> {
    let result = expand(ctx, board, &request).await;
    if let Err(e) = &result {
        error!("Expansion failed: {}", e);
        ctx.events.alert_error(format!("Expansion failed: {}", e));
    }
    result
}

async fn expand(
    ctx: &WorkflowContext,
    board: &JobBoard,
    request: &ExpansionRequest,
) -> AppResult<ExpansionSummary> {
    let seed_key = match request.seed_files.as_slice() {
        [only] => only,
        _ => return Err(AppError::workflow("Please select exactly one seed file.")),
    };
    if request.prompt.trim().is_empty() {
        return Err(AppError::validation("Expansion goal must not be empty"));
    }

    let seed_file = ctx
        .vcs
        .get_file(&seed_key.repo, &seed_key.path, request.branch.as_deref())
        .await?;
    let seeds = vec![ContextFile::new(seed_file.path, seed_file.content).with_sha(seed_file.sha)];

    let planner = ctx.planner();
    let planner = &planner;
    let seeds = &seeds;
    let goal = request.prompt.as_str();
    let (mut plan, _) = ctx
        .fallback()
        .execute(move |attempt| async move {
            planner.plan_expansion(&attempt.model, seeds, goal).await
        })
        .await
        .map_err(|e| {
            error!("Expansion planning exhausted the roster: {:?}", e);
            AppError::workflow("Failed to plan expansion.")
        })?;

    let rejected_edits = enforce_read_only_seed(&mut plan, &seed_key.path);
    if !rejected_edits.is_empty() {
        warn!(
            paths = ?rejected_edits,
            "Expansion plan tried to modify the seed; ignoring those entries"
        );
        ctx.events.emit(WorkflowEvent::SeedEditRejected {
            paths: rejected_edits.clone(),
        });
    }

    board.reset(
        plan.files_to_create
            .iter()
            .map(|f| {
                Job::new(f.path.clone(), f.path.clone(), JobKind::Create, f.description.clone())
                    .with_repo(seed_key.repo.clone())
                    .with_agent_index(f.agent_index)
            })
            .collect(),
    );
    ctx.events.emit(WorkflowEvent::Planned {
        workflow: WorkflowKind::ProjectExpansion,
        jobs: plan.files_to_create.len(),
    });
    info!(
        seed = %seed_key,
        files = plan.files_to_create.len(),
        limit = ctx.config.expansion_concurrency,
        "Starting expansion"
    );

    let branch = request
        .branch
        .clone()
        .unwrap_or_else(|| DEFAULT_BRANCH.to_string());
    let tasks = plan.files_to_create.iter().map(|file| {
        let job = FileJob {
            id: file.path.clone(),
            repo: seed_key.repo.clone(),
            branch: branch.clone(),
            path: file.path.clone(),
            commit_message: format!("AI Expansion: {}", file.path),
            source: ContentSource::New,
        };
        execute_file_job(ctx, board, job, move |_| {
            file_generation_prompt(goal, &file.path, &file.description)
        })
    });
    run_bounded(tasks, ctx.config.expansion_concurrency).await;

    let (succeeded, failed) = board.tally();
    ctx.events.emit(WorkflowEvent::Finished {
        workflow: WorkflowKind::ProjectExpansion,
        succeeded,
        failed,
    });
    info!(succeeded, failed, "Expansion finished");

    Ok(ExpansionSummary {
        plan,
        rejected_edits,
        succeeded,
        failed,
        jobs: board.snapshot(),
    })
}

/// Strip every plan entry that would touch the seed and return their paths.
fn enforce_read_only_seed(plan: &mut ExpansionPlan, seed_path: &str) -> Vec<String> {
    let mut rejected: Vec<String> = plan.files_to_edit.drain(..).map(|e| e.path).collect();
    plan.files_to_create.retain(|f| {
        if f.path == seed_path {
            rejected.push(f.path.clone());
            false
        } else {
            true
        }
    });
    rejected
}
