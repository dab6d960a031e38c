//! Project Generation Workflow
//!
//! Creates a repository, asks the roster for a file layout and writes every
//! planned file to the new repository's default branch.

use serde::Serialize;
use tracing::{error, info};

use repo_weaver_github::Repository;

use crate::models::job::{Job, JobKind};
use crate::models::plan::ProjectPlan;
use crate::services::generation::file_generation_prompt;
use crate::services::job_board::JobBoard;
use crate::services::runner::run_bounded;
use crate::utils::error::{AppError, AppResult};

use super::executor::{execute_file_job, ContentSource, FileJob, WorkflowContext};
use super::{truncate_chars, WorkflowEvent, WorkflowKind};

#[derive(Debug, Clone)]
pub struct ProjectGenerationRequest {
    pub repo_name: String,
    pub prompt: String,
    pub private: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectGenerationSummary {
    pub repository: Repository,
    pub plan: ProjectPlan,
    pub succeeded: usize,
    pub failed: usize,
    pub jobs: Vec<Job>,
}

pub async fn run_project_generation(
    ctx: &WorkflowContext,
    board: &JobBoard,
    request: ProjectGenerationRequest,
) -> AppResult<ProjectGenerationSummary> {
    let result = generate(ctx, board, &request).await;
    if let Err(e) = &result {
        error!(repo = %request.repo_name, "Project generation failed: {}", e);
        ctx.events
            .alert_error(format!("Project generation failed: {}", e));
    }
    result
}

async fn generate(
    ctx: &WorkflowContext,
    board: &JobBoard,
    request: &ProjectGenerationRequest,
) -> AppResult<ProjectGenerationSummary> {
    if request.repo_name.trim().is_empty() || request.prompt.trim().is_empty() {
        return Err(AppError::validation(
            "Repository name and project description are required",
        ));
    }

    ctx.events.emit(WorkflowEvent::Status {
        message: "Initializing repository...".to_string(),
    });
    let description = format!("AI Generated: {}...", truncate_chars(&request.prompt, 50));
    let repository = ctx
        .vcs
        .create_repository(&request.repo_name, &description, request.private)
        .await?;
    let repo = repository.repo_ref();
    info!(repo = %repository.full_name, "Repository created");

    ctx.events.emit(WorkflowEvent::Status {
        message: format!(
            "Repository {} created. Planning structure...",
            repository.full_name
        ),
    });
    let planner = ctx.planner();
    let planner = &planner;
    let goal = request.prompt.as_str();
    let (plan, _) = ctx
        .fallback()
        .execute(move |attempt| async move { planner.plan_project(&attempt.model, goal).await })
        .await
        .map_err(|e| {
            error!("Project planning exhausted the roster: {:?}", e);
            AppError::workflow("Failed to generate project plan.")
        })?;

    board.reset(
        plan.files
            .iter()
            .map(|f| Job::new(f.path.clone(), f.path.clone(), JobKind::Create, f.description.clone()))
            .collect(),
    );
    ctx.events.emit(WorkflowEvent::Planned {
        workflow: WorkflowKind::ProjectGeneration,
        jobs: plan.files.len(),
    });
    ctx.events.emit(WorkflowEvent::Status {
        message: "Generating files...".to_string(),
    });

    let tasks = plan.files.iter().map(|file| {
        let job = FileJob {
            id: file.path.clone(),
            repo: repo.clone(),
            branch: repository.default_branch.clone(),
            path: file.path.clone(),
            commit_message: format!("AI Create: {}", file.path),
            source: ContentSource::New,
        };
        execute_file_job(ctx, board, job, move |_| {
            file_generation_prompt(goal, &file.path, &file.description)
        })
    });
    run_bounded(tasks, ctx.config.generation_concurrency).await;

    let (succeeded, failed) = board.tally();
    ctx.events.emit(WorkflowEvent::Finished {
        workflow: WorkflowKind::ProjectGeneration,
        succeeded,
        failed,
    });
    info!(succeeded, failed, "Project generation finished");

    Ok(ProjectGenerationSummary {
        repository,
        plan,
        succeeded,
        failed,
        jobs: board.snapshot(),
    })
}
