//! Workflow Commands
//!
//! Launch the multi-file AI workflows. Working branches come from an
//! editor session, so every repository defaults to its own default branch.

use repo_weaver_core::{FileKey, RepoRef};

use crate::models::response::CommandResponse;
use crate::services::workflows::advanced_edit::run_advanced_edit;
use crate::services::workflows::bulk_edit::run_bulk_edit;
use crate::services::workflows::project_expansion::run_project_expansion;
use crate::services::workflows::project_generation::run_project_generation;
use crate::services::workflows::{
    AdvancedEditSnapshot, BulkEditSummary, EventSink, ExpansionSummary, ProjectGenerationRequest,
    ProjectGenerationSummary,
};
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};

use super::editor::open_session;

#[derive(Debug, Clone)]
pub struct BulkEditArgs {
    pub instruction: String,
    pub files: Vec<FileKey>,
    /// Branch for every touched repository instead of its default branch
    pub branch: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ExpandArgs {
    pub prompt: String,
    pub seeds: Vec<FileKey>,
    pub branch: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AdvancedEditArgs {
    pub instruction: String,
    pub repo: RepoRef,
    pub branch: Option<String>,
    pub workflow_id: String,
    /// File the change is centred on
    pub active_path: String,
    /// Further files to hand the planner as context
    pub context_paths: Vec<String>,
}

/// Apply one instruction to every listed file
pub async fn bulk_edit(
    state: &AppState,
    events: EventSink,
    args: BulkEditArgs,
) -> CommandResponse<BulkEditSummary> {
    run_bulk(state, events, args).await.into()
}

/// Create a repository and fill it from a description
pub async fn new_project(
    state: &AppState,
    events: EventSink,
    request: ProjectGenerationRequest,
) -> CommandResponse<ProjectGenerationSummary> {
    let result = match state.workflow_context(events).await {
        Ok(ctx) => {
            let board = ctx.new_board();
            run_project_generation(&ctx, &board, request).await
        }
        Err(e) => Err(e),
    };
    result.into()
}

/// Grow a codebase around a read-only seed file
pub async fn expand_project(
    state: &AppState,
    events: EventSink,
    args: ExpandArgs,
) -> CommandResponse<ExpansionSummary> {
    run_expand(state, events, args).await.into()
}

/// Plan, edit and verify against an Actions workflow until the build passes
pub async fn advanced_edit(
    state: &AppState,
    events: EventSink,
    args: AdvancedEditArgs,
) -> CommandResponse<AdvancedEditSnapshot> {
    run_advanced(state, events, args).await.into()
}

async fn run_bulk(
    state: &AppState,
    events: EventSink,
    args: BulkEditArgs,
) -> AppResult<BulkEditSummary> {
    let ctx = state.workflow_context(events.clone()).await?;
    let mut session = state.editor_session(events).await?;
    session.load_repositories().await?;

    let mut request = session.bulk_edit_request(&args.instruction, args.files);
    if let Some(branch) = args.branch {
        for key in &request.files {
            request.branches.insert(key.repo.clone(), branch.clone());
        }
    }

    let board = ctx.new_board();
    run_bulk_edit(&ctx, &board, request).await
}

async fn run_expand(
    state: &AppState,
    events: EventSink,
    args: ExpandArgs,
) -> AppResult<ExpansionSummary> {
    let ctx = state.workflow_context(events.clone()).await?;
    let mut session = state.editor_session(events).await?;
    session.load_repositories().await?;
    if let (Some(seed), Some(branch)) = (args.seeds.first(), args.branch.as_deref()) {
        if session.current_branch(&seed.repo) != branch {
            session.switch_branch(&seed.repo, branch).await?;
        }
    }

    let request = session.expansion_request(&args.prompt, args.seeds);
    let board = ctx.new_board();
    run_project_expansion(&ctx, &board, request).await
}

async fn run_advanced(
    state: &AppState,
    events: EventSink,
    args: AdvancedEditArgs,
) -> AppResult<AdvancedEditSnapshot> {
    if args.active_path.trim().is_empty() {
        return Err(AppError::validation("Active file path must not be empty"));
    }
    let ctx = state.workflow_context(events.clone()).await?;
    let mut session = open_session(state, events, &args.repo, args.branch.as_deref()).await?;

    // The active file is opened last so it ends up active.
    for path in args
        .context_paths
        .iter()
        .filter(|p| **p != args.active_path)
    {
        session.open_file(&FileKey::new(args.repo.clone(), path)).await?;
    }
    session
        .open_file(&FileKey::new(args.repo.clone(), args.active_path.as_str()))
        .await?;

    let request = session.advanced_edit_request(&args.instruction, &args.workflow_id)?;
    let monitor = ctx.new_monitor();
    run_advanced_edit(&ctx, &monitor, request).await?;
    Ok(monitor.snapshot())
}
