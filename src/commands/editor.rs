//! Editor Commands
//!
//! Single-file operations: AI edit, commit, branch creation and pull
//! requests. Each command replays the editor flow on a fresh
//! [`EditorSession`].

use serde::Serialize;

use repo_weaver_core::{FileKey, RepoRef};
use repo_weaver_github::PullRequest;

use crate::models::response::CommandResponse;
use crate::services::session::EditorSession;
use crate::services::workflows::EventSink;
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct EditFileRequest {
    pub file: FileKey,
    /// Working branch; the default branch when absent
    pub branch: Option<String>,
    pub instruction: String,
    /// Commit the result with this message; leave it uncommitted when absent
    pub commit_message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EditFileResult {
    pub file: String,
    pub branch: String,
    pub content: String,
    pub committed_sha: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommitResult {
    pub file: String,
    pub branch: String,
    pub sha: String,
}

/// Rewrite one file with the primary model, optionally committing it
pub async fn ai_edit_file(
    state: &AppState,
    events: EventSink,
    request: EditFileRequest,
) -> CommandResponse<EditFileResult> {
    edit_file(state, events, request).await.into()
}

/// Commit new content for one file to its working branch
pub async fn commit_file(
    state: &AppState,
    events: EventSink,
    file: FileKey,
    branch: Option<String>,
    content: String,
    message: String,
) -> CommandResponse<CommitResult> {
    commit(state, events, &file, branch.as_deref(), content, &message)
        .await
        .into()
}

/// Create `name` from the tip of `from` (or the default branch)
pub async fn create_branch(
    state: &AppState,
    events: EventSink,
    repo: RepoRef,
    from: Option<String>,
    name: String,
) -> CommandResponse<String> {
    branch(state, events, &repo, from.as_deref(), &name)
        .await
        .into()
}

/// Open a pull request from `branch` into the default branch
pub async fn create_pull_request(
    state: &AppState,
    events: EventSink,
    repo: RepoRef,
    branch: String,
    title: String,
    body: String,
) -> CommandResponse<PullRequest> {
    pull_request(state, events, &repo, &branch, &title, &body)
        .await
        .into()
}

/// Editor session with every repository loaded and `repo` on `branch`.
pub(crate) async fn open_session(
    state: &AppState,
    events: EventSink,
    repo: &RepoRef,
    branch: Option<&str>,
) -> AppResult<EditorSession> {
    let mut session = state.editor_session(events).await?;
    session.load_repositories().await?;
    if session.repository(repo).is_none() {
        return Err(AppError::not_found(format!("Repository {}", repo)));
    }
    if let Some(branch) = branch {
        if session.current_branch(repo) != branch {
            session.switch_branch(repo, branch).await?;
        }
    }
    Ok(session)
}

async fn edit_file(
    state: &AppState,
    events: EventSink,
    request: EditFileRequest,
) -> AppResult<EditFileResult> {
    if request.instruction.trim().is_empty() {
        return Err(AppError::validation("Instruction must not be empty"));
    }
    let repo = &request.file.repo;
    let mut session = open_session(state, events, repo, request.branch.as_deref()).await?;
    session.open_file(&request.file).await?;
    session.ai_edit_active(&request.instruction).await?;

    let committed_sha = match &request.commit_message {
        Some(message) => Some(session.commit_active(message).await?),
        None => None,
    };
    let content = session
        .active_file()
        .map(|f| f.edited_content.clone())
        .unwrap_or_default();

    Ok(EditFileResult {
        file: request.file.to_string(),
        branch: session.current_branch(repo),
        content,
        committed_sha,
    })
}

async fn commit(
    state: &AppState,
    events: EventSink,
    file: &FileKey,
    branch: Option<&str>,
    content: String,
    message: &str,
) -> AppResult<CommitResult> {
    if message.trim().is_empty() {
        return Err(AppError::validation("Commit message must not be empty"));
    }
    let mut session = open_session(state, events, &file.repo, branch).await?;
    session.open_file(file).await?;
    session.update_buffer(file, content)?;
    let sha = session.commit_active(message).await?;
    Ok(CommitResult {
        file: file.to_string(),
        branch: session.current_branch(&file.repo),
        sha,
    })
}

async fn branch(
    state: &AppState,
    events: EventSink,
    repo: &RepoRef,
    from: Option<&str>,
    name: &str,
) -> AppResult<String> {
    let mut session = open_session(state, events, repo, from).await?;
    session.create_branch(repo, name).await?;
    Ok(session.current_branch(repo))
}

async fn pull_request(
    state: &AppState,
    events: EventSink,
    repo: &RepoRef,
    branch: &str,
    title: &str,
    body: &str,
) -> AppResult<PullRequest> {
    if title.trim().is_empty() {
        return Err(AppError::validation("Pull request title must not be empty"));
    }
    let mut session = open_session(state, events, repo, Some(branch)).await?;
    session.create_pull_request(repo, title, body).await
}
