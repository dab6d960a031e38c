//! Repository Commands
//!
//! Listing repositories, browsing trees and discovering Actions workflows.

use serde::Serialize;

use repo_weaver_core::RepoRef;
use repo_weaver_github::{build_tree, fetch_all_repositories, TreeNode, VcsBackend, Workflow};

use crate::models::response::CommandResponse;
use crate::services::workflows::EventSink;
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};

/// One loaded repository
#[derive(Debug, Clone, Serialize)]
pub struct RepositoryListing {
    pub full_name: String,
    pub default_branch: String,
    pub private: bool,
    pub branches: Vec<String>,
    /// Files on the default branch
    pub files: usize,
}

/// Load every repository the token can see, with branches and tree size
pub async fn list_repositories(
    state: &AppState,
    events: EventSink,
) -> CommandResponse<Vec<RepositoryListing>> {
    load_listings(state, events).await.into()
}

/// File tree of `repo` at `branch`, or at its default branch
pub async fn get_tree(
    state: &AppState,
    repo: RepoRef,
    branch: Option<String>,
) -> CommandResponse<Vec<TreeNode>> {
    fetch_tree(state, &repo, branch).await.into()
}

/// Actions workflows defined in `repo`
pub async fn list_workflows(state: &AppState, repo: RepoRef) -> CommandResponse<Vec<Workflow>> {
    let result = match state.vcs().await {
        Ok(vcs) => vcs.list_workflows(&repo).await.map_err(AppError::from),
        Err(e) => Err(e),
    };
    result.into()
}

async fn load_listings(state: &AppState, events: EventSink) -> AppResult<Vec<RepositoryListing>> {
    let mut session = state.editor_session(events).await?;
    session.load_repositories().await?;
    Ok(session
        .repositories()
        .map(|entry| RepositoryListing {
            full_name: entry.repository.full_name.clone(),
            default_branch: entry.repository.default_branch.clone(),
            private: entry.repository.private,
            branches: entry.branches.iter().map(|b| b.name.clone()).collect(),
            files: entry.tree.iter().map(|node| node.file_paths().len()).sum(),
        })
        .collect())
}

async fn fetch_tree(
    state: &AppState,
    repo: &RepoRef,
    branch: Option<String>,
) -> AppResult<Vec<TreeNode>> {
    let vcs = state.vcs().await?;
    let branch = match branch {
        Some(branch) => branch,
        None => default_branch(vcs.as_ref(), repo).await?,
    };
    let items = vcs.fetch_tree(repo, &branch).await?;
    Ok(build_tree(&items))
}

pub(crate) async fn default_branch(vcs: &dyn VcsBackend, repo: &RepoRef) -> AppResult<String> {
    let repositories = fetch_all_repositories(vcs).await?;
    repositories
        .into_iter()
        .find(|r| r.full_name == repo.full_name())
        .map(|r| r.default_branch)
        .ok_or_else(|| AppError::not_found(format!("Repository {}", repo)))
}
