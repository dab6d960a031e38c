//! Version-Control Backend Trait
//!
//! The operations the editor session and the workflows need from a remote
//! repository host. `GitHubClient` is the production implementation.

use async_trait::async_trait;
use repo_weaver_core::RepoRef;

use crate::error::GitHubResult;
use crate::types::{
    Branch, PullRequest, Repository, RemoteFile, RunJob, TreeItem, Workflow, WorkflowRun,
};

/// Page size used when listing every repository.
pub const REPOSITORY_PAGE_SIZE: u32 = 100;

#[async_trait]
pub trait VcsBackend: Send + Sync {
    /// One page (1-based) of repositories owned by the authenticated user.
    async fn list_repositories(&self, page: u32, per_page: u32) -> GitHubResult<Vec<Repository>>;

    /// Recursive tree listing of `branch`.
    async fn fetch_tree(&self, repo: &RepoRef, branch: &str) -> GitHubResult<Vec<TreeItem>>;

    /// Decoded file content and blob SHA, at `branch` or the default branch.
    async fn get_file(
        &self,
        repo: &RepoRef,
        path: &str,
        branch: Option<&str>,
    ) -> GitHubResult<RemoteFile>;

    /// Create or update a file and return the new blob SHA.
    ///
    /// `sha` must be the current blob SHA when replacing an existing file and
    /// `None` when creating one.
    async fn commit_file(
        &self,
        repo: &RepoRef,
        branch: &str,
        path: &str,
        content: &str,
        message: &str,
        sha: Option<&str>,
    ) -> GitHubResult<String>;

    async fn list_branches(&self, repo: &RepoRef) -> GitHubResult<Vec<Branch>>;

    async fn get_branch(&self, repo: &RepoRef, branch: &str) -> GitHubResult<Branch>;

    /// Create `name` pointing at `base_sha`.
    async fn create_branch(&self, repo: &RepoRef, name: &str, base_sha: &str) -> GitHubResult<()>;

    async fn create_pull_request(
        &self,
        repo: &RepoRef,
        title: &str,
        body: &str,
        head: &str,
        base: &str,
    ) -> GitHubResult<PullRequest>;

    /// Create an auto-initialized repository for the authenticated user.
    async fn create_repository(
        &self,
        name: &str,
        description: &str,
        private: bool,
    ) -> GitHubResult<Repository>;

    async fn list_workflows(&self, repo: &RepoRef) -> GitHubResult<Vec<Workflow>>;

    /// Dispatch `workflow_id` on `branch`.
    async fn trigger_workflow(
        &self,
        repo: &RepoRef,
        workflow_id: &str,
        branch: &str,
    ) -> GitHubResult<()>;

    /// Runs of `workflow_id` on `branch`, newest first.
    async fn list_workflow_runs(
        &self,
        repo: &RepoRef,
        workflow_id: &str,
        branch: &str,
    ) -> GitHubResult<Vec<WorkflowRun>>;

    async fn get_workflow_run(&self, repo: &RepoRef, run_id: u64) -> GitHubResult<WorkflowRun>;

    async fn list_run_jobs(&self, repo: &RepoRef, run_id: u64) -> GitHubResult<Vec<RunJob>>;

    /// Raw log text of a single job.
    async fn get_job_logs(&self, repo: &RepoRef, job_id: u64) -> GitHubResult<String>;
}

/// Walk every page of the repository listing until a short page is returned.
pub async fn fetch_all_repositories(backend: &dyn VcsBackend) -> GitHubResult<Vec<Repository>> {
    let mut all = Vec::new();
    let mut page = 1;
    loop {
        let repos = backend
            .list_repositories(page, REPOSITORY_PAGE_SIZE)
            .await?;
        let count = repos.len();
        all.extend(repos);
        if count < REPOSITORY_PAGE_SIZE as usize {
            break;
        }
        page += 1;
    }
    tracing::debug!(count = all.len(), pages = page, "Loaded repositories");
    Ok(all)
}
