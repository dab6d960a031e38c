//! Editor Session
//!
//! State of one user session against the repository host: loaded
//! repositories with their trees and branches, the open files and their
//! edit buffers, and the per-repository working branch. The workflow
//! requests are assembled from here.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, error, info, warn};

use repo_weaver_core::{FileKey, RepoRef};
use repo_weaver_github::{
    build_tree, fetch_all_repositories, Branch, PullRequest, Repository, TreeNode, VcsBackend,
};
use repo_weaver_llm::ModelBackend;

use crate::models::plan::ContextFile;
use crate::services::generation::{single_file_edit_prompt, stream_to_sink};
use crate::services::roster::ModelRoster;
use crate::services::sanitizer::sanitize;
use crate::services::workflows::bulk_edit::{BulkEditRequest, DEFAULT_BRANCH};
use crate::services::workflows::{AdvancedEditRequest, EventSink, ExpansionRequest};
use crate::utils::error::{AppError, AppResult};

/// A loaded repository
#[derive(Debug, Clone)]
pub struct RepoEntry {
    pub repository: Repository,
    pub tree: Vec<TreeNode>,
    pub branches: Vec<Branch>,
    /// Working branch; starts at the default branch
    pub current_branch: String,
}

/// A file open in the editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenFile {
    pub key: FileKey,
    /// Content as last read from or written to the remote
    pub content: String,
    /// Buffer with local edits
    pub edited_content: String,
    pub sha: String,
    pub default_branch: String,
}

impl OpenFile {
    pub fn is_dirty(&self) -> bool {
        self.content != self.edited_content
    }

    fn as_context(&self) -> ContextFile {
        ContextFile::new(self.key.path.clone(), self.content.clone()).with_sha(self.sha.clone())
    }
}

pub struct EditorSession {
    vcs: Arc<dyn VcsBackend>,
    backend: Arc<dyn ModelBackend>,
    roster: ModelRoster,
    events: EventSink,
    repos: BTreeMap<String, RepoEntry>,
    open_files: Vec<OpenFile>,
    active: Option<FileKey>,
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("repos", &self.repos.len())
            .field("open_files", &self.open_files.len())
            .field("active", &self.active)
            .finish()
    }
}

impl EditorSession {
    pub fn new(
        vcs: Arc<dyn VcsBackend>,
        backend: Arc<dyn ModelBackend>,
        roster: ModelRoster,
    ) -> Self {
        Self {
            vcs,
            backend,
            roster,
            events: EventSink::disabled(),
            repos: BTreeMap::new(),
            open_files: Vec::new(),
            active: None,
        }
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    // ------------------------------------------------------------------
    // Repositories
    // ------------------------------------------------------------------

    /// Load every repository with its default-branch tree and branch list.
    ///
    /// A repository whose tree or branches cannot be read is kept with
    /// whatever loaded; only a failed listing is an error.
    pub async fn load_repositories(&mut self) -> AppResult<usize> {
        let repositories = match fetch_all_repositories(self.vcs.as_ref()).await {
            Ok(repos) => repos,
            Err(e) => {
                error!("Failed to list repositories: {}", e);
                self.events
                    .alert_error("Failed to load repositories. Check your token.");
                return Err(e.into());
            }
        };

        let vcs = self.vcs.as_ref();
        let entries = join_all(repositories.into_iter().map(|repository| async move {
            let repo = repository.repo_ref();
            let tree = match vcs.fetch_tree(&repo, &repository.default_branch).await {
                Ok(items) => build_tree(&items),
                Err(e) => {
                    warn!(repo = %repo, "Failed to fetch tree: {}", e);
                    Vec::new()
                }
            };
            let branches = match vcs.list_branches(&repo).await {
                Ok(branches) => branches,
                Err(e) => {
                    warn!(repo = %repo, "Failed to list branches: {}", e);
                    Vec::new()
                }
            };
            RepoEntry {
                current_branch: repository.default_branch.clone(),
                repository,
                tree,
                branches,
            }
        }))
        .await;

        self.repos = entries
            .into_iter()
            .map(|entry| (entry.repository.full_name.clone(), entry))
            .collect();
        info!(repos = self.repos.len(), "Repositories loaded");
        Ok(self.repos.len())
    }

    pub fn repositories(&self) -> impl Iterator<Item = &RepoEntry> {
        self.repos.values()
    }

    pub fn repository(&self, repo: &RepoRef) -> Option<&RepoEntry> {
        self.repos.get(&repo.full_name())
    }

    fn repository_or_err(&self, repo: &RepoRef) -> AppResult<&RepoEntry> {
        self.repository(repo)
            .ok_or_else(|| AppError::not_found(format!("Repository {}", repo)))
    }

    /// Working branch of `repo`; unknown repositories fall back to `main`.
    pub fn current_branch(&self, repo: &RepoRef) -> String {
        self.repository(repo)
            .map(|entry| entry.current_branch.clone())
            .unwrap_or_else(|| DEFAULT_BRANCH.to_string())
    }

    /// Working branches of every loaded repository.
    pub fn branches_by_repo(&self) -> HashMap<RepoRef, String> {
        self.repos
            .values()
            .map(|entry| (entry.repository.repo_ref(), entry.current_branch.clone()))
            .collect()
    }

    // ------------------------------------------------------------------
    // Files
    // ------------------------------------------------------------------

    pub fn open_files(&self) -> &[OpenFile] {
        &self.open_files
    }

    pub fn active_file(&self) -> Option<&OpenFile> {
        let key = self.active.as_ref()?;
        self.open_files.iter().find(|f| &f.key == key)
    }

    fn active_key(&self) -> AppResult<FileKey> {
        self.active
            .clone()
            .ok_or_else(|| AppError::validation("No active file"))
    }

    fn open_file_mut(&mut self, key: &FileKey) -> AppResult<&mut OpenFile> {
        self.open_files
            .iter_mut()
            .find(|f| &f.key == key)
            .ok_or_else(|| AppError::not_found(format!("Open file {}", key)))
    }

    /// Open `key` at its repository's working branch and make it active.
    /// Files already open are not fetched again.
    pub async fn open_file(&mut self, key: &FileKey) -> AppResult<&OpenFile> {
        if !self.open_files.iter().any(|f| &f.key == key) {
            match self.fetch_open_file(key).await {
                Ok(file) => self.open_files.push(file),
                Err(e) => {
                    error!(file = %key, "Failed to open file: {}", e);
                    self.events
                        .alert_error(format!("Failed to open file: {}", key.path));
                    return Err(e);
                }
            }
        }
        self.active = Some(key.clone());
        self.open_file_mut(key).map(|f| &*f)
    }

    async fn fetch_open_file(&self, key: &FileKey) -> AppResult<OpenFile> {
        let entry = self.repository_or_err(&key.repo)?;
        let remote = self
            .vcs
            .get_file(&key.repo, &key.path, Some(&entry.current_branch))
            .await?;
        Ok(OpenFile {
            key: key.clone(),
            content: remote.content.clone(),
            edited_content: remote.content,
            sha: remote.sha,
            default_branch: entry.repository.default_branch.clone(),
        })
    }

    pub fn close_file(&mut self, key: &FileKey) {
        self.open_files.retain(|f| &f.key != key);
        if self.active.as_ref() == Some(key) {
            self.active = None;
        }
    }

    pub fn set_active(&mut self, key: &FileKey) -> AppResult<()> {
        self.open_file_mut(key)?;
        self.active = Some(key.clone());
        Ok(())
    }

    /// Replace the edit buffer of an open file.
    pub fn update_buffer(&mut self, key: &FileKey, content: impl Into<String>) -> AppResult<()> {
        self.open_file_mut(key)?.edited_content = content.into();
        Ok(())
    }

    /// Commit the active buffer to the working branch and adopt the new SHA.
    pub async fn commit_active(&mut self, message: &str) -> AppResult<String> {
        let result = self.commit_active_inner(message).await;
        match &result {
            Ok(_) => self
                .events
                .alert_success("Changes committed successfully!"),
            Err(e) => {
                error!("Commit failed: {}", e);
                self.events.alert_error("Failed to commit changes.");
            }
        }
        result
    }

    async fn commit_active_inner(&mut self, message: &str) -> AppResult<String> {
        let key = self.active_key()?;
        let branch = self.current_branch(&key.repo);
        let (content, sha) = {
            let file = self.open_file_mut(&key)?;
            (file.edited_content.clone(), file.sha.clone())
        };

        let new_sha = self
            .vcs
            .commit_file(&key.repo, &branch, &key.path, &content, message, Some(&sha))
            .await?;

        let file = self.open_file_mut(&key)?;
        file.content = content;
        file.sha = new_sha.clone();
        info!(file = %key, branch = %branch, "Committed active file");
        Ok(new_sha)
    }

    /// Single-file AI edit of the active buffer with the primary model.
    ///
    /// Fragments land in the buffer as they arrive; the final buffer is the
    /// sanitized reply. Nothing is committed.
    pub async fn ai_edit_active(&mut self, instruction: &str) -> AppResult<()> {
        let result = self.ai_edit_active_inner(instruction).await;
        if let Err(e) = &result {
            error!("AI edit failed: {}", e);
            self.events.alert_error("AI Edit failed.");
        }
        result
    }

    async fn ai_edit_active_inner(&mut self, instruction: &str) -> AppResult<()> {
        let key = self.active_key()?;
        let (path, original) = {
            let file = self.open_file_mut(&key)?;
            (file.key.path.clone(), file.edited_content.clone())
        };
        let prompt = single_file_edit_prompt(instruction, &path, &original);

        let backend = self.backend.clone();
        let model = self.roster.primary_model().to_string();
        let mut accumulated = String::new();
        {
            let file = self.open_file_mut(&key)?;
            stream_to_sink(backend.as_ref(), &model, &prompt, |fragment| {
                accumulated.push_str(fragment);
                file.edited_content.clone_from(&accumulated);
            })
            .await?;
        }

        self.open_file_mut(&key)?.edited_content = sanitize(&accumulated);
        debug!(file = %key, "AI edit applied to buffer");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Branches and pull requests
    // ------------------------------------------------------------------

    /// Make `branch` the working branch of `repo`, reloading its tree and
    /// the open files that belong to it.
    pub async fn switch_branch(&mut self, repo: &RepoRef, branch: &str) -> AppResult<()> {
        let result = self.switch_branch_inner(repo, branch).await;
        if let Err(e) = &result {
            error!(repo = %repo, branch, "Error switching branch: {}", e);
            self.events
                .alert_error("Failed to switch branch/reload file.");
        }
        result
    }

    async fn switch_branch_inner(&mut self, repo: &RepoRef, branch: &str) -> AppResult<()> {
        let full_name = repo.full_name();
        match self.repos.get_mut(&full_name) {
            Some(entry) => entry.current_branch = branch.to_string(),
            None => return Err(AppError::not_found(format!("Repository {}", repo))),
        }

        let keys: Vec<FileKey> = self
            .open_files
            .iter()
            .filter(|f| &f.key.repo == repo)
            .map(|f| f.key.clone())
            .collect();
        for key in keys {
            let remote = self.vcs.get_file(repo, &key.path, Some(branch)).await?;
            let file = self.open_file_mut(&key)?;
            file.content = remote.content.clone();
            file.edited_content = remote.content;
            file.sha = remote.sha;
        }

        let items = self.vcs.fetch_tree(repo, branch).await?;
        if let Some(entry) = self.repos.get_mut(&full_name) {
            entry.tree = build_tree(&items);
        }
        info!(repo = %repo, branch, "Switched branch");
        Ok(())
    }

    /// Create `name` at the tip of the working branch and switch to it.
    pub async fn create_branch(&mut self, repo: &RepoRef, name: &str) -> AppResult<()> {
        let result = self.create_branch_inner(repo, name).await;
        match &result {
            Ok(()) => self
                .events
                .alert_success(format!("Branch {} created and active.", name)),
            Err(e) => {
                error!(repo = %repo, branch = name, "Failed to create branch: {}", e);
                self.events.alert_error("Failed to create branch.");
            }
        }
        result
    }

    async fn create_branch_inner(&mut self, repo: &RepoRef, name: &str) -> AppResult<()> {
        if name.trim().is_empty() {
            return Err(AppError::validation("Branch name must not be empty"));
        }
        let current = self.current_branch(repo);
        let branches = self.vcs.list_branches(repo).await?;
        let tip = branches
            .iter()
            .find(|b| b.name == current)
            .map(|b| b.commit.sha.clone())
            .ok_or_else(|| {
                AppError::not_found(format!("Tip of branch {} in {}", current, repo))
            })?;

        self.vcs.create_branch(repo, name, &tip).await?;
        let branches = self.vcs.list_branches(repo).await?;
        if let Some(entry) = self.repos.get_mut(&repo.full_name()) {
            entry.branches = branches;
        }
        self.switch_branch_inner(repo, name).await
    }

    /// Open a pull request from the working branch into the default branch.
    pub async fn create_pull_request(
        &mut self,
        repo: &RepoRef,
        title: &str,
        body: &str,
    ) -> AppResult<PullRequest> {
        let result = self.create_pull_request_inner(repo, title, body).await;
        match &result {
            Ok(pr) => self.events.alert_success(format!(
                "Pull Request #{} created: {}",
                pr.number, pr.html_url
            )),
            Err(e) => {
                error!(repo = %repo, "Failed to create pull request: {}", e);
                self.events.alert_error("Failed to create Pull Request.");
            }
        }
        result
    }

    async fn create_pull_request_inner(
        &self,
        repo: &RepoRef,
        title: &str,
        body: &str,
    ) -> AppResult<PullRequest> {
        let entry = self.repository_or_err(repo)?;
        let head = entry.current_branch.as_str();
        let base = entry.repository.default_branch.as_str();
        if head == base {
            return Err(AppError::validation(format!(
                "Working branch {} is the default branch",
                head
            )));
        }
        Ok(self
            .vcs
            .create_pull_request(repo, title, body, head, base)
            .await?)
    }

    // ------------------------------------------------------------------
    // Workflow requests
    // ------------------------------------------------------------------

    pub fn bulk_edit_request(&self, instruction: &str, files: Vec<FileKey>) -> BulkEditRequest {
        BulkEditRequest {
            instruction: instruction.to_string(),
            files,
            branches: self.branches_by_repo(),
        }
    }

    /// Expansion around `seed_files` on the seed repository's working branch.
    pub fn expansion_request(&self, prompt: &str, seed_files: Vec<FileKey>) -> ExpansionRequest {
        let branch = seed_files
            .first()
            .and_then(|key| self.repository(&key.repo))
            .map(|entry| entry.current_branch.clone());
        ExpansionRequest {
            prompt: prompt.to_string(),
            seed_files,
            branch,
        }
    }

    /// Advanced edit of the active file's repository, with that
    /// repository's open files as planning context.
    pub fn advanced_edit_request(
        &self,
        instruction: &str,
        workflow_id: &str,
    ) -> AppResult<AdvancedEditRequest> {
        let active = self
            .active_file()
            .ok_or_else(|| AppError::validation("No active file"))?;
        let repo = active.key.repo.clone();
        Ok(AdvancedEditRequest {
            instruction: instruction.to_string(),
            branch: self.current_branch(&repo),
            workflow_id: workflow_id.to_string(),
            active_path: active.key.path.clone(),
            open_files: self
                .open_files
                .iter()
                .filter(|f| f.key.repo == repo)
                .map(OpenFile::as_context)
                .collect(),
            repo,
        })
    }
}
