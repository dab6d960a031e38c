//! In-memory model and version-control backends for service tests.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

use repo_weaver_core::{RepoRef, UnifiedStreamEvent};
use repo_weaver_github::{
    Branch, CommitRef, GitHubError, GitHubResult, Owner, PullRequest, RemoteFile, Repository,
    RunJob, TreeItem, TreeItemKind, VcsBackend, Workflow, WorkflowRun,
};
use repo_weaver_llm::{LlmError, LlmResult, ModelBackend, ResponseSchema};

/// What one streaming call produces
#[derive(Debug, Clone)]
pub struct StreamScript {
    chunks: Vec<String>,
    error: Option<LlmError>,
}

impl StreamScript {
    pub fn chunks(chunks: &[&str]) -> Self {
        Self {
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            error: None,
        }
    }

    pub fn fail(error: LlmError) -> Self {
        Self::fail_after(&[], error)
    }

    pub fn fail_after(chunks: &[&str], error: LlmError) -> Self {
        Self {
            error: Some(error),
            ..Self::chunks(chunks)
        }
    }
}

pub fn server_error(message: &str) -> LlmError {
    LlmError::ServerError {
        message: message.to_string(),
        status: Some(500),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeCall {
    pub model: String,
    pub prompt: String,
}

type StructuredFn = dyn Fn(&str, &str) -> LlmResult<Value> + Send + Sync;
type StreamFn = dyn Fn(&str, &str) -> StreamScript + Send + Sync;

/// Scripted model backend. Responses are computed from `(model, prompt)`.
pub struct FakeModelBackend {
    structured: Box<StructuredFn>,
    stream: Box<StreamFn>,
    chunk_delay: Option<Duration>,
    structured_calls: Mutex<Vec<FakeCall>>,
    stream_calls: Mutex<Vec<FakeCall>>,
}

impl FakeModelBackend {
    pub fn new() -> Self {
        Self {
            structured: Box::new(|_, _| Err(LlmError::EmptyResponse)),
            stream: Box::new(|_, _| StreamScript::chunks(&[])),
            chunk_delay: None,
            structured_calls: Mutex::new(Vec::new()),
            stream_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_structured(
        mut self,
        f: impl Fn(&str, &str) -> LlmResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.structured = Box::new(f);
        self
    }

    pub fn with_stream(
        mut self,
        f: impl Fn(&str, &str) -> StreamScript + Send + Sync + 'static,
    ) -> Self {
        self.stream = Box::new(f);
        self
    }

    /// Sleep before every chunk so concurrent streams interleave.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = Some(delay);
        self
    }

    pub fn structured_calls(&self) -> Vec<FakeCall> {
        self.structured_calls.lock().clone()
    }

    pub fn stream_calls(&self) -> Vec<FakeCall> {
        self.stream_calls.lock().clone()
    }
}

#[async_trait]
impl ModelBackend for FakeModelBackend {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn generate_structured(
        &self,
        model: &str,
        prompt: &str,
        _schema: &ResponseSchema,
    ) -> LlmResult<Value> {
        self.structured_calls.lock().push(FakeCall {
            model: model.to_string(),
            prompt: prompt.to_string(),
        });
        (self.structured)(model, prompt)
    }

    async fn stream_text(
        &self,
        model: &str,
        prompt: &str,
        tx: mpsc::Sender<UnifiedStreamEvent>,
    ) -> LlmResult<()> {
        self.stream_calls.lock().push(FakeCall {
            model: model.to_string(),
            prompt: prompt.to_string(),
        });
        let script = (self.stream)(model, prompt);

        for chunk in script.chunks {
            if let Some(delay) = self.chunk_delay {
                tokio::time::sleep(delay).await;
            }
            if tx
                .send(UnifiedStreamEvent::TextDelta { content: chunk })
                .await
                .is_err()
            {
                return Ok(());
            }
        }
        if let Some(error) = script.error {
            return Err(error);
        }
        let _ = tx
            .send(UnifiedStreamEvent::Complete {
                stop_reason: Some("STOP".to_string()),
            })
            .await;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeCommit {
    pub repo: String,
    pub branch: String,
    pub path: String,
    pub content: String,
    pub message: String,
    pub sha: Option<String>,
}

#[derive(Debug)]
struct FakeRun {
    run: WorkflowRun,
    conclusion: String,
    polls_left: usize,
}

#[derive(Debug, Default)]
struct FakeVcsState {
    repos: Vec<Repository>,
    files: BTreeMap<(String, String), (String, String)>,
    branches: Vec<Branch>,
    next_sha: u64,
    commits: Vec<FakeCommit>,
    failing_paths: HashSet<String>,
    failing_reads: HashSet<String>,
    build_results: VecDeque<String>,
    in_progress_polls: usize,
    runs: Vec<FakeRun>,
    triggers: usize,
    run_polls: usize,
    pull_requests: Vec<(String, String)>,
    logs_unavailable: bool,
}

/// In-memory repository host with scripted workflow runs.
///
/// Commits follow the remote's version-token rules: replacing a file needs
/// its current SHA and creating one must not pass a SHA.
#[derive(Debug, Default)]
pub struct FakeVcs {
    state: Mutex<FakeVcsState>,
}

impl FakeVcs {
    pub fn new() -> Self {
        let vcs = Self::default();
        vcs.state.lock().branches.push(Branch {
            name: "main".to_string(),
            commit: CommitRef {
                sha: "tip-main".to_string(),
            },
            protected: false,
        });
        vcs
    }

    pub fn with_repo(self, full_name: &str) -> Self {
        if let Ok(repo) = RepoRef::parse(full_name) {
            let mut state = self.state.lock();
            let id = state.repos.len() as u64 + 1;
            state.repos.push(Repository {
                id,
                name: repo.name.clone(),
                full_name: repo.full_name(),
                owner: Owner {
                    login: repo.owner.clone(),
                },
                default_branch: "main".to_string(),
                private: false,
            });
        }
        self
    }

    pub fn with_file(self, repo: &str, path: &str, content: &str) -> Self {
        {
            let mut state = self.state.lock();
            let sha = state.mint_sha();
            state
                .files
                .insert((repo.to_string(), path.to_string()), (content.to_string(), sha));
        }
        self
    }

    /// Commits to `path` are rejected with a server error.
    pub fn failing_commits_for(self, path: &str) -> Self {
        self.state.lock().failing_paths.insert(path.to_string());
        self
    }

    /// Reads of `path` are rejected as unauthorized.
    pub fn failing_reads_for(self, path: &str) -> Self {
        self.state.lock().failing_reads.insert(path.to_string());
        self
    }

    /// Conclusions handed to successive workflow runs; `success` once exhausted.
    pub fn with_build_results(self, results: &[&str]) -> Self {
        self.state
            .lock()
            .build_results
            .extend(results.iter().map(|r| r.to_string()));
        self
    }

    /// Number of polls that see each run still in progress.
    pub fn with_in_progress_polls(self, polls: usize) -> Self {
        self.state.lock().in_progress_polls = polls;
        self
    }

    pub fn without_job_logs(self) -> Self {
        self.state.lock().logs_unavailable = true;
        self
    }

    pub fn file(&self, repo: &str, path: &str) -> Option<(String, String)> {
        self.state
            .lock()
            .files
            .get(&(repo.to_string(), path.to_string()))
            .cloned()
    }

    pub fn commits(&self) -> Vec<FakeCommit> {
        self.state.lock().commits.clone()
    }

    pub fn triggers(&self) -> usize {
        self.state.lock().triggers
    }

    pub fn run_polls(&self) -> usize {
        self.state.lock().run_polls
    }

    pub fn branch_names(&self) -> Vec<String> {
        self.state.lock().branches.iter().map(|b| b.name.clone()).collect()
    }

    pub fn pull_requests(&self) -> Vec<(String, String)> {
        self.state.lock().pull_requests.clone()
    }
}

impl FakeVcsState {
    fn mint_sha(&mut self) -> String {
        self.next_sha += 1;
        format!("sha{}", self.next_sha)
    }
}

#[async_trait]
impl VcsBackend for FakeVcs {
    async fn list_repositories(&self, page: u32, per_page: u32) -> GitHubResult<Vec<Repository>> {
        let state = self.state.lock();
        let start = ((page.saturating_sub(1)) * per_page) as usize;
        Ok(state
            .repos
            .iter()
            .skip(start)
            .take(per_page as usize)
            .cloned()
            .collect())
    }

    async fn fetch_tree(&self, repo: &RepoRef, _branch: &str) -> GitHubResult<Vec<TreeItem>> {
        let full_name = repo.full_name();
        let state = self.state.lock();
        Ok(state
            .files
            .iter()
            .filter(|((r, _), _)| *r == full_name)
            .map(|((_, path), (content, sha))| TreeItem {
                path: path.clone(),
                kind: TreeItemKind::Blob,
                sha: sha.clone(),
                size: Some(content.len() as u64),
            })
            .collect())
    }

    async fn get_file(
        &self,
        repo: &RepoRef,
        path: &str,
        _branch: Option<&str>,
    ) -> GitHubResult<RemoteFile> {
        let state = self.state.lock();
        if state.failing_reads.contains(path) {
            return Err(GitHubError::api(401, "Bad credentials"));
        }
        state
            .files
            .get(&(repo.full_name(), path.to_string()))
            .map(|(content, sha)| RemoteFile {
                path: path.to_string(),
                content: content.clone(),
                sha: sha.clone(),
            })
            .ok_or_else(|| GitHubError::api(404, "Not Found"))
    }

    async fn commit_file(
        &self,
        repo: &RepoRef,
        branch: &str,
        path: &str,
        content: &str,
        message: &str,
        sha: Option<&str>,
    ) -> GitHubResult<String> {
        let mut state = self.state.lock();
        if state.failing_paths.contains(path) {
            return Err(GitHubError::api(500, "Server Error"));
        }
        let key = (repo.full_name(), path.to_string());
        match (state.files.get(&key), sha) {
            (Some((_, current)), Some(given)) if current.as_str() != given => {
                return Err(GitHubError::api(
                    409,
                    format!("{} does not match {}", path, given),
                ));
            }
            (Some(_), None) => {
                return Err(GitHubError::api(422, "\"sha\" wasn't supplied."));
            }
            (None, Some(_)) => {
                return Err(GitHubError::api(404, "Not Found"));
            }
            _ => {}
        }

        let new_sha = state.mint_sha();
        state
            .files
            .insert(key, (content.to_string(), new_sha.clone()));
        state.commits.push(FakeCommit {
            repo: repo.full_name(),
            branch: branch.to_string(),
            path: path.to_string(),
            content: content.to_string(),
            message: message.to_string(),
            sha: sha.map(str::to_string),
        });
        Ok(new_sha)
    }

    async fn list_branches(&self, _repo: &RepoRef) -> GitHubResult<Vec<Branch>> {
        Ok(self.state.lock().branches.clone())
    }

    async fn get_branch(&self, _repo: &RepoRef, branch: &str) -> GitHubResult<Branch> {
        self.state
            .lock()
            .branches
            .iter()
            .find(|b| b.name == branch)
            .cloned()
            .ok_or_else(|| GitHubError::api(404, "Branch not found"))
    }

    async fn create_branch(&self, _repo: &RepoRef, name: &str, base_sha: &str) -> GitHubResult<()> {
        let mut state = self.state.lock();
        if state.branches.iter().any(|b| b.name == name) {
            return Err(GitHubError::api(422, "Reference already exists"));
        }
        state.branches.push(Branch {
            name: name.to_string(),
            commit: CommitRef {
                sha: base_sha.to_string(),
            },
            protected: false,
        });
        Ok(())
    }

    async fn create_pull_request(
        &self,
        repo: &RepoRef,
        title: &str,
        _body: &str,
        head: &str,
        base: &str,
    ) -> GitHubResult<PullRequest> {
        let mut state = self.state.lock();
        state
            .pull_requests
            .push((head.to_string(), base.to_string()));
        let number = state.pull_requests.len() as u64;
        Ok(PullRequest {
            id: number,
            number,
            html_url: format!("https://github.com/{}/pull/{}", repo, number),
            title: title.to_string(),
            state: "open".to_string(),
        })
    }

    async fn create_repository(
        &self,
        name: &str,
        _description: &str,
        private: bool,
    ) -> GitHubResult<Repository> {
        let mut state = self.state.lock();
        let id = state.repos.len() as u64 + 1;
        let repo = Repository {
            id,
            name: name.to_string(),
            full_name: format!("octocat/{}", name),
            owner: Owner {
                login: "octocat".to_string(),
            },
            default_branch: "main".to_string(),
            private,
        };
        state.repos.push(repo.clone());
        Ok(repo)
    }

    async fn list_workflows(&self, _repo: &RepoRef) -> GitHubResult<Vec<Workflow>> {
        Ok(vec![Workflow {
            id: 42,
            name: "CI".to_string(),
            path: ".github/workflows/ci.yml".to_string(),
            state: "active".to_string(),
        }])
    }

    async fn trigger_workflow(
        &self,
        repo: &RepoRef,
        _workflow_id: &str,
        branch: &str,
    ) -> GitHubResult<()> {
        let mut state = self.state.lock();
        state.triggers += 1;
        let id = state.triggers as u64;
        let conclusion = state
            .build_results
            .pop_front()
            .unwrap_or_else(|| "success".to_string());
        let polls_left = state.in_progress_polls;
        state.runs.push(FakeRun {
            run: WorkflowRun {
                id,
                name: Some("CI".to_string()),
                head_branch: branch.to_string(),
                status: "queued".to_string(),
                conclusion: None,
                html_url: format!("https://github.com/{}/actions/runs/{}", repo, id),
            },
            conclusion,
            polls_left,
        });
        Ok(())
    }

    async fn list_workflow_runs(
        &self,
        _repo: &RepoRef,
        _workflow_id: &str,
        _branch: &str,
    ) -> GitHubResult<Vec<WorkflowRun>> {
        let mut state = self.state.lock();
        state.run_polls += 1;
        if let Some(latest) = state.runs.last_mut() {
            if latest.polls_left > 0 {
                latest.polls_left -= 1;
                latest.run.status = "in_progress".to_string();
            } else {
                latest.run.status = "completed".to_string();
                latest.run.conclusion = Some(latest.conclusion.clone());
            }
        }
        Ok(state.runs.iter().rev().map(|r| r.run.clone()).collect())
    }

    async fn get_workflow_run(&self, _repo: &RepoRef, run_id: u64) -> GitHubResult<WorkflowRun> {
        self.state
            .lock()
            .runs
            .iter()
            .find(|r| r.run.id == run_id)
            .map(|r| r.run.clone())
            .ok_or_else(|| GitHubError::api(404, "Not Found"))
    }

    async fn list_run_jobs(&self, _repo: &RepoRef, run_id: u64) -> GitHubResult<Vec<RunJob>> {
        let state = self.state.lock();
        let conclusion = state
            .runs
            .iter()
            .find(|r| r.run.id == run_id)
            .and_then(|r| r.run.conclusion.clone());
        Ok(vec![RunJob {
            id: run_id * 10,
            name: "build".to_string(),
            conclusion,
        }])
    }

    async fn get_job_logs(&self, _repo: &RepoRef, job_id: u64) -> GitHubResult<String> {
        if self.state.lock().logs_unavailable {
            return Err(GitHubError::api(410, "Gone"));
        }
        Ok(format!("error: build {} failed", job_id / 10))
    }
}

/// App state over a throwaway config file and the given fakes.
pub async fn fake_state(
    backend: FakeModelBackend,
    vcs: FakeVcs,
) -> (crate::state::AppState, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let state = crate::state::AppState::new();
    state
        .initialize_with(
            crate::storage::ConfigService::open(dir.path().join("config.json")).unwrap(),
        )
        .await;
    let state = state
        .with_backends(std::sync::Arc::new(backend), std::sync::Arc::new(vcs))
        .await;
    (state, dir)
}
