//! GitHub REST Client
//!
//! `VcsBackend` over the GitHub REST API v3. Every request carries the bearer
//! token, the v3 JSON accept header and a pinned API version; job logs are
//! fetched with the raw accept header.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use repo_weaver_core::RepoRef;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::backend::VcsBackend;
use crate::error::{GitHubError, GitHubResult};
use crate::types::{
    Branch, CommitContentResponse, ContentResponse, PullRequest, RemoteFile, Repository, RunJob,
    RunJobsResponse, TreeItem, TreeResponse, Workflow, WorkflowRun, WorkflowRunsResponse,
    WorkflowsResponse,
};

/// Default GitHub API base URL
pub const GITHUB_API_BASE: &str = "https://api.github.com";

const ACCEPT_JSON: &str = "application/vnd.github.v3+json";
const ACCEPT_RAW: &str = "application/vnd.github.v3.raw";
const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("repo-weaver/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

/// Percent-encode each segment of a repository path, keeping the slashes.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Decode the base64 payload of the contents API (wrapped at 60 columns).
fn decode_content(encoded: &str) -> GitHubResult<String> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| GitHubError::Decode(format!("invalid base64 content: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| GitHubError::Decode(format!("content is not UTF-8: {}", e)))
}

pub struct GitHubClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl GitHubClient {
    pub fn new(token: impl Into<String>) -> GitHubResult<Self> {
        Self::with_base_url(token, GITHUB_API_BASE)
    }

    pub fn with_base_url(
        token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> GitHubResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| GitHubError::Network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.request_accepting(method, url, ACCEPT_JSON)
    }

    fn request_accepting(&self, method: Method, url: &str, accept: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, url))
            .bearer_auth(&self.token)
            .header("Accept", accept)
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    fn repo_url(repo: &RepoRef, rest: &str) -> String {
        format!(
            "/repos/{}/{}{}",
            urlencoding::encode(&repo.owner),
            urlencoding::encode(&repo.name),
            rest
        )
    }

    /// Turn a non-success response into `GitHubError::Api`.
    async fn check(response: Response) -> GitHubResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or(body);
        Err(GitHubError::api(status.as_u16(), message))
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> GitHubResult<T> {
        let response = Self::check(builder.send().await?).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| GitHubError::Parse(e.to_string()))
    }

    async fn send_empty(&self, builder: RequestBuilder) -> GitHubResult<()> {
        Self::check(builder.send().await?).await?;
        Ok(())
    }
}

#[async_trait]
impl VcsBackend for GitHubClient {
    async fn list_repositories(&self, page: u32, per_page: u32) -> GitHubResult<Vec<Repository>> {
        let url = format!("/user/repos?type=owner&per_page={}&page={}", per_page, page);
        self.send_json(self.request(Method::GET, &url)).await
    }

    async fn fetch_tree(&self, repo: &RepoRef, branch: &str) -> GitHubResult<Vec<TreeItem>> {
        let url = Self::repo_url(
            repo,
            &format!("/git/trees/{}?recursive=1", urlencoding::encode(branch)),
        );
        let response: TreeResponse = self.send_json(self.request(Method::GET, &url)).await?;
        Ok(response.tree)
    }

    async fn get_file(
        &self,
        repo: &RepoRef,
        path: &str,
        branch: Option<&str>,
    ) -> GitHubResult<RemoteFile> {
        let mut url = Self::repo_url(repo, &format!("/contents/{}", encode_path(path)));
        if let Some(branch) = branch {
            url.push_str(&format!("?ref={}", urlencoding::encode(branch)));
        }
        let response: ContentResponse = self.send_json(self.request(Method::GET, &url)).await?;
        Ok(RemoteFile {
            path: response.path,
            content: decode_content(&response.content)?,
            sha: response.sha,
        })
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
        let url = Self::repo_url(repo, &format!("/contents/{}", encode_path(path)));
        let mut body = serde_json::json!({
            "message": message,
            "content": STANDARD.encode(content.as_bytes()),
            "branch": branch,
        });
        if let Some(sha) = sha {
            body["sha"] = serde_json::Value::String(sha.to_string());
        }
        debug!(repo = %repo, path, branch, replacing = sha.is_some(), "Committing file");
        let response: CommitContentResponse = self
            .send_json(self.request(Method::PUT, &url).json(&body))
            .await?;
        Ok(response.content.sha)
    }

    async fn list_branches(&self, repo: &RepoRef) -> GitHubResult<Vec<Branch>> {
        let url = Self::repo_url(repo, "/branches?per_page=100");
        self.send_json(self.request(Method::GET, &url)).await
    }

    async fn get_branch(&self, repo: &RepoRef, branch: &str) -> GitHubResult<Branch> {
        let url = Self::repo_url(repo, &format!("/branches/{}", urlencoding::encode(branch)));
        self.send_json(self.request(Method::GET, &url)).await
    }

    async fn create_branch(&self, repo: &RepoRef, name: &str, base_sha: &str) -> GitHubResult<()> {
        let url = Self::repo_url(repo, "/git/refs");
        let body = serde_json::json!({
            "ref": format!("refs/heads/{}", name),
            "sha": base_sha,
        });
        self.send_empty(self.request(Method::POST, &url).json(&body))
            .await
    }

    async fn create_pull_request(
        &self,
        repo: &RepoRef,
        title: &str,
        body: &str,
        head: &str,
        base: &str,
    ) -> GitHubResult<PullRequest> {
        let url = Self::repo_url(repo, "/pulls");
        let payload = serde_json::json!({
            "title": title,
            "body": body,
            "head": head,
            "base": base,
        });
        self.send_json(self.request(Method::POST, &url).json(&payload))
            .await
    }

    async fn create_repository(
        &self,
        name: &str,
        description: &str,
        private: bool,
    ) -> GitHubResult<Repository> {
        let payload = serde_json::json!({
            "name": name,
            "description": description,
            "private": private,
            "auto_init": true,
        });
        self.send_json(self.request(Method::POST, "/user/repos").json(&payload))
            .await
    }

    async fn list_workflows(&self, repo: &RepoRef) -> GitHubResult<Vec<Workflow>> {
        let url = Self::repo_url(repo, "/actions/workflows");
        let response: WorkflowsResponse = self.send_json(self.request(Method::GET, &url)).await?;
        Ok(response.workflows)
    }

    async fn trigger_workflow(
        &self,
        repo: &RepoRef,
        workflow_id: &str,
        branch: &str,
    ) -> GitHubResult<()> {
        let url = Self::repo_url(
            repo,
            &format!(
                "/actions/workflows/{}/dispatches",
                urlencoding::encode(workflow_id)
            ),
        );
        let body = serde_json::json!({ "ref": branch });
        self.send_empty(self.request(Method::POST, &url).json(&body))
            .await
    }

    async fn list_workflow_runs(
        &self,
        repo: &RepoRef,
        workflow_id: &str,
        branch: &str,
    ) -> GitHubResult<Vec<WorkflowRun>> {
        let url = Self::repo_url(
            repo,
            &format!(
                "/actions/workflows/{}/runs?branch={}",
                urlencoding::encode(workflow_id),
                urlencoding::encode(branch)
            ),
        );
        let response: WorkflowRunsResponse =
            self.send_json(self.request(Method::GET, &url)).await?;
        Ok(response.workflow_runs)
    }

    async fn get_workflow_run(&self, repo: &RepoRef, run_id: u64) -> GitHubResult<WorkflowRun> {
        let url = Self::repo_url(repo, &format!("/actions/runs/{}", run_id));
        self.send_json(self.request(Method::GET, &url)).await
    }

    async fn list_run_jobs(&self, repo: &RepoRef, run_id: u64) -> GitHubResult<Vec<RunJob>> {
        let url = Self::repo_url(repo, &format!("/actions/runs/{}/jobs", run_id));
        let response: RunJobsResponse = self.send_json(self.request(Method::GET, &url)).await?;
        Ok(response.jobs)
    }

    async fn get_job_logs(&self, repo: &RepoRef, job_id: u64) -> GitHubResult<String> {
        let url = Self::repo_url(repo, &format!("/actions/jobs/{}/logs", job_id));
        let response = self
            .request_accepting(Method::GET, &url, ACCEPT_RAW)
            .send()
            .await?;
        let response = Self::check(response).await?;
        Ok(response.text().await?)
    }
}
