//! Mock servers and fixtures shared by the integration tests.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use repo_weaver::storage::ConfigService;
use repo_weaver::{AppState, SettingsUpdate};

pub const PRIMARY_MODEL: &str = "m-primary";
pub const BACKUP_MODEL: &str = "m-backup";

/// App state wired to a mock GitHub and a mock Gemini
pub struct Harness {
    pub state: AppState,
    pub github: MockServer,
    pub gemini: MockServer,
    _dir: TempDir,
}

impl Harness {
    pub async fn start() -> Self {
        let github = MockServer::start().await;
        let gemini = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        let state = AppState::new();
        state
            .initialize_with(ConfigService::open(dir.path().join("config.json")).unwrap())
            .await;
        state
            .update_config(SettingsUpdate {
                github_api_base: Some(github.uri()),
                gemini_base_url: Some(gemini.uri()),
                primary_models: Some(vec![PRIMARY_MODEL.to_string()]),
                fallback_models: Some(vec![BACKUP_MODEL.to_string()]),
                ..Default::default()
            })
            .await
            .unwrap();
        state.set_github_token("t0ken").await.unwrap();
        state.set_gemini_api_key("k3y").await.unwrap();

        Self {
            state,
            github,
            gemini,
            _dir: dir,
        }
    }

    /// Serve `full_name` from the repository listing with `files` on every
    /// branch; `main` is the default and only listed branch.
    pub async fn mount_repository(&self, full_name: &str, files: &[(&str, &str)]) {
        let (owner, name) = full_name.split_once('/').unwrap();
        Mock::given(method("GET"))
            .and(path("/user/repos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": 1,
                "name": name,
                "full_name": full_name,
                "owner": {"login": owner},
                "default_branch": "main",
                "private": false
            }])))
            .mount(&self.github)
            .await;

        let tree: Vec<Value> = files
            .iter()
            .enumerate()
            .map(|(i, (p, _))| json!({"path": p, "type": "blob", "sha": format!("blob{}", i)}))
            .collect();
        Mock::given(method("GET"))
            .and(path_regex(format!(
                r"^/repos/{}/git/trees/[^/]+$",
                regex::escape(full_name)
            )))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "tree": tree })))
            .mount(&self.github)
            .await;

        Mock::given(method("GET"))
            .and(path(format!("/repos/{}/branches", full_name)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "main", "commit": {"sha": "tip-main"}}
            ])))
            .mount(&self.github)
            .await;

        for (i, (file_path, content)) in files.iter().enumerate() {
            Mock::given(method("GET"))
                .and(path(format!("/repos/{}/contents/{}", full_name, file_path)))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "path": file_path,
                    "content": STANDARD.encode(content),
                    "sha": format!("blob{}", i)
                })))
                .mount(&self.github)
                .await;
        }
    }

    /// Accept every content write, answering with `new-sha`.
    pub async fn accept_commits(&self) {
        Mock::given(method("PUT"))
            .and(path_regex(r"^/repos/[^/]+/[^/]+/contents/.+$"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"content": {"sha": "new-sha"}})),
            )
            .mount(&self.github)
            .await;
    }

    /// Stream `chunks` for every streaming call to `model`.
    pub async fn stream_reply(&self, model: &str, chunks: &[&str]) {
        Mock::given(method("POST"))
            .and(path(format!("/models/{}:streamGenerateContent", model)))
            .and(query_param("alt", "sse"))
            .respond_with(sse(chunks))
            .mount(&self.gemini)
            .await;
    }

    /// Fail every call (streaming or not) to `model` with a server error.
    pub async fn model_down(&self, model: &str) {
        Mock::given(method("POST"))
            .and(path_regex(format!(r"^/models/{}:", regex::escape(model))))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(json!({"error": {"code": 500, "message": "overloaded"}})),
            )
            .mount(&self.gemini)
            .await;
    }

    /// Answer structured calls to `model` with `value` as JSON text.
    pub async fn structured_reply(&self, model: &str, value: Value) {
        Mock::given(method("POST"))
            .and(path(format!("/models/{}:generateContent", model)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": value.to_string()}]}}]
            })))
            .mount(&self.gemini)
            .await;
    }

    /// Path and JSON body of every GitHub request with `verb`.
    pub async fn github_requests(&self, verb: &str) -> Vec<(String, Value)> {
        self.github
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.method.as_str() == verb)
            .map(|r| {
                let body = serde_json::from_slice(&r.body).unwrap_or(Value::Null);
                (r.url.path().to_string(), body)
            })
            .collect()
    }

    /// Path and decoded content of every write to the contents API.
    pub async fn committed_files(&self) -> Vec<(String, String)> {
        self.github_requests("PUT")
            .await
            .into_iter()
            .map(|(path, body)| {
                let bytes = STANDARD
                    .decode(body["content"].as_str().unwrap())
                    .unwrap();
                (path, String::from_utf8(bytes).unwrap())
            })
            .collect()
    }

    /// Number of requests the mock Gemini saw for `model`.
    pub async fn model_calls(&self, model: &str) -> usize {
        let prefix = format!("/models/{}:", model);
        self.gemini
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path().starts_with(&prefix))
            .count()
    }
}

/// An SSE body carrying one Gemini chunk per entry.
pub fn sse(chunks: &[&str]) -> ResponseTemplate {
    let mut body = String::new();
    for chunk in chunks {
        let event = json!({"candidates": [{"content": {"parts": [{"text": chunk}], "role": "model"}}]});
        body.push_str(&format!("data: {}\n\n", event));
    }
    ResponseTemplate::new(200).set_body_raw(body, "text/event-stream")
}
