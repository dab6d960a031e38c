//! Settings Models
//!
//! Application configuration and settings data structures. Credentials never
//! appear here; they come from the command line or environment.

use serde::{Deserialize, Deserializer, Serialize};

use crate::services::roster::{default_fallback_models, default_primary_models};
use crate::services::workflows::MAX_VERIFICATION_ATTEMPTS;

/// Default deployment URL guess after a green build
pub const DEFAULT_DEPLOYMENT_URL_TEMPLATE: &str = "https://{owner}.github.io/{repo}/";

/// Application configuration stored in config.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// GitHub REST API base URL
    pub github_api_base: String,
    /// Gemini REST API base URL
    pub gemini_base_url: String,
    /// Primary model tier, tried first
    pub primary_models: Vec<String>,
    /// Fallback model tier
    pub fallback_models: Vec<String>,
    /// Concurrent jobs for bulk edits
    pub bulk_edit_concurrency: usize,
    /// Concurrent jobs for new project generation
    pub generation_concurrency: usize,
    /// Concurrent jobs for project expansion
    pub expansion_concurrency: usize,
    /// Character budget for file context in planning prompts
    pub max_context_chars: usize,
    /// Build verification rounds before the advanced edit gives up
    pub max_verification_attempts: u32,
    /// Wait after triggering a workflow before the first poll
    pub workflow_settle_delay_secs: u64,
    /// Interval between workflow run polls
    pub workflow_poll_interval_secs: u64,
    /// Give up waiting on a run after this long (null = wait forever)
    pub workflow_poll_timeout_secs: Option<u64>,
    /// `{owner}`/`{repo}` template for the deployment URL (null = none)
    pub deployment_url_template: Option<String>,
    /// Client-side HTTP timeout for model requests
    pub request_timeout_secs: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            github_api_base: repo_weaver_github::GITHUB_API_BASE.to_string(),
            gemini_base_url: repo_weaver_llm::gemini::GEMINI_API_URL.to_string(),
            primary_models: default_primary_models(),
            fallback_models: default_fallback_models(),
            bulk_edit_concurrency: 4,
            generation_concurrency: 4,
            expansion_concurrency: 8,
            max_context_chars: 1_000_000,
            max_verification_attempts: MAX_VERIFICATION_ATTEMPTS,
            workflow_settle_delay_secs: 5,
            workflow_poll_interval_secs: 5,
            workflow_poll_timeout_secs: Some(1800),
            deployment_url_template: Some(DEFAULT_DEPLOYMENT_URL_TEMPLATE.to_string()),
            request_timeout_secs: None,
        }
    }
}

/// Settings update request (partial update)
///
/// Nullable settings use a nested `Option`: `Some(None)` clears the value.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SettingsUpdate {
    pub github_api_base: Option<String>,
    pub gemini_base_url: Option<String>,
    pub primary_models: Option<Vec<String>>,
    pub fallback_models: Option<Vec<String>>,
    pub bulk_edit_concurrency: Option<usize>,
    pub generation_concurrency: Option<usize>,
    pub expansion_concurrency: Option<usize>,
    pub max_context_chars: Option<usize>,
    pub max_verification_attempts: Option<u32>,
    pub workflow_settle_delay_secs: Option<u64>,
    pub workflow_poll_interval_secs: Option<u64>,
    #[serde(default, deserialize_with = "double_option")]
    pub workflow_poll_timeout_secs: Option<Option<u64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub deployment_url_template: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub request_timeout_secs: Option<Option<u64>>,
}

/// Present-but-null becomes `Some(None)` instead of collapsing to `None`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl AppConfig {
    /// Apply a partial update to the configuration
    pub fn apply_update(&mut self, update: SettingsUpdate) {
        if let Some(base) = update.github_api_base {
            self.github_api_base = base;
        }
        if let Some(base) = update.gemini_base_url {
            self.gemini_base_url = base;
        }
        if let Some(models) = update.primary_models {
            self.primary_models = models;
        }
        if let Some(models) = update.fallback_models {
            self.fallback_models = models;
        }
        if let Some(n) = update.bulk_edit_concurrency {
            self.bulk_edit_concurrency = n;
        }
        if let Some(n) = update.generation_concurrency {
            self.generation_concurrency = n;
        }
        if let Some(n) = update.expansion_concurrency {
            self.expansion_concurrency = n;
        }
        if let Some(chars) = update.max_context_chars {
            self.max_context_chars = chars;
        }
        if let Some(attempts) = update.max_verification_attempts {
            self.max_verification_attempts = attempts;
        }
        if let Some(secs) = update.workflow_settle_delay_secs {
            self.workflow_settle_delay_secs = secs;
        }
        if let Some(secs) = update.workflow_poll_interval_secs {
            self.workflow_poll_interval_secs = secs;
        }
        if let Some(timeout) = update.workflow_poll_timeout_secs {
            self.workflow_poll_timeout_secs = timeout;
        }
        if let Some(template) = update.deployment_url_template {
            self.deployment_url_template = template;
        }
        if let Some(timeout) = update.request_timeout_secs {
            self.request_timeout_secs = timeout;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.primary_models.is_empty() && self.fallback_models.is_empty() {
            return Err("At least one model must be configured".to_string());
        }

        if self
            .primary_models
            .iter()
            .chain(self.fallback_models.iter())
            .any(|m| m.trim().is_empty())
        {
            return Err("Model identifiers cannot be empty".to_string());
        }

        for (name, url) in [
            ("github_api_base", &self.github_api_base),
            ("gemini_base_url", &self.gemini_base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(format!("{} must be an http(s) URL: {}", name, url));
            }
        }

        if self.max_context_chars == 0 {
            return Err("max_context_chars must be greater than 0".to_string());
        }

        if self.max_verification_attempts == 0 {
            return Err("max_verification_attempts must be at least 1".to_string());
        }

        if self.workflow_poll_interval_secs == 0 {
            return Err("workflow_poll_interval_secs must be at least 1 second".to_string());
        }

        Ok(())
    }
}
