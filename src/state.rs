//! Application State
//!
//! Holds the configuration service and the two backends every command needs.
//! Credentials are never persisted: the model backend is rebuilt whenever
//! the key changes and the VCS backend whenever the token changes.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use repo_weaver_github::{GitHubClient, VcsBackend};
use repo_weaver_llm::{GeminiProvider, ModelBackend, ProviderConfig};

use crate::models::settings::{AppConfig, SettingsUpdate};
use crate::services::roster::ModelRoster;
use crate::services::session::EditorSession;
use crate::services::workflows::{EventSink, WorkflowContext};
use crate::storage::ConfigService;
use crate::utils::error::{AppError, AppResult};

/// Application state shared by the command handlers
#[derive(Clone, Default)]
pub struct AppState {
    /// Configuration service for app settings
    config: Arc<RwLock<Option<ConfigService>>>,
    /// AI backend, present once an API key is set
    backend: Arc<RwLock<Option<Arc<dyn ModelBackend>>>>,
    /// Version-control backend, present once a token is set
    vcs: Arc<RwLock<Option<Arc<dyn VcsBackend>>>>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    /// Create a new uninitialized app state
    pub fn new() -> Self {
        Self::default()
    }

    /// Load (or create) the configuration at the default location
    pub async fn initialize(&self) -> AppResult<()> {
        if self.config.read().await.is_some() {
            return Ok(());
        }
        let service = ConfigService::new()?;
        self.initialize_with(service).await;
        Ok(())
    }

    /// Use an already opened configuration service
    pub async fn initialize_with(&self, service: ConfigService) {
        info!(path = %service.path().display(), "Configuration loaded");
        *self.config.write().await = Some(service);
    }

    /// Check if config is healthy
    pub fn is_config_healthy(&self) -> bool {
        if let Ok(guard) = self.config.try_read() {
            if let Some(ref config) = *guard {
                return config.is_healthy();
            }
        }
        false
    }

    /// Get the current configuration
    pub async fn get_config(&self) -> AppResult<AppConfig> {
        let guard = self.config.read().await;
        match &*guard {
            Some(config) => Ok(config.get_config().clone()),
            None => Err(AppError::config("Config service not initialized")),
        }
    }

    /// Update the configuration
    pub async fn update_config(&self, update: SettingsUpdate) -> AppResult<AppConfig> {
        let mut guard = self.config.write().await;
        match &mut *guard {
            Some(config) => config.update_config(update),
            None => Err(AppError::config("Config service not initialized")),
        }
    }

    /// Reset the configuration to defaults
    pub async fn reset_config(&self) -> AppResult<AppConfig> {
        let mut guard = self.config.write().await;
        match &mut *guard {
            Some(config) => {
                config.reset()?;
                Ok(config.get_config().clone())
            }
            None => Err(AppError::config("Config service not initialized")),
        }
    }

    /// Build the GitHub client for `token` against the configured API base.
    pub async fn set_github_token(&self, token: &str) -> AppResult<()> {
        if token.trim().is_empty() {
            return Err(AppError::validation("GitHub token must not be empty"));
        }
        let config = self.get_config().await?;
        let client = GitHubClient::with_base_url(token.trim(), &config.github_api_base)?;
        *self.vcs.write().await = Some(Arc::new(client));
        info!(base = %config.github_api_base, "GitHub client configured");
        Ok(())
    }

    /// Rebuild the Gemini provider with a new API key.
    pub async fn set_gemini_api_key(&self, api_key: &str) -> AppResult<()> {
        if api_key.trim().is_empty() {
            return Err(AppError::validation("Gemini API key must not be empty"));
        }
        let config = self.get_config().await?;
        let provider = GeminiProvider::new(ProviderConfig {
            api_key: Some(api_key.trim().to_string()),
            base_url: Some(config.gemini_base_url.clone()),
            request_timeout_secs: config.request_timeout_secs,
            ..Default::default()
        })?;
        *self.backend.write().await = Some(Arc::new(provider));
        info!("Gemini provider configured");
        Ok(())
    }

    /// Install backends directly, bypassing credential handling
    pub async fn with_backends(
        self,
        backend: Arc<dyn ModelBackend>,
        vcs: Arc<dyn VcsBackend>,
    ) -> Self {
        *self.backend.write().await = Some(backend);
        *self.vcs.write().await = Some(vcs);
        self
    }

    pub async fn has_model_backend(&self) -> bool {
        self.backend.read().await.is_some()
    }

    pub async fn has_vcs(&self) -> bool {
        self.vcs.read().await.is_some()
    }

    async fn model_backend(&self) -> AppResult<Arc<dyn ModelBackend>> {
        self.backend
            .read()
            .await
            .clone()
            .ok_or_else(|| AppError::config("Gemini API key not set"))
    }

    /// The VCS backend; fails until a token has been set
    pub async fn vcs(&self) -> AppResult<Arc<dyn VcsBackend>> {
        self.vcs
            .read()
            .await
            .clone()
            .ok_or_else(|| AppError::config("GitHub token not set"))
    }

    /// Model roster from the current configuration
    pub async fn roster(&self) -> AppResult<ModelRoster> {
        ModelRoster::from_config(&self.get_config().await?)
    }

    /// Everything a workflow needs, snapshotted for one run
    pub async fn workflow_context(&self, events: EventSink) -> AppResult<WorkflowContext> {
        let config = self.get_config().await?;
        let roster = ModelRoster::from_config(&config)?;
        Ok(WorkflowContext::new(self.model_backend().await?, self.vcs().await?, roster, config)
            .with_events(events))
    }

    /// A fresh editor session over the configured backends
    pub async fn editor_session(&self, events: EventSink) -> AppResult<EditorSession> {
        Ok(
            EditorSession::new(self.vcs().await?, self.model_backend().await?, self.roster().await?)
                .with_events(events),
        )
    }
}
