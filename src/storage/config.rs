//! JSON Configuration Management
//!
//! Handles reading and writing the application configuration file.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::models::settings::{AppConfig, SettingsUpdate};
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::{config_path, ensure_dir, ensure_repo_weaver_dir};

/// Configuration service for managing app settings
#[derive(Debug)]
pub struct ConfigService {
    config_path: PathBuf,
    config: AppConfig,
}

impl ConfigService {
    /// Create a new config service at the default location, loading existing
    /// config or creating defaults
    pub fn new() -> AppResult<Self> {
        ensure_repo_weaver_dir()?;
        Self::open(config_path()?)
    }

    /// Load or create the config file at `path`
    pub fn open(path: impl Into<PathBuf>) -> AppResult<Self> {
        let config_path = path.into();
        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                ensure_dir(parent)?;
            }
        }

        let config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            let default_config = AppConfig::default();
            Self::save_to_file(&config_path, &default_config)?;
            info!(path = %config_path.display(), "Created default configuration");
            default_config
        };

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a file
    fn load_from_file(path: &Path) -> AppResult<AppConfig> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        config.validate().map_err(AppError::validation)?;
        Ok(config)
    }

    /// Save configuration to a file with pretty formatting
    fn save_to_file(path: &Path, config: &AppConfig) -> AppResult<()> {
        config.validate().map_err(AppError::validation)?;
        let content = serde_json::to_string_pretty(config)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the current configuration
    pub fn get_config(&self) -> &AppConfig {
        &self.config
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Whether the backing file is still present
    pub fn is_healthy(&self) -> bool {
        self.config_path.exists()
    }

    /// Update the configuration with a partial update
    ///
    /// The update is validated before anything is written; an invalid update
    /// leaves both the in-memory and on-disk config unchanged.
    pub fn update_config(&mut self, update: SettingsUpdate) -> AppResult<AppConfig> {
        let mut next = self.config.clone();
        next.apply_update(update);
        Self::save_to_file(&self.config_path, &next)?;
        self.config = next;
        Ok(self.config.clone())
    }

    /// Save the current configuration to disk
    pub fn save(&self) -> AppResult<()> {
        Self::save_to_file(&self.config_path, &self.config)
    }

    /// Reload configuration from disk
    pub fn reload(&mut self) -> AppResult<()> {
        self.config = Self::load_from_file(&self.config_path)?;
        Ok(())
    }

    /// Reset configuration to defaults
    pub fn reset(&mut self) -> AppResult<()> {
        self.config = AppConfig::default();
        self.save()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_default_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("config.json");

        let service = ConfigService::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(service.get_config(), &AppConfig::default());
    }

    #[test]
    fn test_load_existing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, r#"{"expansion_concurrency": 3}"#).unwrap();

        let service = ConfigService::open(&path).unwrap();
        assert_eq!(service.get_config().expansion_concurrency, 3);
        assert_eq!(service.get_config().bulk_edit_concurrency, 4);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, r#"{"primary_models": [], "fallback_models": []}"#).unwrap();

        let err = ConfigService::open(&path).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_config_update_persists() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.json");
        let mut service = ConfigService::open(&path).unwrap();

        let update = SettingsUpdate {
            max_verification_attempts: Some(5),
            ..Default::default()
        };
        let updated = service.update_config(update).unwrap();
        assert_eq!(updated.max_verification_attempts, 5);

        let reopened = ConfigService::open(&path).unwrap();
        assert_eq!(reopened.get_config().max_verification_attempts, 5);
    }

    #[test]
    fn test_invalid_update_leaves_config_unchanged() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.json");
        let mut service = ConfigService::open(&path).unwrap();

        let update = SettingsUpdate {
            max_context_chars: Some(0),
            ..Default::default()
        };
        assert!(service.update_config(update).is_err());
        assert_eq!(service.get_config().max_context_chars, 1_000_000);
        service.reload().unwrap();
        assert_eq!(service.get_config().max_context_chars, 1_000_000);
    }

    #[test]
    fn test_reset() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.json");
        let mut service = ConfigService::open(&path).unwrap();
        service
            .update_config(SettingsUpdate {
                generation_concurrency: Some(1),
                ..Default::default()
            })
            .unwrap();
        service.reset().unwrap();
        assert_eq!(service.get_config().generation_concurrency, 4);
    }
}
