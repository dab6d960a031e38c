//! Cross-Platform Path Utilities
//!
//! Functions for resolving application directories across platforms.

use std::path::{Path, PathBuf};

use crate::utils::error::{AppError, AppResult};

/// Get the user's home directory
pub fn home_dir() -> AppResult<PathBuf> {
    dirs::home_dir().ok_or_else(|| AppError::config("Could not determine home directory"))
}

/// Get the Repo Weaver directory (~/.repo-weaver/)
pub fn repo_weaver_dir() -> AppResult<PathBuf> {
    Ok(home_dir()?.join(".repo-weaver"))
}

/// Get the config file path (~/.repo-weaver/config.json)
pub fn config_path() -> AppResult<PathBuf> {
    Ok(repo_weaver_dir()?.join("config.json"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Get the Repo Weaver directory, creating it if it doesn't exist
pub fn ensure_repo_weaver_dir() -> AppResult<PathBuf> {
    let path = repo_weaver_dir()?;
    ensure_dir(&path)?;
    Ok(path)
}
