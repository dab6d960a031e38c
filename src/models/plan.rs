//! Plan Models
//!
//! Typed plans returned by the planning calls, plus the file context the
//! prompts are built from. Field names follow the JSON the model is asked
//! to produce (`filesToEdit`, `agentIndex`, ...).

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};

use crate::utils::error::{AppError, AppResult};

/// Number of parallel agents an expansion plan may spread files across.
pub const EXPANSION_AGENTS: u8 = 8;

/// A file to create in a new project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedFile {
    pub path: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPlan {
    pub files: Vec<PlannedFile>,
}

/// Change instructions for one existing file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEdit {
    pub path: String,
    pub changes: String,
}

/// A file to create during an expansion, owned by one agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedCreation {
    pub path: String,
    pub description: String,
    #[serde(deserialize_with = "deserialize_agent_index")]
    pub agent_index: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpansionPlan {
    /// Must stay empty: the seed file is never edited.
    #[serde(default)]
    pub files_to_edit: Vec<FileEdit>,
    #[serde(default)]
    pub files_to_create: Vec<PlannedCreation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryEditPlan {
    pub reasoning: String,
    pub files_to_edit: Vec<FileEdit>,
}

/// A file made available to a planning or editing prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextFile {
    pub path: String,
    pub content: String,
    /// Remote version token, absent for files not yet on the remote
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

impl ContextFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            sha: None,
        }
    }

    pub fn with_sha(mut self, sha: impl Into<String>) -> Self {
        self.sha = Some(sha.into());
        self
    }
}

/// Content committed by an earlier verification attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviousEdit {
    pub path: String,
    pub content: String,
}

/// Models emit `agentIndex` as a JSON number, sometimes fractional or out of
/// range; round and clamp it into `0..EXPANSION_AGENTS`.
fn deserialize_agent_index<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    let index = if raw.is_finite() { raw.round() } else { 0.0 };
    Ok(index.clamp(0.0, f64::from(EXPANSION_AGENTS - 1)) as u8)
}

fn ensure_unique_paths<'a>(paths: impl IntoIterator<Item = &'a str>) -> AppResult<()> {
    let mut seen = HashSet::new();
    for path in paths {
        if path.trim().is_empty() {
            return Err(AppError::validation("Plan contains an empty file path"));
        }
        if !seen.insert(path) {
            return Err(AppError::validation(format!(
                "Plan lists {} more than once",
                path
            )));
        }
    }
    Ok(())
}

impl ProjectPlan {
    pub fn validate(&self) -> AppResult<()> {
        ensure_unique_paths(self.files.iter().map(|f| f.path.as_str()))
    }
}

impl ExpansionPlan {
    pub fn validate(&self) -> AppResult<()> {
        ensure_unique_paths(self.files_to_create.iter().map(|f| f.path.as_str()))
    }
}

impl RepositoryEditPlan {
    pub fn validate(&self) -> AppResult<()> {
        ensure_unique_paths(self.files_to_edit.iter().map(|f| f.path.as_str()))
    }
}
