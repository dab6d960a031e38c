//! Model Roster
//!
//! The ordered list of models every workflow walks through when a call
//! fails: the primary tier first, then the fallback tier.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::settings::AppConfig;
use crate::utils::error::{AppError, AppResult};

const PRIMARY_MODELS: &[&str] = &[
    "gemini-3-pro-preview",
    "gemini-2.5-pro",
    "gemini-2.5-flash",
    "gemini-pro-latest",
    "gemini-2.5-flash-lite",
    "gemini-2.5-flash-preview-09-2025",
    "gemini-2.5-flash-lite-preview-09-2025",
    "gemini-2.0-flash-exp",
    "gemini-2.0-flash",
    "gemini-2.0-flash-001",
];

const FALLBACK_MODELS: &[&str] = &[
    "gemini-2.0-flash-lite-001",
    "gemini-2.0-flash-lite",
    "gemini-2.0-flash-lite-preview-02-05",
    "gemini-2.0-flash-lite-preview",
    "gemini-exp-1206",
    "gemma-3-1b-it",
    "gemma-3-4b-it",
    "gemma-3-12b-it",
    "gemma-3-27b-it",
    "gemma-3n-e4b-it",
    "gemma-3n-e2b-it",
];

pub fn default_primary_models() -> Vec<String> {
    PRIMARY_MODELS.iter().map(|m| m.to_string()).collect()
}

pub fn default_fallback_models() -> Vec<String> {
    FALLBACK_MODELS.iter().map(|m| m.to_string()).collect()
}

/// Immutable, non-empty model sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRoster {
    primary: Vec<String>,
    fallback: Vec<String>,
}

impl ModelRoster {
    /// Build a roster in trial order. A model listed more than once keeps
    /// only its first position, so no model is tried twice in one call.
    pub fn new(mut primary: Vec<String>, mut fallback: Vec<String>) -> AppResult<Self> {
        let mut seen = HashSet::new();
        primary.retain(|m| seen.insert(m.clone()));
        fallback.retain(|m| seen.insert(m.clone()));
        if primary.is_empty() && fallback.is_empty() {
            return Err(AppError::config("Model roster is empty"));
        }
        Ok(Self { primary, fallback })
    }

    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        Self::new(config.primary_models.clone(), config.fallback_models.clone())
    }

    /// Every model in trial order.
    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.primary
            .iter()
            .chain(self.fallback.iter())
            .map(String::as_str)
    }

    /// The first model, used by single-shot calls that do not fall back.
    pub fn primary_model(&self) -> &str {
        self.primary
            .first()
            .or_else(|| self.fallback.first())
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.primary.len() + self.fallback.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ModelRoster {
    fn default() -> Self {
        Self {
            primary: default_primary_models(),
            fallback: default_fallback_models(),
        }
    }
}
