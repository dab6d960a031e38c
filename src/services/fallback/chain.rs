//! Model Fallback Chain
//!
//! Runs an operation against each model of the roster in turn until one
//! succeeds. Every failure is logged and recorded; there is no delay between
//! attempts and no failure stops the walk early.

use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::services::roster::ModelRoster;

/// Rough classification of a failed attempt, for the execution log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Model is unknown or not served
    Unavailable,
    /// Quota or rate limit
    RateLimited,
    /// Network/connection error
    NetworkError,
    /// Output could not be used
    InvalidResponse,
    /// Anything else
    Error,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::Unavailable => write!(f, "unavailable"),
            FailureReason::RateLimited => write!(f, "rate_limited"),
            FailureReason::NetworkError => write!(f, "network_error"),
            FailureReason::InvalidResponse => write!(f, "invalid_response"),
            FailureReason::Error => write!(f, "error"),
        }
    }
}

impl FailureReason {
    /// Classify an error message into a failure reason
    pub fn from_error_message(msg: &str) -> Self {
        let msg_lower = msg.to_lowercase();

        if msg_lower.contains("rate limit")
            || msg_lower.contains("too many requests")
            || msg_lower.contains("429")
        {
            FailureReason::RateLimited
        } else if msg_lower.contains("not found") || msg_lower.contains("unavailable") {
            FailureReason::Unavailable
        } else if msg_lower.contains("network")
            || msg_lower.contains("connection")
            || msg_lower.contains("timed out")
        {
            FailureReason::NetworkError
        } else if msg_lower.contains("parse")
            || msg_lower.contains("empty response")
            || msg_lower.contains("invalid")
            || msg_lower.contains("more than once")
        {
            FailureReason::InvalidResponse
        } else {
            FailureReason::Error
        }
    }
}

/// Errors from fallback execution
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FallbackError {
    #[error("All AI models failed.")]
    AllModelsFailed { attempts: usize, last_error: String },

    #[error("No AI models configured")]
    EmptyRoster,
}

/// Result type for fallback operations
pub type FallbackResult<T> = Result<T, FallbackError>;

/// The model handed to one attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelAttempt {
    /// Zero-based position in the roster
    pub index: usize,
    pub model: String,
}

impl ModelAttempt {
    /// Whether an earlier model already failed
    pub fn is_retry(&self) -> bool {
        self.index > 0
    }
}

/// Record of a single attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackAttempt {
    pub model: String,
    pub success: bool,
    pub failure_reason: Option<FailureReason>,
    pub error_message: Option<String>,
    pub duration_ms: u64,
    /// RFC 3339 start time
    pub started_at: String,
}

impl FallbackAttempt {
    pub fn success(model: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            model: model.into(),
            success: true,
            failure_reason: None,
            error_message: None,
            duration_ms,
            started_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn failure(
        model: impl Into<String>,
        reason: FailureReason,
        error: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            model: model.into(),
            success: false,
            failure_reason: Some(reason),
            error_message: Some(error.into()),
            duration_ms,
            started_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Log of all attempts made by one execution
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FallbackExecutionLog {
    pub attempts: Vec<FallbackAttempt>,
    pub total_duration_ms: u64,
    pub successful_model: Option<String>,
    pub overall_success: bool,
}

impl FallbackExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_attempt(&mut self, attempt: FallbackAttempt) {
        self.total_duration_ms += attempt.duration_ms;
        if attempt.success {
            self.successful_model = Some(attempt.model.clone());
            self.overall_success = true;
        }
        self.attempts.push(attempt);
    }
}

/// Sequential trial over a [`ModelRoster`]
#[derive(Debug, Clone)]
pub struct ModelFallback {
    roster: ModelRoster,
}

impl ModelFallback {
    pub fn new(roster: ModelRoster) -> Self {
        Self { roster }
    }

    pub fn roster(&self) -> &ModelRoster {
        &self.roster
    }

    /// Execute with fallback support
    ///
    /// Calls `executor` with each model in roster order and returns the first
    /// success. Anything the executor accumulates must be local to the
    /// attempt's future so a failed attempt leaves nothing behind.
    pub async fn execute<F, Fut, T, E>(
        &self,
        mut executor: F,
    ) -> FallbackResult<(T, FallbackExecutionLog)>
    where
        F: FnMut(ModelAttempt) -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        if self.roster.is_empty() {
            return Err(FallbackError::EmptyRoster);
        }

        let mut log = FallbackExecutionLog::new();
        let mut last_error = String::new();

        for (index, model) in self.roster.models().enumerate() {
            let attempt_start = Instant::now();
            let attempt = ModelAttempt {
                index,
                model: model.to_string(),
            };

            match executor(attempt).await {
                Ok(result) => {
                    let duration_ms = attempt_start.elapsed().as_millis() as u64;
                    if index > 0 {
                        info!("Model {} succeeded after {} failures", model, index);
                    }
                    log.add_attempt(FallbackAttempt::success(model, duration_ms));
                    return Ok((result, log));
                }
                Err(e) => {
                    let duration_ms = attempt_start.elapsed().as_millis() as u64;
                    let error_msg = e.to_string();
                    let reason = FailureReason::from_error_message(&error_msg);

                    warn!("Model {} failed: {} (reason: {})", model, error_msg, reason);

                    log.add_attempt(FallbackAttempt::failure(
                        model,
                        reason,
                        &error_msg,
                        duration_ms,
                    ));
                    last_error = error_msg;
                }
            }
        }

        error!("All {} models failed; last error: {}", log.attempts.len(), last_error);
        Err(FallbackError::AllModelsFailed {
            attempts: log.attempts.len(),
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn roster(models: &[&str]) -> ModelRoster {
        ModelRoster::new(models.iter().map(|m| m.to_string()).collect(), vec![]).unwrap()
    }

    #[test]
    fn test_failure_reason_from_error() {
        assert_eq!(
            FailureReason::from_error_message("Rate limited by gemini: quota"),
            FailureReason::RateLimited
        );
        assert_eq!(
            FailureReason::from_error_message("Model not found: gemini-x"),
            FailureReason::Unavailable
        );
        assert_eq!(
            FailureReason::from_error_message("AI returned an empty response."),
            FailureReason::InvalidResponse
        );
        assert_eq!(
            FailureReason::from_error_message("something odd"),
            FailureReason::Error
        );
    }

    #[test]
    fn test_execution_log() {
        let mut log = FallbackExecutionLog::new();
        log.add_attempt(FallbackAttempt::failure("m1", FailureReason::Error, "boom", 100));
        log.add_attempt(FallbackAttempt::success("m2", 200));

        assert!(!log.attempts[0].success);
        assert_eq!(log.successful_model, Some("m2".to_string()));
        assert!(log.overall_success);
        assert_eq!(log.total_duration_ms, 300);
    }

    #[tokio::test]
    async fn test_first_model_succeeds() {
        let chain = ModelFallback::new(roster(&["m1", "m2"]));
        let (output, log) = chain
            .execute(|attempt| async move { Ok::<_, String>(attempt.model) })
            .await
            .unwrap();
        assert_eq!(output, "m1");
        assert_eq!(log.attempts.len(), 1);
    }

    #[tokio::test]
    async fn test_stops_at_first_success() {
        let chain = ModelFallback::new(roster(&["m1", "m2", "m3", "m4"]));
        let calls = AtomicUsize::new(0);
        let (output, log) = chain
            .execute(|attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt.index < 2 {
                        Err(format!("{} down", attempt.model))
                    } else {
                        Ok(attempt.model)
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(output, "m3");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let failed: Vec<_> = log
            .attempts
            .iter()
            .filter(|a| !a.success)
            .map(|a| a.model.as_str())
            .collect();
        assert_eq!(failed, vec!["m1", "m2"]);
    }

    #[tokio::test]
    async fn test_exhaustion_tries_every_model_in_order() {
        let chain = ModelFallback::new(roster(&["m1", "m2", "m3"]));
        let mut seen = Vec::new();
        let result: FallbackResult<(String, _)> = chain
            .execute(|attempt| {
                seen.push(attempt.model.clone());
                async move { Err::<String, _>(format!("{} failed", attempt.model)) }
            })
            .await;

        assert_eq!(seen, vec!["m1", "m2", "m3"]);
        let err = result.unwrap_err();
        assert_eq!(
            err,
            FallbackError::AllModelsFailed {
                attempts: 3,
                last_error: "m3 failed".to_string()
            }
        );
        assert_eq!(err.to_string(), "All AI models failed.");
    }

    #[tokio::test]
    async fn test_fallback_tier_follows_primary() {
        let roster = ModelRoster::new(vec!["p1".to_string()], vec!["f1".to_string()]).unwrap();
        let chain = ModelFallback::new(roster);
        let (output, _) = chain
            .execute(|attempt| async move {
                if attempt.is_retry() {
                    Ok(attempt.model)
                } else {
                    Err("primary down")
                }
            })
            .await
            .unwrap();
        assert_eq!(output, "f1");
    }
}
