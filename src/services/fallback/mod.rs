//! Model Fallback Service
//!
//! Retries an AI call across the model roster.

mod chain;

pub use chain::{
    FailureReason, FallbackAttempt, FallbackError, FallbackExecutionLog, FallbackResult,
    ModelAttempt, ModelFallback,
};
