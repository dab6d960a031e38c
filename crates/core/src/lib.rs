//! Repo Weaver Core
//!
//! Foundational error types, shared identifiers and stream event types for the
//! Repo Weaver workspace. This crate has no dependencies on the HTTP clients or
//! the orchestration layer.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `ids` - Repository and file identifiers (`RepoRef`, `FileKey`)
//! - `streaming` - Unified stream event types and adapter trait
//!
//! ## Design Principles
//!
//! 1. **Zero external dependencies beyond serde/thiserror** - keeps build times minimal
//! 2. **Unidirectional dependency** - this crate depends on nothing else in the workspace

pub mod error;
pub mod ids;
pub mod streaming;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Identifiers ────────────────────────────────────────────────────────
pub use ids::{FileKey, RepoRef};

// ── Streaming Types ────────────────────────────────────────────────────
pub use streaming::{AdapterError, StreamAdapter, UnifiedStreamEvent};
