//! Integration Tests Module
//!
//! End-to-end tests of the command handlers against mocked GitHub and
//! Gemini HTTP endpoints.

// Shared mock servers and fixtures
mod support;

// Settings persistence through AppState
mod settings_test;

// Multi-file bulk edit over HTTP, including model fallback
mod bulk_edit_test;

// Repository creation and file generation
mod project_generation_test;

// Editor flows: AI edit, commit, branch, pull request
mod editor_test;
