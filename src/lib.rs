//! Repo Weaver - Rust Backend Library
//!
//! Repository editor backend with multi-file AI job orchestration.
//! It includes:
//! - Command handlers and the command line front end
//! - Business logic services (roster, planning, job board, workflows, editor session)
//! - Storage layer (JSON config)
//! - Data models and utilities

pub mod cli;
pub mod commands;
pub mod models;
pub mod services;
pub mod state;
pub mod storage;
pub mod utils;

pub use cli::{run_main, Cli};
pub use models::response::*;
pub use models::settings::{AppConfig, SettingsUpdate};
pub use state::AppState;
pub use utils::error::{AppError, AppResult};
