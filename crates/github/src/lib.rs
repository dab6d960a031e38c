//! Repo Weaver GitHub
//!
//! The version-control backend consumed by the orchestration layer:
//! - `VcsBackend` trait covering repositories, trees, file contents, commits,
//!   branches, pull requests and Actions workflows
//! - `GitHubClient`, the REST implementation
//! - Helpers built on the trait (paginated repository listing, run log
//!   collection) and the file tree builder

pub mod backend;
pub mod client;
pub mod error;
pub mod logs;
pub mod tree;
pub mod types;

pub use backend::{fetch_all_repositories, VcsBackend};
pub use client::{GitHubClient, GITHUB_API_BASE};
pub use error::{GitHubError, GitHubResult};
pub use logs::collect_run_logs;
pub use tree::{build_tree, TreeNode};
pub use types::*;
