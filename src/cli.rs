//! Command Line Front End
//!
//! Parses arguments, installs logging, wires credentials into the
//! [`AppState`] and dispatches to the command handlers. Workflow progress is
//! printed to stderr while a command runs; the result goes to stdout.

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

use repo_weaver_core::{FileKey, RepoRef};

use crate::commands;
use crate::models::response::CommandResponse;
use crate::models::settings::SettingsUpdate;
use crate::services::workflows::{
    AlertKind, EventSink, ProjectGenerationRequest, WorkflowEvent,
};
use crate::state::AppState;
use crate::storage::ConfigService;

/// Legacy name for the Gemini key, read when `GEMINI_API_KEY` is unset.
const LEGACY_API_KEY_ENV: &str = "API_KEY";

/// Browse and edit GitHub repositories with Gemini-driven multi-file jobs.
#[derive(Parser, Debug)]
#[command(name = "repo-weaver", version)]
pub struct Cli {
    /// GitHub personal access token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, global = true)]
    pub github_token: Option<String>,

    /// Gemini API key (falls back to `API_KEY`)
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, global = true)]
    pub gemini_api_key: Option<String>,

    /// Use this config file instead of ~/.repo-weaver/config.json
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Print the full JSON response envelope and JSON progress events
    #[arg(long, default_value_t = false, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Report which backends are configured
    Health,

    /// Show, update or reset settings
    Settings {
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },

    /// List repositories with their branches
    Repos,

    /// Print the file tree of a repository
    Tree {
        /// owner/name
        repo: RepoRef,
        #[arg(long)]
        branch: Option<String>,
    },

    /// List the Actions workflows of a repository
    Workflows {
        /// owner/name
        repo: RepoRef,
    },

    /// Rewrite one file with the primary model
    Edit {
        /// owner/name::path
        file: FileKey,
        instruction: String,
        #[arg(long)]
        branch: Option<String>,
        /// Commit the result with this message
        #[arg(long, value_name = "MESSAGE")]
        commit: Option<String>,
    },

    /// Commit new content for one file
    Commit {
        /// owner/name::path
        file: FileKey,
        /// File holding the new content; `-` reads stdin
        #[arg(long, value_name = "PATH")]
        content: PathBuf,
        #[arg(long, short = 'm')]
        message: String,
        #[arg(long)]
        branch: Option<String>,
    },

    /// Create a branch and switch to it
    Branch {
        /// owner/name
        repo: RepoRef,
        name: String,
        /// Branch to start from; the default branch when omitted
        #[arg(long)]
        from: Option<String>,
    },

    /// Open a pull request into the default branch
    Pr {
        /// owner/name
        repo: RepoRef,
        /// Head branch
        #[arg(long)]
        branch: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        body: String,
    },

    /// Apply one instruction to many files
    BulkEdit {
        instruction: String,
        /// owner/name::path, repeatable
        #[arg(long = "file", required = true)]
        files: Vec<FileKey>,
        #[arg(long)]
        branch: Option<String>,
    },

    /// Create a repository and generate its files
    NewProject {
        name: String,
        prompt: String,
        #[arg(long, default_value_t = false)]
        private: bool,
    },

    /// Grow a codebase around a seed file
    Expand {
        prompt: String,
        /// owner/name::path of the seed file
        #[arg(long = "seed")]
        seeds: Vec<FileKey>,
        #[arg(long)]
        branch: Option<String>,
    },

    /// Edit, then verify with an Actions workflow until the build passes
    AdvancedEdit {
        /// owner/name
        repo: RepoRef,
        instruction: String,
        /// Workflow id or file name used for verification
        #[arg(long)]
        workflow: String,
        /// File the change centres on
        #[arg(long)]
        active: String,
        /// Extra files given to the planner, repeatable
        #[arg(long = "context")]
        context: Vec<String>,
        #[arg(long)]
        branch: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum SettingsAction {
    /// Print the current settings
    Show,
    /// Apply a partial update given as JSON, e.g. '{"bulk_edit_concurrency": 2}'
    Update { patch: String },
    /// Restore defaults
    Reset,
}

/// Install the stderr subscriber; `RUST_LOG` overrides `default_level`.
pub fn init_tracing(default_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(default_level))
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

/// Run one command. Returns whether it succeeded.
pub async fn run_main(cli: Cli) -> anyhow::Result<bool> {
    init_tracing("info");

    let state = AppState::new();
    match &cli.config {
        Some(path) => state.initialize_with(ConfigService::open(path)?).await,
        None => state.initialize().await?,
    }

    if let Some(token) = cli.github_token.as_deref() {
        state.set_github_token(token).await?;
    }
    let api_key = cli
        .gemini_api_key
        .clone()
        .or_else(|| std::env::var(LEGACY_API_KEY_ENV).ok());
    if let Some(key) = api_key.as_deref() {
        state.set_gemini_api_key(key).await?;
    }

    let json = cli.json;
    let (events, printer) = spawn_event_printer(json);
    let success = dispatch(&state, events, cli.command, json).await?;
    // Every sender is gone once dispatch returns, so the printer drains and stops.
    let _ = printer.await;
    Ok(success)
}

async fn dispatch(
    state: &AppState,
    events: EventSink,
    command: Command,
    json: bool,
) -> anyhow::Result<bool> {
    let success = match command {
        Command::Health => print_response(commands::get_health(state).await, json)?,
        Command::Settings { action } => {
            let response = match action.unwrap_or(SettingsAction::Show) {
                SettingsAction::Show => commands::get_settings(state).await,
                SettingsAction::Update { patch } => {
                    let update: SettingsUpdate = serde_json::from_str(&patch)?;
                    commands::update_settings(state, update).await
                }
                SettingsAction::Reset => commands::reset_settings(state).await,
            };
            print_response(response, json)?
        }
        Command::Repos => print_response(commands::list_repositories(state, events).await, json)?,
        Command::Tree { repo, branch } => {
            print_response(commands::get_tree(state, repo, branch).await, json)?
        }
        Command::Workflows { repo } => {
            print_response(commands::list_workflows(state, repo).await, json)?
        }
        Command::Edit {
            file,
            instruction,
            branch,
            commit,
        } => {
            let request = commands::EditFileRequest {
                file,
                branch,
                instruction,
                commit_message: commit,
            };
            print_response(commands::ai_edit_file(state, events, request).await, json)?
        }
        Command::Commit {
            file,
            content,
            message,
            branch,
        } => {
            let content = read_content(&content)?;
            let response =
                commands::commit_file(state, events, file, branch, content, message).await;
            print_response(response, json)?
        }
        Command::Branch { repo, name, from } => {
            print_response(commands::create_branch(state, events, repo, from, name).await, json)?
        }
        Command::Pr {
            repo,
            branch,
            title,
            body,
        } => {
            let response =
                commands::create_pull_request(state, events, repo, branch, title, body).await;
            print_response(response, json)?
        }
        Command::BulkEdit {
            instruction,
            files,
            branch,
        } => {
            let args = commands::BulkEditArgs {
                instruction,
                files,
                branch,
            };
            print_response(commands::bulk_edit(state, events, args).await, json)?
        }
        Command::NewProject {
            name,
            prompt,
            private,
        } => {
            let request = ProjectGenerationRequest {
                repo_name: name,
                prompt,
                private,
            };
            print_response(commands::new_project(state, events, request).await, json)?
        }
        Command::Expand {
            prompt,
            seeds,
            branch,
        } => {
            let args = commands::ExpandArgs {
                prompt,
                seeds,
                branch,
            };
            print_response(commands::expand_project(state, events, args).await, json)?
        }
        Command::AdvancedEdit {
            repo,
            instruction,
            workflow,
            active,
            context,
            branch,
        } => {
            let args = commands::AdvancedEditArgs {
                instruction,
                repo,
                branch,
                workflow_id: workflow,
                active_path: active,
                context_paths: context,
            };
            print_response(commands::advanced_edit(state, events, args).await, json)?
        }
    };
    Ok(success)
}

fn read_content(path: &Path) -> std::io::Result<String> {
    if path.as_os_str() == "-" {
        let mut content = String::new();
        std::io::stdin().read_to_string(&mut content)?;
        Ok(content)
    } else {
        std::fs::read_to_string(path)
    }
}

/// Print `response` to stdout and report whether it succeeded.
fn print_response<T: Serialize>(response: CommandResponse<T>, json: bool) -> anyhow::Result<bool> {
    let success = response.success;
    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else if let Some(data) = &response.data {
        println!("{}", serde_json::to_string_pretty(data)?);
    } else if let Some(error) = &response.error {
        eprintln!("Error: {}", error);
    }
    Ok(success)
}

fn spawn_event_printer(json: bool) -> (EventSink, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<WorkflowEvent>();
    let handle = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if json {
                if let Ok(line) = serde_json::to_string(&event) {
                    eprintln!("{}", line);
                }
            } else {
                eprintln!("{}", describe_event(&event));
            }
        }
    });
    (EventSink::new(tx), handle)
}

/// One human-readable progress line
pub fn describe_event(event: &WorkflowEvent) -> String {
    match event {
        WorkflowEvent::Status { message } => message.clone(),
        WorkflowEvent::Planned { workflow, jobs } => {
            format!("{}: {} file(s) planned", workflow, jobs)
        }
        WorkflowEvent::JobUpdated { id, status, error } => match error {
            Some(error) => format!("[{}] {}: {}", status, id, error),
            None => format!("[{}] {}", status, id),
        },
        WorkflowEvent::PhaseChanged { phase, attempt } => {
            format!("Phase {} (attempt {})", phase, attempt)
        }
        WorkflowEvent::ReasoningUpdated { reasoning } => format!("Plan: {}", reasoning),
        WorkflowEvent::RunObserved { url, status } => format!("Run {}: {}", status, url),
        WorkflowEvent::SeedEditRejected { paths } => {
            format!("Ignored planned edits to the seed: {}", paths.join(", "))
        }
        WorkflowEvent::Finished {
            workflow,
            succeeded,
            failed,
        } => format!(
            "{} finished: {} succeeded, {} failed",
            workflow, succeeded, failed
        ),
        WorkflowEvent::Alert { kind, message } => match kind {
            AlertKind::Success => format!("OK: {}", message),
            AlertKind::Error => format!("ERROR: {}", message),
        },
    }
}
