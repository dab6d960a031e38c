//! Advanced Edit Workflow
//!
//! Plans a multi-file change, applies it file by file and verifies it with a
//! CI workflow run. A failed build feeds its logs into a correction plan
//! until the build passes or the attempt budget is spent.
//!
//! Files are edited strictly one after another; the bounded runner is not
//! used here.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use repo_weaver_core::RepoRef;
use repo_weaver_github::{collect_run_logs, WorkflowRun};

use crate::models::job::{Job, JobKind, JobStatus};
use crate::models::phase::AdvancedEditPhase;
use crate::models::plan::{ContextFile, FileEdit, PreviousEdit};
use crate::models::settings::AppConfig;
use crate::services::generation::{repository_file_prompt, stream_to_sink};
use crate::services::job_board::JobBoard;
use crate::services::sanitizer::sanitize;
use crate::utils::error::{AppError, AppResult};

use super::executor::WorkflowContext;
use super::{EventSink, WorkflowEvent};

/// Build verification rounds before giving up
pub const MAX_VERIFICATION_ATTEMPTS: u32 = 3;

/// Timing and limits of the verification loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationConfig {
    pub max_attempts: u32,
    /// Wait between triggering a run and the first poll
    pub settle_delay: Duration,
    pub poll_interval: Duration,
    /// `None` waits on a run forever
    pub poll_timeout: Option<Duration>,
    /// `{owner}`/`{repo}` template; `None` reports no deployment URL
    pub deployment_url_template: Option<String>,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for VerificationConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_attempts: config.max_verification_attempts.max(1),
            settle_delay: Duration::from_secs(config.workflow_settle_delay_secs),
            poll_interval: Duration::from_secs(config.workflow_poll_interval_secs.max(1)),
            poll_timeout: config.workflow_poll_timeout_secs.map(Duration::from_secs),
            deployment_url_template: config.deployment_url_template.clone(),
        }
    }
}

impl VerificationConfig {
    /// Guess where a green build gets published. Nothing checks that the
    /// URL actually serves anything.
    pub fn deployment_url(&self, repo: &RepoRef) -> Option<String> {
        self.deployment_url_template.as_ref().map(|template| {
            template
                .replace("{owner}", &repo.owner)
                .replace("{repo}", &repo.name)
        })
    }
}

#[derive(Debug, Clone)]
pub struct AdvancedEditRequest {
    pub instruction: String,
    pub repo: RepoRef,
    /// Working branch; commits and verification runs happen here
    pub branch: String,
    /// Workflow that verifies the build (numeric id or file name)
    pub workflow_id: String,
    /// File the user is looking at; goes first in the planning context
    pub active_path: String,
    /// Files open in the editor, with their version tokens when known
    pub open_files: Vec<ContextFile>,
}

/// How an advanced edit ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AdvancedEditOutcome {
    Succeeded {
        #[serde(skip_serializing_if = "Option::is_none")]
        deployment_url: Option<String>,
    },
    /// Every verification attempt ended with a failed build
    BuildStillFailing,
    /// Aborted by an error outside the verification step
    Failed { message: String },
}

/// Point-in-time view of a running or finished advanced edit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdvancedEditSnapshot {
    pub phase: AdvancedEditPhase,
    pub attempt: u32,
    pub build_logs: String,
    pub run_url: Option<String>,
    pub reasoning: String,
    pub deployment_url: Option<String>,
    pub jobs: Vec<Job>,
    pub outcome: Option<AdvancedEditOutcome>,
}

#[derive(Debug, Default)]
struct MonitorState {
    phase: AdvancedEditPhase,
    attempt: u32,
    build_logs: String,
    run_url: Option<String>,
    reasoning: String,
    deployment_url: Option<String>,
    outcome: Option<AdvancedEditOutcome>,
}

/// Shared progress of one advanced edit
///
/// Cheap to clone; every clone observes the same run.
#[derive(Debug, Clone, Default)]
pub struct AdvancedEditMonitor {
    state: Arc<RwLock<MonitorState>>,
    board: JobBoard,
    events: EventSink,
}

impl AdvancedEditMonitor {
    pub fn new(events: EventSink) -> Self {
        Self {
            state: Arc::default(),
            board: JobBoard::new(events.clone()),
            events,
        }
    }

    /// Jobs of the current attempt
    pub fn board(&self) -> &JobBoard {
        &self.board
    }

    pub fn phase(&self) -> AdvancedEditPhase {
        self.state.read().phase
    }

    pub fn snapshot(&self) -> AdvancedEditSnapshot {
        let state = self.state.read();
        AdvancedEditSnapshot {
            phase: state.phase,
            attempt: state.attempt,
            build_logs: state.build_logs.clone(),
            run_url: state.run_url.clone(),
            reasoning: state.reasoning.clone(),
            deployment_url: state.deployment_url.clone(),
            jobs: self.board.snapshot(),
            outcome: state.outcome.clone(),
        }
    }

    /// Enter `analyzing` with a clean slate. Fails while a run is in progress.
    fn begin(&self) -> AppResult<()> {
        {
            let mut state = self.state.write();
            let mut phase = state.phase;
            phase.advance(AdvancedEditPhase::Analyzing)?;
            *state = MonitorState {
                phase,
                attempt: 1,
                ..MonitorState::default()
            };
        }
        self.board.reset(Vec::new());
        self.events.emit(WorkflowEvent::PhaseChanged {
            phase: AdvancedEditPhase::Analyzing,
            attempt: 1,
        });
        Ok(())
    }

    fn set_phase(&self, next: AdvancedEditPhase) -> AppResult<()> {
        let attempt = {
            let mut state = self.state.write();
            state.phase.advance(next)?;
            state.attempt
        };
        self.events.emit(WorkflowEvent::PhaseChanged {
            phase: next,
            attempt,
        });
        Ok(())
    }

    fn set_attempt(&self, attempt: u32) {
        self.state.write().attempt = attempt;
    }

    fn set_reasoning(&self, reasoning: &str) {
        self.state.write().reasoning = reasoning.to_string();
        self.events.emit(WorkflowEvent::ReasoningUpdated {
            reasoning: reasoning.to_string(),
        });
    }

    fn set_build_logs(&self, logs: &str) {
        self.state.write().build_logs = logs.to_string();
    }

    fn observe_run(&self, run: &WorkflowRun) {
        self.state.write().run_url = Some(run.html_url.clone());
        self.events.emit(WorkflowEvent::RunObserved {
            url: run.html_url.clone(),
            status: run.status.clone(),
        });
    }

    fn finish(&self, outcome: AdvancedEditOutcome) -> AppResult<()> {
        {
            let mut state = self.state.write();
            if let AdvancedEditOutcome::Succeeded { deployment_url } = &outcome {
                state.deployment_url = deployment_url.clone();
            }
            state.outcome = Some(outcome);
        }
        self.set_phase(AdvancedEditPhase::Complete)
    }
}

enum RunResult {
    Completed(WorkflowRun),
    TimedOut(Duration),
}

/// Run the plan / edit / verify loop to completion.
///
/// Build failures drive further attempts. Any other error ends the loop:
/// the monitor records a failed outcome, one alert is raised and the error
/// is returned.
pub async fn run_advanced_edit(
    ctx: &WorkflowContext,
    monitor: &AdvancedEditMonitor,
    request: AdvancedEditRequest,
) -> AppResult<AdvancedEditOutcome> {
    let verification = VerificationConfig::from(&ctx.config);

    if let Err(e) = validate_request(&request).and_then(|_| monitor.begin()) {
        ctx.events
            .alert_error(format!("Advanced edit failed: {}", e));
        return Err(e);
    }
    info!(
        repo = %request.repo,
        branch = %request.branch,
        workflow = %request.workflow_id,
        max_attempts = verification.max_attempts,
        "Starting advanced edit"
    );

    match verify_loop(ctx, monitor, &request, &verification).await {
        Ok(outcome) => {
            if outcome == AdvancedEditOutcome::BuildStillFailing {
                warn!(
                    attempts = verification.max_attempts,
                    "Build still failing after the last verification attempt"
                );
                ctx.events
                    .alert_error("Max verification attempts reached. Build still failing.");
            }
            monitor.finish(outcome.clone())?;
            Ok(outcome)
        }
        Err(e) => {
            error!("Advanced edit failed: {}", e);
            ctx.events
                .alert_error(format!("Advanced edit failed: {}", e));
            if let Err(finish_err) = monitor.finish(AdvancedEditOutcome::Failed {
                message: e.to_string(),
            }) {
                debug!("Could not close the advanced edit: {}", finish_err);
            }
            Err(e)
        }
    }
}

fn validate_request(request: &AdvancedEditRequest) -> AppResult<()> {
    if request.instruction.trim().is_empty() {
        return Err(AppError::validation("Instruction must not be empty"));
    }
    if request.workflow_id.trim().is_empty() {
        return Err(AppError::validation(
            "A workflow is required to verify the build",
        ));
    }
    if request.branch.trim().is_empty() {
        return Err(AppError::validation("A working branch is required"));
    }
    Ok(())
}

async fn verify_loop(
    ctx: &WorkflowContext,
    monitor: &AdvancedEditMonitor,
    request: &AdvancedEditRequest,
    verification: &VerificationConfig,
) -> AppResult<AdvancedEditOutcome> {
    let mut files = request.open_files.clone();
    let mut previous_edits: Vec<PreviousEdit> = Vec::new();
    let mut build_logs = String::new();
    let planner = ctx.planner();

    for attempt in 1..=verification.max_attempts {
        monitor.set_attempt(attempt);
        if attempt == 1 {
            monitor.set_phase(AdvancedEditPhase::Planning)?;
        }

        let planner = &planner;
        let files_ref = &files;
        let edits_ref = &previous_edits;
        let logs_ref = build_logs.as_str();
        let instruction = request.instruction.as_str();
        let active_path = request.active_path.as_str();
        let (plan, _) = ctx
            .fallback()
            .execute(move |model_attempt| async move {
                if attempt == 1 {
                    planner
                        .plan_repository_edit(&model_attempt.model, instruction, active_path, files_ref)
                        .await
                } else {
                    planner
                        .plan_build_correction(
                            &model_attempt.model,
                            instruction,
                            files_ref,
                            edits_ref,
                            logs_ref,
                        )
                        .await
                }
            })
            .await
            .map_err(|e| {
                error!(attempt, "Edit planning exhausted the roster: {:?}", e);
                AppError::workflow("Failed to generate edit plan.")
            })?;

        info!(attempt, files = plan.files_to_edit.len(), "Edit plan ready");
        monitor.set_reasoning(&plan.reasoning);

        let board = monitor.board();
        board.reset(
            plan.files_to_edit
                .iter()
                .map(|edit| {
                    Job::new(edit.path.clone(), edit.path.clone(), JobKind::Edit, edit.changes.clone())
                        .with_repo(request.repo.clone())
                })
                .collect(),
        );
        for edit in &plan.files_to_edit {
            board.transition(&edit.path, JobStatus::Planning, None)?;
        }

        monitor.set_phase(AdvancedEditPhase::Editing)?;
        for edit in &plan.files_to_edit {
            if let Err(e) =
                apply_edit(ctx, monitor, request, edit, attempt, &mut files, &mut previous_edits)
                    .await
            {
                if let Err(fail_err) = board.fail(&edit.path, e.to_string()) {
                    debug!(path = %edit.path, "Could not record failure: {}", fail_err);
                }
                return Err(e);
            }
        }

        monitor.set_phase(AdvancedEditPhase::TriggeringWorkflow)?;
        ctx.vcs
            .trigger_workflow(&request.repo, &request.workflow_id, &request.branch)
            .await?;
        monitor.set_phase(AdvancedEditPhase::WaitingForWorkflow)?;

        match wait_for_run(ctx, monitor, request, verification).await? {
            RunResult::Completed(run) if run.succeeded() => {
                info!(attempt, run_id = run.id, "Verification build passed");
                return Ok(AdvancedEditOutcome::Succeeded {
                    deployment_url: verification.deployment_url(&request.repo),
                });
            }
            RunResult::Completed(run) => {
                monitor.set_phase(AdvancedEditPhase::AnalyzingFailure)?;
                warn!(
                    attempt,
                    run_id = run.id,
                    conclusion = run.conclusion.as_deref().unwrap_or("none"),
                    "Verification build failed"
                );
                build_logs = collect_run_logs(ctx.vcs.as_ref(), &request.repo, run.id).await?;
            }
            RunResult::TimedOut(waited) => {
                monitor.set_phase(AdvancedEditPhase::AnalyzingFailure)?;
                warn!(attempt, waited_secs = waited.as_secs(), "Verification run timed out");
                build_logs = format!(
                    "The verification workflow did not complete within {} seconds; treat the build as failed.",
                    waited.as_secs()
                );
            }
        }
        monitor.set_build_logs(&build_logs);
    }

    Ok(AdvancedEditOutcome::BuildStillFailing)
}

/// Rewrite and commit one planned file with the primary model.
async fn apply_edit(
    ctx: &WorkflowContext,
    monitor: &AdvancedEditMonitor,
    request: &AdvancedEditRequest,
    edit: &FileEdit,
    attempt: u32,
    files: &mut Vec<ContextFile>,
    previous_edits: &mut Vec<PreviousEdit>,
) -> AppResult<()> {
    if monitor.phase() == AdvancedEditPhase::Committing {
        monitor.set_phase(AdvancedEditPhase::Editing)?;
    }
    let board = monitor.board();
    let id = edit.path.as_str();

    let (original, sha) = match files.iter().find(|f| f.path == edit.path) {
        Some(known) => (known.content.clone(), known.sha.clone()),
        None => match ctx
            .vcs
            .get_file(&request.repo, &edit.path, Some(&request.branch))
            .await
        {
            Ok(remote) => (remote.content, Some(remote.sha)),
            Err(e) if e.is_not_found() => {
                debug!(path = id, "Treating as a new file: {}", e);
                (String::new(), None)
            }
            Err(e) => return Err(e.into()),
        },
    };

    board.transition(id, JobStatus::Generating, None)?;
    let prompt = repository_file_prompt(&edit.changes, &edit.path, &original);
    let mut accumulated = String::new();
    stream_to_sink(
        ctx.backend.as_ref(),
        ctx.roster.primary_model(),
        &prompt,
        |fragment| {
            accumulated.push_str(fragment);
            if let Err(e) = board.append_content(id, fragment) {
                debug!(path = id, "Dropped fragment: {}", e);
            }
        },
    )
    .await?;
    let content = sanitize(&accumulated);

    monitor.set_phase(AdvancedEditPhase::Committing)?;
    board.transition(id, JobStatus::Committing, None)?;
    let new_sha = ctx
        .vcs
        .commit_file(
            &request.repo,
            &request.branch,
            &edit.path,
            &content,
            &format!("AI Advanced Edit (Attempt {}): {}", attempt, edit.path),
            sha.as_deref(),
        )
        .await?;
    board.transition(id, JobStatus::Success, None)?;
    info!(attempt, path = id, "Committed edit");

    remember_commit(files, previous_edits, &edit.path, content, new_sha);
    Ok(())
}

/// Keep the planning context and correction history in step with the remote.
fn remember_commit(
    files: &mut Vec<ContextFile>,
    previous_edits: &mut Vec<PreviousEdit>,
    path: &str,
    content: String,
    sha: String,
) {
    match files.iter_mut().find(|f| f.path == path) {
        Some(file) => {
            file.content = content.clone();
            file.sha = Some(sha);
        }
        None => files.push(ContextFile::new(path, content.clone()).with_sha(sha)),
    }
    match previous_edits.iter_mut().find(|e| e.path == path) {
        Some(previous) => previous.content = content,
        None => previous_edits.push(PreviousEdit {
            path: path.to_string(),
            content,
        }),
    }
}

/// Poll the newest run of the workflow on the branch until it completes.
async fn wait_for_run(
    ctx: &WorkflowContext,
    monitor: &AdvancedEditMonitor,
    request: &AdvancedEditRequest,
    verification: &VerificationConfig,
) -> AppResult<RunResult> {
    sleep(verification.settle_delay).await;
    let started = Instant::now();

    loop {
        let runs = ctx
            .vcs
            .list_workflow_runs(&request.repo, &request.workflow_id, &request.branch)
            .await?;
        match runs.into_iter().next() {
            Some(run) => {
                debug!(run_id = run.id, status = %run.status, "Polled workflow run");
                monitor.observe_run(&run);
                if run.is_completed() {
                    return Ok(RunResult::Completed(run));
                }
            }
            None => debug!("No workflow run visible yet"),
        }

        if let Some(timeout) = verification.poll_timeout {
            let waited = started.elapsed();
            if waited >= timeout {
                return Ok(RunResult::TimedOut(waited));
            }
        }
        sleep(verification.poll_interval).await;
    }
}
