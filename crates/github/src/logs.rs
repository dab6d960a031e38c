//! Workflow Run Log Collection
//!
//! Gathers the build output fed back to the model after a failed run. Logs
//! of jobs that concluded `failure` are preferred; when no job is marked
//! failed (a cancelled run, for example) every job's log is collected.

use repo_weaver_core::RepoRef;
use tracing::warn;

use crate::backend::VcsBackend;
use crate::error::GitHubResult;

/// Concatenate job logs for `run_id`.
///
/// Listing the jobs is required; a single job's log failing to download is
/// recorded inline instead of failing the whole collection.
pub async fn collect_run_logs(
    backend: &dyn VcsBackend,
    repo: &RepoRef,
    run_id: u64,
) -> GitHubResult<String> {
    let jobs = backend.list_run_jobs(repo, run_id).await?;

    let failed: Vec<_> = jobs
        .iter()
        .filter(|job| job.conclusion.as_deref() == Some("failure"))
        .collect();
    let selected = if failed.is_empty() {
        jobs.iter().collect()
    } else {
        failed
    };

    let mut all_logs = String::new();
    for job in selected {
        match backend.get_job_logs(repo, job.id).await {
            Ok(log) => {
                all_logs.push_str(&format!(
                    "\n\n--- LOGS FOR JOB {} (Conclusion: {}) ---\n\n{}",
                    job.id,
                    job.conclusion.as_deref().unwrap_or("null"),
                    log
                ));
            }
            Err(e) => {
                warn!(job_id = job.id, "Could not fetch logs for job: {}", e);
                all_logs.push_str(&format!("\n\n--- FAILED TO FETCH LOGS FOR JOB {} ---", job.id));
            }
        }
    }

    Ok(all_logs)
}
