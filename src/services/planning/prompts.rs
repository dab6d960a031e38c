//! Planning Prompts
//!
//! Prompt text for the JSON planning calls. Each builder takes the already
//! rendered file context so budget handling stays in `context`.

use crate::models::plan::PreviousEdit;

/// Prompt asking for a file layout for a brand new project.
pub fn project_plan_prompt(goal: &str) -> String {
    format!(
        r#"You are a senior software architect laying out a new project from a short brief.

Project brief: "{goal}"

Produce the list of files needed for a minimal but runnable first version of this project.
- List every file that holds code or text. Directories are implied by paths and must not be listed.
- Give each file a single sentence describing what it contains.
- Answer with a JSON object matching the supplied schema and nothing else.
"#
    )
}

/// Prompt asking for a large expansion around a seed file.
pub fn expansion_plan_prompt(goal: &str, seed_context: &str) -> String {
    format!(
        r#"You are a software architect growing a full system out of one seed file.

Goal: "{goal}"

Study the seed file below to learn its domain, naming and patterns, then plan a broad expansion of new files around it.
- Put every new file in "filesToCreate" with a detailed description of its purpose and contents.
- Spread the new files across agents by giving each one an "agentIndex" between 0 and 7.
- Prefer breadth: plan as many files as the goal justifies.
- "filesToEdit" has to stay empty. The seed file is read only.

Answer with a JSON object matching the supplied schema and nothing else.

Seed file:
{seed_context}"#
    )
}

/// Prompt asking for a multi-file edit plan with reasoning.
pub fn repository_edit_prompt(instruction: &str, active_path: &str, file_context: &str) -> String {
    format!(
        r#"You are an autonomous software engineer turning a change request into a plan of file edits.

The full source of the repository is included below. Base the plan on that code; never claim a file is missing or truncated.

Request: "{instruction}"
File open in the editor when the request was made: "{active_path}"

1. "reasoning": a few sentences on which files you will change and why.
2. "filesToEdit": for each file, precise step-by-step change instructions that another engineer can apply without guessing. Name the functions, conditions and values involved rather than describing changes vaguely.

Answer with a JSON object matching the supplied schema and nothing else.

Repository files:
{file_context}"#
    )
}

/// Render edits from earlier attempts for the correction prompt.
pub fn render_previous_edits(edits: &[PreviousEdit]) -> String {
    edits
        .iter()
        .map(|edit| {
            format!(
                "Earlier attempt wrote \"{}\" as:\n---\n{}\n---\n",
                edit.path, edit.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prompt asking for a corrective plan after a failed build.
pub fn build_correction_prompt(
    instruction: &str,
    build_logs: &str,
    previous_edits: &str,
    file_context: &str,
) -> String {
    format!(
        r#"You are an autonomous software engineer. The edits made for the request below broke the build. Work out why from the logs and plan a fix.

The full source of the repository is included below and already contains the failed edits. Base the fix on that code; never claim a file is missing or truncated.

Original request: "{instruction}"

Build logs:
---
{build_logs}
---

Edits from the failed attempt:
{previous_edits}

1. "reasoning": identify the root cause of the failure and describe the fix.
2. "filesToEdit": a complete replacement plan with step-by-step change instructions per file. Include reverts explicitly when an earlier change has to be undone.

Answer with a JSON object matching the supplied schema and nothing else.

Repository files:
{file_context}"#
    )
}
