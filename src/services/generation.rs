//! AI Content Streaming
//!
//! Streams a completion into a caller-supplied sink, one fragment at a time,
//! and builds the prompts for the file-writing calls.

use tokio::sync::mpsc;

use repo_weaver_core::UnifiedStreamEvent;
use repo_weaver_llm::{LlmResult, ModelBackend};

/// One fragment in flight between the backend and the sink.
const STREAM_BUFFER: usize = 1;

/// Stream `prompt` through `model`, handing each text fragment to `sink` in
/// arrival order.
///
/// The sink only sees fragments; accumulating them is up to the caller. A
/// transport failure or an error reported inside the stream is returned
/// after every fragment received before it has been delivered.
pub async fn stream_to_sink<F>(
    backend: &dyn ModelBackend,
    model: &str,
    prompt: &str,
    mut sink: F,
) -> LlmResult<()>
where
    F: FnMut(&str),
{
    let (tx, mut rx) = mpsc::channel::<UnifiedStreamEvent>(STREAM_BUFFER);

    let producer = backend.stream_text(model, prompt, tx);
    let consumer = async {
        while let Some(event) = rx.recv().await {
            if let Some(text) = event.text() {
                sink(text);
            }
        }
    };

    let (result, ()) = tokio::join!(producer, consumer);
    result
}

const RAW_OUTPUT_RULES: &str = "Reply with the raw file content only. No markdown fences, no commentary, no preamble: the reply is written to disk exactly as sent and must be valid as-is.";

/// Bulk edit: apply one instruction to one of many selected files.
pub fn bulk_edit_prompt(instruction: &str, path: &str, original: &str) -> String {
    format!(
        r#"You are an experienced programmer applying a change request to a single file.

{RAW_OUTPUT_RULES}
If the request does not apply to this file, reply with the original content unchanged.
Keep the result syntactically valid and keep the existing structure where it still fits.

Request: "{instruction}"
File: "{path}"
Current content:
---
{original}
---
"#
    )
}

/// New project: write one planned file.
pub fn file_generation_prompt(goal: &str, path: &str, description: &str) -> String {
    format!(
        r#"You are an experienced programmer writing one file of a new project.

Project goal: "{goal}"
File: "{path}"
Purpose: "{description}"

Write the complete, working content of this file so that it fits its purpose within the project.
{RAW_OUTPUT_RULES}
"#
    )
}

/// Advanced edit: rewrite a file following planned change instructions.
pub fn repository_file_prompt(changes: &str, path: &str, original: &str) -> String {
    format!(
        r#"You are an experienced programmer applying planned changes to a single file.

{RAW_OUTPUT_RULES}
Apply the instructions exactly and return the complete new version of the file.

Instructions: "{changes}"
File: "{path}"
Current content:
---
{original}
---
"#
    )
}

/// Editor: rewrite the open buffer from a free-form instruction.
pub fn single_file_edit_prompt(instruction: &str, path: &str, original: &str) -> String {
    format!(
        r#"You are a coding assistant. Rewrite the file below as the instruction asks.

{RAW_OUTPUT_RULES}

Instruction: "{instruction}"
File: "{path}"
Current content:
---
{original}
---
"#
    )
}
