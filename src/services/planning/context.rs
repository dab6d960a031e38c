//! Prompt File Context
//!
//! Renders repository files into the text block embedded in planning
//! prompts, keeping the result within a character budget.

use crate::models::plan::ContextFile;

/// Default character budget for file context
pub const DEFAULT_CONTEXT_BUDGET: usize = 1_000_000;

fn render(label: &str, file: &ContextFile) -> String {
    format!("--- START OF {} {} ---\n{}\n", label, file.path, file.content)
}

/// Concatenate whole files into a prompt block of at most `budget` characters.
///
/// The active file goes first when it fits on its own. The rest follow in the
/// given order until the first one that does not fit; files are never
/// truncated and nothing after that point is considered.
pub fn prepare_file_context(
    files: &[ContextFile],
    active_path: Option<&str>,
    budget: usize,
) -> String {
    let mut context = String::new();
    let mut remaining = budget;

    if let Some(active) = active_path.and_then(|p| files.iter().find(|f| f.path == p)) {
        let block = render("FILE", active);
        let len = block.chars().count();
        if len <= remaining {
            context.push_str(&block);
            remaining -= len;
        }
    }

    for file in files
        .iter()
        .filter(|f| active_path.map_or(true, |p| f.path != p))
    {
        let block = render("FILE", file);
        let len = block.chars().count();
        if len > remaining {
            break;
        }
        context.push_str(&block);
        remaining -= len;
    }

    context
}

/// Seed files for an expansion, rendered without a budget.
pub fn seed_file_context(files: &[ContextFile]) -> String {
    files.iter().map(|f| render("SEED FILE", f)).collect()
}
