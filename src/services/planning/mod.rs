//! AI Planning Protocol
//!
//! One schema-constrained JSON call per plan. The result is parsed into a
//! typed plan and validated; nothing here retries, callers wrap each call in
//! a [`ModelFallback`](crate::services::fallback::ModelFallback).

pub mod context;
pub mod prompts;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use repo_weaver_llm::{LlmError, ModelBackend, ResponseSchema};

use crate::models::plan::{
    ContextFile, ExpansionPlan, PreviousEdit, ProjectPlan, RepositoryEditPlan,
};
use crate::utils::error::{AppError, AppResult};

pub use context::{prepare_file_context, seed_file_context, DEFAULT_CONTEXT_BUDGET};

fn file_edit_schema(changes: &str) -> ResponseSchema {
    ResponseSchema::object()
        .property("path", ResponseSchema::string().describe("Path of the file to edit."))
        .property("changes", ResponseSchema::string().describe(changes))
}

/// `{files: [{path, description}]}`
pub fn project_plan_schema() -> ResponseSchema {
    ResponseSchema::object().property(
        "files",
        ResponseSchema::array(
            ResponseSchema::object()
                .property(
                    "path",
                    ResponseSchema::string()
                        .describe("Full file path including directories, e.g. \"src/main.rs\"."),
                )
                .property(
                    "description",
                    ResponseSchema::string().describe("One sentence on what the file contains."),
                ),
        )
        .describe("Every file the new project needs."),
    )
}

/// `{filesToEdit?: [{path, changes}], filesToCreate?: [{path, description, agentIndex}]}`
pub fn expansion_plan_schema() -> ResponseSchema {
    ResponseSchema::object()
        .optional_property(
            "filesToEdit",
            ResponseSchema::array(file_edit_schema("Step-by-step change instructions."))
                .describe("Always empty; the seed file is never edited."),
        )
        .optional_property(
            "filesToCreate",
            ResponseSchema::array(
                ResponseSchema::object()
                    .property("path", ResponseSchema::string().describe("Path of the new file."))
                    .property(
                        "description",
                        ResponseSchema::string()
                            .describe("Detailed purpose and contents of the new file."),
                    )
                    .property(
                        "agentIndex",
                        ResponseSchema::number().describe("Agent (0-7) that creates this file."),
                    ),
            )
            .describe("New files to create."),
        )
}

/// `{reasoning, filesToEdit: [{path, changes}]}`
pub fn repository_edit_schema() -> ResponseSchema {
    ResponseSchema::object()
        .property(
            "reasoning",
            ResponseSchema::string().describe("Which files change and why."),
        )
        .property(
            "filesToEdit",
            ResponseSchema::array(file_edit_schema(
                "Precise step-by-step instructions for the code changes.",
            ))
            .describe("Files to modify with the changes for each."),
        )
}

/// Issues planning calls against a model backend
#[derive(Clone)]
pub struct Planner {
    backend: Arc<dyn ModelBackend>,
    context_budget: usize,
}

impl std::fmt::Debug for Planner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Planner")
            .field("backend", &self.backend.name())
            .field("context_budget", &self.context_budget)
            .finish()
    }
}

impl Planner {
    pub fn new(backend: Arc<dyn ModelBackend>, context_budget: usize) -> Self {
        Self {
            backend,
            context_budget,
        }
    }

    async fn request<T: DeserializeOwned>(
        &self,
        model: &str,
        prompt: &str,
        schema: &ResponseSchema,
    ) -> AppResult<T> {
        debug!(model, prompt_chars = prompt.chars().count(), "Requesting plan");
        let value = self.backend.generate_structured(model, prompt, schema).await?;
        serde_json::from_value(value).map_err(|e| {
            warn!(model, "Plan did not match schema: {}", e);
            AppError::from(LlmError::ParseError {
                message: format!("Plan did not match the expected shape: {}", e),
            })
        })
    }

    /// File layout for a new project.
    pub async fn plan_project(&self, model: &str, goal: &str) -> AppResult<ProjectPlan> {
        let prompt = prompts::project_plan_prompt(goal);
        let plan: ProjectPlan = self.request(model, &prompt, &project_plan_schema()).await?;
        plan.validate()?;
        Ok(plan)
    }

    /// New files to grow around the seed files.
    pub async fn plan_expansion(
        &self,
        model: &str,
        seed_files: &[ContextFile],
        goal: &str,
    ) -> AppResult<ExpansionPlan> {
        let prompt = prompts::expansion_plan_prompt(goal, &seed_file_context(seed_files));
        let plan: ExpansionPlan = self
            .request(model, &prompt, &expansion_plan_schema())
            .await?;
        plan.validate()?;
        Ok(plan)
    }

    /// Multi-file edit plan for an instruction, with the active file first
    /// in the context.
    pub async fn plan_repository_edit(
        &self,
        model: &str,
        instruction: &str,
        active_path: &str,
        files: &[ContextFile],
    ) -> AppResult<RepositoryEditPlan> {
        let context = prepare_file_context(files, Some(active_path), self.context_budget);
        let prompt = prompts::repository_edit_prompt(instruction, active_path, &context);
        let plan: RepositoryEditPlan = self
            .request(model, &prompt, &repository_edit_schema())
            .await?;
        plan.validate()?;
        Ok(plan)
    }

    /// Replacement plan after a failed build.
    pub async fn plan_build_correction(
        &self,
        model: &str,
        instruction: &str,
        files: &[ContextFile],
        previous_edits: &[PreviousEdit],
        build_logs: &str,
    ) -> AppResult<RepositoryEditPlan> {
        let context = prepare_file_context(files, None, self.context_budget);
        let prompt = prompts::build_correction_prompt(
            instruction,
            build_logs,
            &prompts::render_previous_edits(previous_edits),
            &context,
        );
        let plan: RepositoryEditPlan = self
            .request(model, &prompt, &repository_edit_schema())
            .await?;
        plan.validate()?;
        Ok(plan)
    }
}
