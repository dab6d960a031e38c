//! Advanced Edit Phases
//!
//! Phase machine for the agentic edit loop:
//! `idle -> analyzing -> planning -> editing -> committing ->
//! triggering_workflow -> waiting_for_workflow -> complete`, with a failed
//! build going through `analyzing_failure` back to `editing`.

use serde::{Deserialize, Serialize};

use crate::models::job::TransitionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvancedEditPhase {
    #[default]
    Idle,
    Analyzing,
    Planning,
    Editing,
    Committing,
    TriggeringWorkflow,
    WaitingForWorkflow,
    AnalyzingFailure,
    Complete,
}

impl AdvancedEditPhase {
    pub fn can_transition_to(&self, next: AdvancedEditPhase) -> bool {
        use AdvancedEditPhase::*;
        if next == Complete {
            // Fatal errors end the loop from any running phase.
            return *self != Idle && *self != Complete;
        }
        matches!(
            (self, next),
            (Idle, Analyzing)
                | (Complete, Analyzing)
                | (Analyzing, Planning)
                | (Planning, Editing)
                | (Editing, Committing)
                | (Committing, Editing)
                | (Editing, TriggeringWorkflow)
                | (Committing, TriggeringWorkflow)
                | (TriggeringWorkflow, WaitingForWorkflow)
                | (WaitingForWorkflow, AnalyzingFailure)
                | (AnalyzingFailure, Editing)
        )
    }

    /// Validated transition.
    pub fn advance(&mut self, next: AdvancedEditPhase) -> Result<(), TransitionError> {
        if !self.can_transition_to(next) {
            return Err(TransitionError::Phase {
                from: *self,
                to: next,
            });
        }
        *self = next;
        Ok(())
    }
}

impl std::fmt::Display for AdvancedEditPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AdvancedEditPhase::Idle => "idle",
            AdvancedEditPhase::Analyzing => "analyzing",
            AdvancedEditPhase::Planning => "planning",
            AdvancedEditPhase::Editing => "editing",
            AdvancedEditPhase::Committing => "committing",
            AdvancedEditPhase::TriggeringWorkflow => "triggering_workflow",
            AdvancedEditPhase::WaitingForWorkflow => "waiting_for_workflow",
            AdvancedEditPhase::AnalyzingFailure => "analyzing_failure",
            AdvancedEditPhase::Complete => "complete",
        };
        write!(f, "{}", s)
    }
}
