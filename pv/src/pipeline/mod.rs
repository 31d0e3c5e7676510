//! Itinerary pipeline
//!
//! Sequences the stages for a query and records every state the run visits.

mod orchestrator;
mod run;
mod state;

use thiserror::Error;

use crate::stages::Stage;

pub use orchestrator::{Orchestrator, PipelineContext};
pub use run::PipelineRun;
pub use state::PipelineState;

/// Errors reported by a pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("stage {stage} failed: {message}")]
    StageFailed { stage: Stage, message: String },

    #[error("illegal pipeline transition {from} -> {to}")]
    IllegalTransition { from: String, to: String },

    #[error("pipeline run has not finished (state: {0})")]
    Incomplete(String),
}
