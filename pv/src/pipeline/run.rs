//! PipelineRun - the record of one query through the pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::PipelineError;
use super::state::PipelineState;
use crate::stages::{Stage, StageResult};

/// One query's trip through the pipeline
///
/// The id is only used to correlate log lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRun {
    pub id: Uuid,
    pub query: String,
    pub state: PipelineState,
    /// Every state the run has visited, starting with `Idle`
    pub history: Vec<PipelineState>,
    pub results: Vec<StageResult>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl PipelineRun {
    pub fn new(query: impl Into<String>) -> Self {
        let id = Uuid::now_v7();
        debug!(%id, "PipelineRun::new: called");
        Self {
            id,
            query: query.into(),
            state: PipelineState::Idle,
            history: vec![PipelineState::Idle],
            results: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Move to `next`, rejecting transitions the state machine does not allow
    pub(crate) fn transition(&mut self, next: PipelineState) -> Result<(), PipelineError> {
        if !self.state.can_transition_to(&next) {
            warn!(run_id = %self.id, from = %self.state, to = %next, "Illegal pipeline transition");
            return Err(PipelineError::IllegalTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }

        info!(run_id = %self.id, from = %self.state, to = %next, "Pipeline transition");
        if next.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
        self.history.push(next.clone());
        self.state = next;
        Ok(())
    }

    pub(crate) fn record(&mut self, result: StageResult) {
        debug!(run_id = %self.id, stage = %result.stage, succeeded = %result.succeeded, "PipelineRun::record: called");
        self.results.push(result);
    }

    /// Text produced by a stage, if it succeeded
    pub fn output(&self, stage: Stage) -> Option<&str> {
        self.results
            .iter()
            .find(|r| r.stage == stage && r.succeeded)
            .map(|r| r.text.as_str())
    }

    /// The final itinerary, or the error that stopped the run
    pub fn outcome(&self) -> Result<&str, PipelineError> {
        match &self.state {
            PipelineState::Done { itinerary } => Ok(itinerary),
            PipelineState::Failed { stage, error } => Err(PipelineError::StageFailed {
                stage: *stage,
                message: error.clone(),
            }),
            other => Err(PipelineError::Incomplete(other.to_string())),
        }
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.finished_at.map(|end| (end - self.started_at).num_milliseconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_run_is_idle() {
        let run = PipelineRun::new("history please");
        assert_eq!(run.state, PipelineState::Idle);
        assert_eq!(run.history, vec![PipelineState::Idle]);
        assert!(run.finished_at.is_none());
        assert!(matches!(run.outcome(), Err(PipelineError::Incomplete(_))));
    }

    #[test]
    fn test_illegal_transition_is_rejected() {
        let mut run = PipelineRun::new("q");
        let err = run.transition(PipelineState::RunningTourGuide).unwrap_err();
        assert!(matches!(err, PipelineError::IllegalTransition { .. }));
        assert_eq!(run.state, PipelineState::Idle);
    }

    #[test]
    fn test_terminal_state_sets_finish_time() {
        let mut run = PipelineRun::new("q");
        run.transition(PipelineState::RunningMaster).unwrap();
        run.transition(PipelineState::Failed {
            stage: Stage::Master,
            error: "API error 500: down".to_string(),
        })
        .unwrap();

        assert!(run.finished_at.is_some());
        assert!(run.duration_ms().unwrap() >= 0);
        let err = run.outcome().unwrap_err();
        assert!(matches!(err, PipelineError::StageFailed { stage: Stage::Master, .. }));
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(PipelineRun::new("a").id, PipelineRun::new("a").id);
    }
}
