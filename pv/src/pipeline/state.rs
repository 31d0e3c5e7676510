//! Pipeline state machine

use serde::{Deserialize, Serialize};

use crate::stages::Stage;

/// Where a pipeline run is
///
/// `Idle → RunningMaster → RunningHistorian → RunningTourGuide →
/// RunningItineraryPlanner → Done`, with `Failed` reachable from any running state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum PipelineState {
    #[default]
    Idle,
    RunningMaster,
    RunningHistorian,
    RunningTourGuide,
    RunningItineraryPlanner,
    Done { itinerary: String },
    Failed { stage: Stage, error: String },
}

impl PipelineState {
    /// The running state for a stage
    pub fn running(stage: Stage) -> Self {
        match stage {
            Stage::Master => Self::RunningMaster,
            Stage::Historian => Self::RunningHistorian,
            Stage::TourGuide => Self::RunningTourGuide,
            Stage::ItineraryPlanner => Self::RunningItineraryPlanner,
        }
    }

    /// The stage being executed, if any
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::RunningMaster => Some(Stage::Master),
            Self::RunningHistorian => Some(Stage::Historian),
            Self::RunningTourGuide => Some(Stage::TourGuide),
            Self::RunningItineraryPlanner => Some(Stage::ItineraryPlanner),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Failed { .. })
    }

    /// Check whether moving to `next` is a legal transition
    pub fn can_transition_to(&self, next: &PipelineState) -> bool {
        match (self, next) {
            (Self::Idle, Self::RunningMaster) => true,
            (Self::RunningMaster, Self::RunningHistorian) => true,
            (Self::RunningHistorian, Self::RunningTourGuide) => true,
            (Self::RunningTourGuide, Self::RunningItineraryPlanner) => true,
            (Self::RunningItineraryPlanner, Self::Done { .. }) => true,
            (current, Self::Failed { stage, .. }) => current.stage() == Some(*stage),
            _ => false,
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::RunningMaster => write!(f, "running-master"),
            Self::RunningHistorian => write!(f, "running-historian"),
            Self::RunningTourGuide => write!(f, "running-tour-guide"),
            Self::RunningItineraryPlanner => write!(f, "running-itinerary-planner"),
            Self::Done { .. } => write!(f, "done"),
            Self::Failed { stage, .. } => write!(f, "failed({})", stage),
        }
    }
}
