//! Pipeline orchestrator
//!
//! Runs Master, Historian, TourGuide and ItineraryPlanner strictly in order.
//! A stage only starts once the previous one succeeded; the first failure
//! ends the run.

use tracing::{debug, error, info};

use super::run::PipelineRun;
use super::state::PipelineState;
use crate::persona::{PersonaDocument, PersonaError, PersonaSource};
use crate::stages::{Stage, StageInputs, StageResult, StageRunner};

/// Context shared by every run of one orchestrator
///
/// Built once, by fetching the persona, and then only read.
#[derive(Debug, Clone, Default)]
pub struct PipelineContext {
    persona: PersonaDocument,
}

impl PipelineContext {
    /// Fetch the persona from `source`; this is the only fetch
    pub async fn initialize(source: &dyn PersonaSource) -> Result<Self, PersonaError> {
        debug!("PipelineContext::initialize: called");
        let persona = source.fetch().await?;
        info!(persona_len = persona.as_str().len(), "Persona loaded");
        Ok(Self { persona })
    }

    pub fn with_persona(persona: PersonaDocument) -> Self {
        Self { persona }
    }

    pub fn persona(&self) -> &PersonaDocument {
        &self.persona
    }
}

/// Sequences the stages for one query at a time
#[derive(Clone)]
pub struct Orchestrator {
    runner: StageRunner,
    context: PipelineContext,
}

impl Orchestrator {
    pub fn new(runner: StageRunner, context: PipelineContext) -> Self {
        Self { runner, context }
    }

    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    pub fn runner(&self) -> &StageRunner {
        &self.runner
    }

    /// Run the pipeline with the session persona
    pub async fn run(&self, query: &str) -> PipelineRun {
        self.run_with_persona(query, self.context.persona()).await
    }

    /// Run the pipeline with a persona that replaces the session one for this run
    pub async fn run_with_persona(&self, query: &str, persona: &PersonaDocument) -> PipelineRun {
        let mut run = PipelineRun::new(query);
        info!(run_id = %run.id, query_len = query.len(), "Pipeline run started");

        for stage in Stage::ORDER {
            if let Err(e) = self.step(&mut run, stage, persona).await {
                error!(run_id = %run.id, %stage, error = %e, "Pipeline run failed");
                return run;
            }
        }

        if let Some(ms) = run.duration_ms() {
            info!(run_id = %run.id, duration_ms = %ms, "Pipeline run finished");
        }
        run
    }

    /// Execute one stage and advance the run; an Err means the run is now Failed
    async fn step(&self, run: &mut PipelineRun, stage: Stage, persona: &PersonaDocument) -> Result<(), String> {
        debug!(run_id = %run.id, %stage, "Orchestrator::step: called");
        run.transition(PipelineState::running(stage)).map_err(|e| e.to_string())?;

        let inputs = StageInputs {
            query: &run.query,
            persona,
            history: run.output(Stage::Historian),
            guide: run.output(Stage::TourGuide),
        };

        let outcome = match self.runner.build_request(stage, &inputs) {
            Ok(request) => self.runner.execute(request).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(result) => {
                if stage == Stage::Master {
                    // Recorded for the caller; later stages never read it
                    debug!(run_id = %run.id, master = %result.text, "Orchestrator::step: master classification");
                }
                let text = result.text.clone();
                run.record(result);
                if stage == Stage::ItineraryPlanner {
                    run.transition(PipelineState::Done { itinerary: text })
                        .map_err(|e| e.to_string())?;
                }
                Ok(())
            }
            Err(e) => {
                let message = match e.llm_error() {
                    Some(llm) => llm.to_string(),
                    None => e.to_string(),
                };
                run.record(StageResult::failure(stage, message.clone()));
                run.transition(PipelineState::Failed {
                    stage,
                    error: message.clone(),
                })
                .map_err(|e| e.to_string())?;
                Err(message)
            }
        }
    }
}
