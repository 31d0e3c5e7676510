//! Stage handlers
//!
//! Each stage turns the accumulated context into a system/user prompt pair and
//! makes exactly one completion call. Stages are stateless; the orchestrator
//! decides what context they see.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{Config, PipelineConfig};
use crate::llm::{CompletionClient, CompletionOptions, LlmError};
use crate::persona::PersonaDocument;
use crate::prompts::{PromptError, PromptSet};

/// The four pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Master,
    Historian,
    TourGuide,
    ItineraryPlanner,
}

impl Stage {
    /// Fixed execution order
    pub const ORDER: [Stage; 4] = [Stage::Master, Stage::Historian, Stage::TourGuide, Stage::ItineraryPlanner];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Master => "master",
            Stage::Historian => "historian",
            Stage::TourGuide => "tour-guide",
            Stage::ItineraryPlanner => "itinerary-planner",
        }
    }

    /// Text returned when the remote answers without content
    pub fn fallback(&self) -> &'static str {
        match self {
            Stage::Master => "No itinerary generated.",
            Stage::Historian => "No historical information retrieved.",
            Stage::TourGuide => "No recommendations generated.",
            Stage::ItineraryPlanner => "No itinerary generated.",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Errors raised while building or executing a stage
#[derive(Debug, Error)]
pub enum StageError {
    #[error("{stage}: failed to build prompt: {source}")]
    Prompt {
        stage: Stage,
        #[source]
        source: PromptError,
    },

    #[error("{stage}: required input '{input}' has not been produced yet")]
    MissingInput { stage: Stage, input: &'static str },

    #[error("{stage}: {source}")]
    Completion {
        stage: Stage,
        #[source]
        source: LlmError,
    },
}

impl StageError {
    pub fn stage(&self) -> Stage {
        match self {
            StageError::Prompt { stage, .. }
            | StageError::MissingInput { stage, .. }
            | StageError::Completion { stage, .. } => *stage,
        }
    }

    /// The completion error, if the failure came from the completion call
    pub fn llm_error(&self) -> Option<&LlmError> {
        match self {
            StageError::Completion { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// A fully built request for one stage, discarded after the call
#[derive(Debug, Clone, PartialEq)]
pub struct StageRequest {
    pub stage: Stage,
    pub system_prompt: String,
    pub user_prompt: String,
}

/// Outcome of one stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageResult {
    pub stage: Stage,
    pub text: String,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl StageResult {
    pub fn success(stage: Stage, text: impl Into<String>) -> Self {
        Self {
            stage,
            text: text.into(),
            succeeded: true,
            error_message: None,
        }
    }

    pub fn failure(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            text: String::new(),
            succeeded: false,
            error_message: Some(message.into()),
        }
    }
}

/// Context visible to a stage's prompt builder
///
/// `history` and `guide` are only filled once the Historian and TourGuide
/// stages have produced them.
#[derive(Debug, Clone, Copy)]
pub struct StageInputs<'a> {
    pub query: &'a str,
    pub persona: &'a PersonaDocument,
    pub history: Option<&'a str>,
    pub guide: Option<&'a str>,
}

/// Builds and executes stage requests against a shared completion client
#[derive(Clone)]
pub struct StageRunner {
    completion: CompletionClient,
    prompts: Arc<PromptSet>,
    pipeline: PipelineConfig,
    master_model: Option<String>,
    options: CompletionOptions,
}

impl StageRunner {
    pub fn new(completion: CompletionClient, prompts: Arc<PromptSet>, pipeline: PipelineConfig) -> Self {
        debug!(location = %pipeline.location, days = %pipeline.days, "StageRunner::new: called");
        Self {
            completion,
            prompts,
            pipeline,
            master_model: None,
            options: CompletionOptions::default(),
        }
    }

    /// Runner with the model and sampling settings from `config`
    pub fn from_config(completion: CompletionClient, prompts: Arc<PromptSet>, config: &Config) -> Self {
        Self::new(completion, prompts, config.pipeline.clone())
            .with_master_model(config.llm.master_model.clone())
            .with_options(CompletionOptions {
                max_tokens: config.llm.max_tokens,
                temperature: config.llm.temperature,
            })
    }

    /// Use a different model for the Master stage
    pub fn with_master_model(mut self, model: impl Into<String>) -> Self {
        self.master_model = Some(model.into());
        self
    }

    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn location(&self) -> &str {
        &self.pipeline.location
    }

    pub fn options(&self) -> CompletionOptions {
        self.options
    }

    fn system_prompt(&self, stage: Stage) -> Result<String, PromptError> {
        let location = self.pipeline.location.as_str();
        match stage {
            Stage::Master => self.prompts.master_system.render(&[]),
            Stage::Historian => self.prompts.historian_system.render(&[("location", location)]),
            Stage::TourGuide => self.prompts.tour_guide_system.render(&[("location", location)]),
            Stage::ItineraryPlanner => self.prompts.planner_system.render(&[("location", location)]),
        }
    }

    /// Build the pipeline form of a stage request
    pub fn build_request(&self, stage: Stage, inputs: &StageInputs<'_>) -> Result<StageRequest, StageError> {
        debug!(%stage, "StageRunner::build_request: called");
        let prompt_err = |source| StageError::Prompt { stage, source };
        let location = self.pipeline.location.as_str();

        let system_prompt = self.system_prompt(stage).map_err(prompt_err)?;
        let user_prompt = match stage {
            Stage::Master => inputs.query.to_string(),
            Stage::Historian => self
                .prompts
                .historian_user
                .render(&[("location", location)])
                .map_err(prompt_err)?,
            Stage::TourGuide => self
                .prompts
                .tour_guide_user
                .render(&[("persona", inputs.persona.prompt_text()), ("location", location)])
                .map_err(prompt_err)?,
            Stage::ItineraryPlanner => {
                let history = inputs.history.ok_or(StageError::MissingInput { stage, input: "history" })?;
                let guide = inputs.guide.ok_or(StageError::MissingInput { stage, input: "guide" })?;
                let days = self.pipeline.days.to_string();
                self.prompts
                    .planner_user
                    .render(&[
                        ("persona", inputs.persona.prompt_text()),
                        ("history", history),
                        ("guide", guide),
                        ("days", &days),
                        ("location", location),
                    ])
                    .map_err(prompt_err)?
            }
        };

        Ok(StageRequest {
            stage,
            system_prompt,
            user_prompt,
        })
    }

    /// Build the direct form: same system prompt, the caller's input as user prompt
    pub fn direct_request(&self, stage: Stage, input: &str) -> Result<StageRequest, StageError> {
        debug!(%stage, input_len = input.len(), "StageRunner::direct_request: called");
        let system_prompt = self
            .system_prompt(stage)
            .map_err(|source| StageError::Prompt { stage, source })?;
        Ok(StageRequest {
            stage,
            system_prompt,
            user_prompt: input.to_string(),
        })
    }

    /// Make the single completion call for a built request
    pub async fn execute(&self, request: StageRequest) -> Result<StageResult, StageError> {
        let stage = request.stage;
        debug!(%stage, user_len = request.user_prompt.len(), "StageRunner::execute: called");
        let model = match stage {
            Stage::Master => self.master_model.as_deref(),
            _ => None,
        };

        let text = self
            .completion
            .complete(
                &request.system_prompt,
                &request.user_prompt,
                self.options,
                model,
                stage.fallback(),
            )
            .await
            .map_err(|source| StageError::Completion { stage, source })?;

        info!(%stage, text_len = text.len(), "Stage completed");
        Ok(StageResult::success(stage, text))
    }

    /// Run a stage in direct form and return its text
    pub async fn run_direct(&self, stage: Stage, input: &str) -> Result<String, StageError> {
        let request = self.direct_request(stage, input)?;
        Ok(self.execute(request).await?.text)
    }
}
