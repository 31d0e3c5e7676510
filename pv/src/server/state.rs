//! Shared server state
//!
//! Built once at startup and never mutated; every request sees the same `Arc`.

use std::sync::Arc;

use eyre::{Context, Result};
use tracing::{debug, info, warn};

use super::error::{ApiError, MISSING_API_KEY};
use crate::config::Config;
use crate::images::{ImageClient, OpenAIImageClient};
use crate::llm::{self, CompletionClient, CompletionOptions};
use crate::pipeline::{Orchestrator, PipelineContext};
use crate::prompts::PromptSet;
use crate::stages::StageRunner;

/// Remote-backed services; absent when no API credential is configured
#[derive(Clone)]
pub struct Backend {
    pub orchestrator: Orchestrator,
    pub completion: CompletionClient,
    pub images: Arc<dyn ImageClient>,
    pub options: CompletionOptions,
}

impl Backend {
    pub fn runner(&self) -> &StageRunner {
        self.orchestrator.runner()
    }
}

pub struct AppState {
    pub prompts: Arc<PromptSet>,
    backend: Option<Backend>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(prompts: Arc<PromptSet>, backend: Option<Backend>) -> Self {
        Self { prompts, backend }
    }

    /// Build the real OpenAI-backed state
    ///
    /// A missing API key is not fatal: the server starts and the handlers that
    /// need the remote answer with a configuration error.
    pub fn from_config(config: &Config, prompts: Arc<PromptSet>, context: PipelineContext) -> Result<Self> {
        debug!("AppState::from_config: called");
        if config.llm.api_key().is_none() {
            warn!(
                "{} is not set; remote-backed endpoints will answer with a configuration error",
                config.llm.api_key_env
            );
            return Ok(Self::new(prompts, None));
        }

        let llm = llm::create_client(&config.llm).context("Failed to create completion client")?;
        let images = OpenAIImageClient::from_config(&config.llm, &config.images)
            .context("Failed to create image client")?;
        let backend = Backend::new(
            CompletionClient::new(llm),
            Arc::new(images),
            prompts.clone(),
            config,
            context,
        );
        info!(model = %config.llm.model, master_model = %config.llm.master_model, "Backend ready");
        Ok(Self::new(prompts, Some(backend)))
    }

    /// The backend, or the configuration error handlers should return
    pub fn backend(&self) -> Result<&Backend, ApiError> {
        self.backend
            .as_ref()
            .ok_or_else(|| ApiError::Configuration(MISSING_API_KEY.to_string()))
    }
}

impl Backend {
    pub fn new(
        completion: CompletionClient,
        images: Arc<dyn ImageClient>,
        prompts: Arc<PromptSet>,
        config: &Config,
        context: PipelineContext,
    ) -> Self {
        let runner = StageRunner::from_config(completion.clone(), prompts, config);
        let options = runner.options();
        Self {
            orchestrator: Orchestrator::new(runner, context),
            completion,
            images,
            options,
        }
    }
}
