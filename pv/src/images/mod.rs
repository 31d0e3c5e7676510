//! Product studio image capabilities
//!
//! Text-to-image generation, image edits, and the fixed prompt wrappers the
//! studio applies before sending anything.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

pub mod client;
mod data_url;
mod error;
mod openai;

#[cfg(test)]
pub use client::mock;
pub use client::ImageClient;
pub use data_url::{DecodedImage, ImageFormat, png_data_url};
pub use error::ImageError;
pub use openai::OpenAIImageClient;

use crate::prompts::{PromptError, PromptSet};

/// Most images one generateImage request may ask for
pub const MAX_OUTPUTS: u8 = 4;

/// Styling line used when a studio request carries no prompt
pub const DEFAULT_STUDIO_PROMPT: &str =
    "Create a professional product photograph with clean background and appealing composition.";

/// Clamp a requested output count into `1..=MAX_OUTPUTS`
pub fn clamp_outputs(requested: i64) -> u8 {
    requested.clamp(1, MAX_OUTPUTS as i64) as u8
}

/// Wrap a generation prompt in the product preservation directive
pub fn preservation_prompt(prompts: &PromptSet, prompt: &str) -> Result<String, PromptError> {
    prompts.image_preservation.render(&[("prompt", prompt)])
}

/// Wrap a studio prompt in the studio directive, defaulting an empty prompt
pub fn studio_prompt(prompts: &PromptSet, prompt: Option<&str>) -> Result<String, PromptError> {
    let prompt = prompt.map(str::trim).filter(|p| !p.is_empty()).unwrap_or(DEFAULT_STUDIO_PROMPT);
    prompts.studio_photo.render(&[("prompt", prompt)])
}

/// Outcome of a batch of independent generations
#[derive(Debug, Default)]
pub struct GenerationBatch {
    /// URLs in request order, empty ones omitted
    pub urls: Vec<String>,
    /// Errors from the generations that failed outright
    pub errors: Vec<ImageError>,
}

/// Issue `count` generations of the same prompt concurrently
pub async fn generate_many(client: &Arc<dyn ImageClient>, prompt: &str, count: u8) -> GenerationBatch {
    debug!(%count, "generate_many: called");
    let calls = (0..count).map(|_| client.generate(prompt));
    let mut batch = GenerationBatch::default();

    for result in join_all(calls).await {
        match result {
            Ok(Some(url)) => batch.urls.push(url),
            Ok(None) => debug!("generate_many: generation returned no url"),
            Err(e) => {
                warn!(error = %e, "generate_many: generation failed");
                batch.errors.push(e);
            }
        }
    }
    batch
}
