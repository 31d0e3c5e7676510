//! OpenAI Images API client
//!
//! Generations go to `/v1/images/generations` as JSON; edits go to
//! `/v1/images/edits` as multipart with one `image[]` part per input image.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, info};

use super::{DecodedImage, ImageClient, ImageError};
use crate::config::{ImageConfig, LlmConfig};

const GENERIC_GENERATE_ERROR: &str = "Failed to generate image";
const GENERIC_EDIT_ERROR: &str = "Failed to generate studio photo";

/// OpenAI image client
pub struct OpenAIImageClient {
    api_key: String,
    base_url: String,
    http: Client,
    config: ImageConfig,
}

impl OpenAIImageClient {
    /// Create a client sharing the completion provider's key, base URL and timeout
    pub fn from_config(llm: &LlmConfig, images: &ImageConfig) -> Result<Self, ImageError> {
        debug!(base_url = %llm.base_url, "OpenAIImageClient::from_config: called");
        let api_key = llm
            .api_key()
            .ok_or_else(|| ImageError::MissingApiKey(llm.api_key_env.clone()))?;
        Self::new(
            api_key,
            &llm.base_url,
            images.clone(),
            Duration::from_millis(llm.timeout_ms),
        )
    }

    pub fn new(
        api_key: impl Into<String>,
        base_url: &str,
        config: ImageConfig,
        timeout: Duration,
    ) -> Result<Self, ImageError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            config,
        })
    }

    fn generation_body(&self, prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.config.generation_model,
            "prompt": prompt,
            "size": self.config.size,
            "style": self.config.style,
            "quality": self.config.quality,
            "response_format": "url",
            "n": 1,
        })
    }

    fn edit_form(&self, images: Vec<DecodedImage>, prompt: &str, n: u8) -> Result<Form, ImageError> {
        let mut form = Form::new()
            .text("model", self.config.edit_model.clone())
            .text("prompt", prompt.to_string())
            .text("quality", self.config.edit_quality.clone())
            .text("n", n.to_string());

        for (idx, image) in images.into_iter().enumerate() {
            let file_name = format!("image-{}.{}", idx, image.format.extension());
            let part = Part::bytes(image.bytes)
                .file_name(file_name)
                .mime_str(image.format.mime_type())
                .map_err(|e| ImageError::InvalidImage(format!("Failed to create multipart: {}", e)))?;
            form = form.part("image[]", part);
        }
        Ok(form)
    }
}

#[async_trait]
impl ImageClient for OpenAIImageClient {
    async fn generate(&self, prompt: &str) -> Result<Option<String>, ImageError> {
        debug!(prompt_len = prompt.len(), "OpenAIImageClient::generate: called");
        let url = format!("{}/v1/images/generations", self.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.generation_body(prompt))
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        if !(200..300).contains(&status) {
            debug!(%status, "OpenAIImageClient::generate: error status");
            return Err(ImageError::from_api_body(status, &text, GENERIC_GENERATE_ERROR));
        }

        let parsed: ImagesResponse = serde_json::from_str(&text)
            .map_err(|e| ImageError::InvalidResponse(format!("Failed to parse image response: {}", e)))?;
        Ok(parsed.data.into_iter().next().and_then(|d| d.url).filter(|u| !u.is_empty()))
    }

    async fn edit(&self, images: Vec<DecodedImage>, prompt: &str, n: u8) -> Result<String, ImageError> {
        debug!(image_count = images.len(), %n, "OpenAIImageClient::edit: called");
        let url = format!("{}/v1/images/edits", self.base_url);
        let form = self.edit_form(images, prompt, n)?;
        let start = Instant::now();

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        info!(%status, elapsed_ms = %start.elapsed().as_millis(), "Image edit completed");
        if !(200..300).contains(&status) {
            return Err(ImageError::from_api_body(status, &text, GENERIC_EDIT_ERROR));
        }

        let parsed: ImagesResponse = serde_json::from_str(&text)
            .map_err(|e| ImageError::InvalidResponse(format!("Failed to parse image response: {}", e)))?;
        parsed
            .data
            .into_iter()
            .next()
            .and_then(|d| d.b64_json)
            .filter(|b| !b.is_empty())
            .ok_or_else(|| ImageError::InvalidResponse("No image was generated".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
    b64_json: Option<String>,
}
