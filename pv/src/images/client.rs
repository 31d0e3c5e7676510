//! ImageClient trait

use async_trait::async_trait;

use super::{DecodedImage, ImageError};

/// Text-to-image generation and image edits
#[async_trait]
pub trait ImageClient: Send + Sync {
    /// Generate one image; `Ok(None)` when the remote answered without a URL
    async fn generate(&self, prompt: &str) -> Result<Option<String>, ImageError>;

    /// Edit `images` according to `prompt`; returns base64 PNG data
    async fn edit(&self, images: Vec<DecodedImage>, prompt: &str, n: u8) -> Result<String, ImageError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::debug;

    /// Canned outcome for one mock generation
    #[derive(Debug, Clone)]
    pub enum MockImage {
        Url(String),
        NoUrl,
        ApiError { status: u16, message: String },
    }

    /// Mock image client recording every call
    pub struct MockImageClient {
        generations: Mutex<VecDeque<MockImage>>,
        edit_reply: Result<String, String>,
        edit_api_error: Option<(u16, String)>,
        generate_calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        edits: Mutex<Vec<(Vec<DecodedImage>, String, u8)>>,
        prompts: Mutex<Vec<String>>,
    }

    impl MockImageClient {
        pub fn new(generations: Vec<MockImage>) -> Self {
            debug!(count = %generations.len(), "MockImageClient::new: called");
            Self {
                generations: Mutex::new(generations.into()),
                edit_reply: Ok("aW1hZ2U=".to_string()),
                edit_api_error: None,
                generate_calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                edits: Mutex::new(Vec::new()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn with_edit_reply(mut self, reply: Result<&str, &str>) -> Self {
            self.edit_reply = reply.map(str::to_string).map_err(str::to_string);
            self
        }

        /// Make every edit fail as the remote API would
        pub fn with_edit_api_error(mut self, status: u16, message: &str) -> Self {
            self.edit_api_error = Some((status, message.to_string()));
            self
        }

        pub fn generate_calls(&self) -> usize {
            self.generate_calls.load(Ordering::SeqCst)
        }

        /// Highest number of generations seen running at the same time
        pub fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }

        pub fn edits(&self) -> Vec<(Vec<DecodedImage>, String, u8)> {
            self.edits.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ImageClient for MockImageClient {
        async fn generate(&self, prompt: &str) -> Result<Option<String>, ImageError> {
            self.generate_calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            // Yield so concurrent callers overlap
            tokio::task::yield_now().await;
            tokio::task::yield_now().await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            let next = self.generations.lock().unwrap().pop_front().unwrap_or(MockImage::NoUrl);
            match next {
                MockImage::Url(url) => Ok(Some(url)),
                MockImage::NoUrl => Ok(None),
                MockImage::ApiError { status, message } => Err(ImageError::ApiError { status, message }),
            }
        }

        async fn edit(&self, images: Vec<DecodedImage>, prompt: &str, n: u8) -> Result<String, ImageError> {
            self.edits.lock().unwrap().push((images, prompt.to_string(), n));
            if let Some((status, message)) = self.edit_api_error.clone() {
                return Err(ImageError::ApiError { status, message });
            }
            self.edit_reply.clone().map_err(ImageError::InvalidResponse)
        }
    }
}
