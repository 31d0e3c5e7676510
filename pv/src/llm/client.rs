//! LlmClient trait definition

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, LlmError};

/// Stateless LLM client - each call is independent
///
/// Every stage builds its own system and user prompt, so no conversation
/// state is carried between calls.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single completion request and wait for the full response
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::debug;

    /// Canned outcome for one mock call
    #[derive(Debug, Clone)]
    pub enum MockReply {
        Text(String),
        Empty,
        ApiError { status: u16, message: String },
    }

    impl MockReply {
        pub fn text(s: impl Into<String>) -> Self {
            MockReply::Text(s.into())
        }

        fn into_result(self) -> Result<CompletionResponse, LlmError> {
            match self {
                MockReply::Text(t) => Ok(CompletionResponse::text(t)),
                MockReply::Empty => Ok(CompletionResponse::empty()),
                MockReply::ApiError { status, message } => Err(LlmError::ApiError { status, message }),
            }
        }
    }

    /// Mock LLM client for unit tests
    ///
    /// Replies are served in order; once exhausted the `repeat` reply (if any)
    /// is served forever. Every request is recorded.
    pub struct MockLlmClient {
        replies: Mutex<VecDeque<MockReply>>,
        repeat: Option<MockReply>,
        requests: Mutex<Vec<CompletionRequest>>,
        call_count: AtomicUsize,
    }

    impl MockLlmClient {
        pub fn new(replies: Vec<MockReply>) -> Self {
            debug!(reply_count = %replies.len(), "MockLlmClient::new: called");
            Self {
                replies: Mutex::new(replies.into()),
                repeat: None,
                requests: Mutex::new(Vec::new()),
                call_count: AtomicUsize::new(0),
            }
        }

        /// Mock that answers every call with the same reply
        pub fn always(reply: MockReply) -> Self {
            Self {
                repeat: Some(reply),
                ..Self::new(vec![])
            }
        }

        /// Convenience: a sequence of text replies
        pub fn texts(texts: &[&str]) -> Self {
            Self::new(texts.iter().map(|t| MockReply::text(*t)).collect())
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        /// All requests received so far, in call order
        pub fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            debug!(%idx, "MockLlmClient::complete: called");
            self.requests.lock().unwrap().push(request);

            let next = self.replies.lock().unwrap().pop_front().or_else(|| self.repeat.clone());
            match next {
                Some(reply) => reply.into_result(),
                None => {
                    debug!("MockLlmClient::complete: no more mock responses");
                    Err(LlmError::InvalidResponse("No more mock responses".to_string()))
                }
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_client_returns_responses() {
            let client = MockLlmClient::texts(&["Response 1", "Response 2"]);
            let req = CompletionRequest::new("Test", "hello");

            let resp1 = client.complete(req.clone()).await.unwrap();
            assert_eq!(resp1.content, Some("Response 1".to_string()));

            let resp2 = client.complete(req.clone()).await.unwrap();
            assert_eq!(resp2.content, Some("Response 2".to_string()));

            assert_eq!(client.call_count(), 2);
            assert_eq!(client.requests().len(), 2);
        }

        #[tokio::test]
        async fn test_mock_client_errors_when_exhausted() {
            let client = MockLlmClient::new(vec![]);
            let result = client.complete(CompletionRequest::new("Test", "hello")).await;
            assert!(result.is_err());
        }

        #[tokio::test]
        async fn test_mock_client_always_repeats() {
            let client = MockLlmClient::always(MockReply::text("same"));
            for _ in 0..3 {
                let resp = client.complete(CompletionRequest::new("Test", "hello")).await.unwrap();
                assert_eq!(resp.content.as_deref(), Some("same"));
            }
        }
    }
}
