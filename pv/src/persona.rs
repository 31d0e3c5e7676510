//! Persona document sources
//!
//! The persona is a free-form description of the traveller. It is fetched once,
//! by an explicit initialization step, and then handed to the pipeline context.
//! No schema is enforced; the text is interpolated into prompts as-is.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::PersonaConfig;

/// Text used in prompts when the persona document is empty
const EMPTY_PERSONA: &str = "No traveller profile was provided.";

/// Errors raised while fetching a persona document
#[derive(Debug, Error)]
pub enum PersonaError {
    #[error("persona fetch failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("persona fetch returned HTTP {status}")]
    Status { status: u16 },

    #[error("failed to read persona file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// An opaque, immutable persona document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonaDocument(String);

impl PersonaDocument {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Text to interpolate into a prompt
    pub fn prompt_text(&self) -> &str {
        if self.is_empty() { EMPTY_PERSONA } else { &self.0 }
    }
}

/// Where a persona document comes from
#[async_trait]
pub trait PersonaSource: Send + Sync {
    async fn fetch(&self) -> Result<PersonaDocument, PersonaError>;
}

/// Fetches the persona with an HTTP GET (e.g. from a content-store gateway)
pub struct HttpPersonaSource {
    url: String,
    http: reqwest::Client,
}

impl HttpPersonaSource {
    pub fn new(url: impl Into<String>) -> Result<Self, PersonaError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("PrahaVerse/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { url: url.into(), http })
    }
}

#[async_trait]
impl PersonaSource for HttpPersonaSource {
    async fn fetch(&self) -> Result<PersonaDocument, PersonaError> {
        debug!(url = %self.url, "HttpPersonaSource::fetch: called");
        let response = self.http.get(&self.url).send().await?;

        if !response.status().is_success() {
            debug!(status = %response.status(), "HttpPersonaSource::fetch: HTTP error status");
            return Err(PersonaError::Status {
                status: response.status().as_u16(),
            });
        }

        let body = response.text().await?;
        debug!(body_len = %body.len(), "HttpPersonaSource::fetch: body read");
        Ok(PersonaDocument::new(body))
    }
}

/// Reads the persona from a local file
pub struct FilePersonaSource {
    path: PathBuf,
}

impl FilePersonaSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PersonaSource for FilePersonaSource {
    async fn fetch(&self) -> Result<PersonaDocument, PersonaError> {
        debug!(path = ?self.path, "FilePersonaSource::fetch: called");
        let text = tokio::fs::read_to_string(&self.path).await.map_err(|source| PersonaError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(PersonaDocument::new(text))
    }
}

/// A persona known up front
pub struct StaticPersonaSource(PersonaDocument);

impl StaticPersonaSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self(PersonaDocument::new(text))
    }
}

#[async_trait]
impl PersonaSource for StaticPersonaSource {
    async fn fetch(&self) -> Result<PersonaDocument, PersonaError> {
        Ok(self.0.clone())
    }
}

/// Build the configured source; url wins over path, path over inline
///
/// With nothing configured the persona is empty.
pub fn from_config(config: &PersonaConfig) -> Result<Box<dyn PersonaSource>, PersonaError> {
    if let Some(url) = &config.url {
        info!("Persona source: {}", url);
        return Ok(Box::new(HttpPersonaSource::new(url.clone())?));
    }
    if let Some(path) = &config.path {
        info!("Persona source: {}", path.display());
        return Ok(Box::new(FilePersonaSource::new(path.clone())));
    }
    debug!(has_inline = config.inline.is_some(), "from_config: using static persona");
    Ok(Box::new(StaticPersonaSource::new(config.inline.clone().unwrap_or_default())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_prompt_text_placeholder_for_empty() {
        assert_eq!(PersonaDocument::default().prompt_text(), EMPTY_PERSONA);
        assert_eq!(PersonaDocument::new("  \n").prompt_text(), EMPTY_PERSONA);
        assert_eq!(PersonaDocument::new("loves jazz").prompt_text(), "loves jazz");
    }

    #[tokio::test]
    async fn test_http_source_fetches_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ipfs/persona"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"interests": ["castles", "beer"]}"#))
            .expect(1)
            .mount(&server)
            .await;

        let source = HttpPersonaSource::new(format!("{}/ipfs/persona", server.uri())).unwrap();
        let doc = source.fetch().await.unwrap();
        assert!(doc.as_str().contains("castles"));
    }

    #[tokio::test]
    async fn test_http_source_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let source = HttpPersonaSource::new(server.uri()).unwrap();
        let err = source.fetch().await.unwrap_err();
        assert!(matches!(err, PersonaError::Status { status: 404 }));
    }

    #[tokio::test]
    async fn test_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("persona.json");
        std::fs::write(&file, "prefers museums").unwrap();

        let doc = FilePersonaSource::new(&file).fetch().await.unwrap();
        assert_eq!(doc.as_str(), "prefers museums");

        let err = FilePersonaSource::new(dir.path().join("missing.json")).fetch().await.unwrap_err();
        assert!(matches!(err, PersonaError::Io { .. }));
    }

    #[tokio::test]
    async fn test_from_config_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("persona.txt");
        std::fs::write(&file, "from file").unwrap();

        let config = PersonaConfig {
            url: None,
            path: Some(file),
            inline: Some("inline".to_string()),
        };
        let doc = from_config(&config).unwrap().fetch().await.unwrap();
        assert_eq!(doc.as_str(), "from file");

        let config = PersonaConfig {
            inline: Some("inline".to_string()),
            ..Default::default()
        };
        let doc = from_config(&config).unwrap().fetch().await.unwrap();
        assert_eq!(doc.as_str(), "inline");

        let doc = from_config(&PersonaConfig::default()).unwrap().fetch().await.unwrap();
        assert!(doc.is_empty());
    }
}
