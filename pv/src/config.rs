//! PrahaVerse configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Main PrahaVerse configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chat-completion provider configuration
    pub llm: LlmConfig,

    /// Image generation configuration
    pub images: ImageConfig,

    /// HTTP server configuration
    pub server: ServerConfig,

    /// Where the persona document comes from
    pub persona: PersonaConfig,

    /// Itinerary pipeline parameters
    pub pipeline: PipelineConfig,

    /// Prompt template configuration
    pub prompts: PromptsConfig,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Checks that the API key environment variable is set. The server still
    /// starts without it; request handlers then answer with a configuration error.
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_key().is_none() {
            return Err(eyre::eyre!(
                "API key not found. Set the {} environment variable.",
                self.llm.api_key_env
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .prahaverse.yml
        let local_config = PathBuf::from(".prahaverse.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/prahaverse/prahaverse.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("prahaverse").join("prahaverse.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is initialized
    ///
    /// Errors are swallowed; the full load reports them once logging is up.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = match config_path {
            Some(path) => vec![path.clone()],
            None => {
                let mut paths = vec![PathBuf::from(".prahaverse.yml")];
                if let Some(config_dir) = dirs::config_dir() {
                    paths.push(config_dir.join("prahaverse").join("prahaverse.yml"));
                }
                paths
            }
        };

        candidates
            .iter()
            .find(|p| p.exists())
            .and_then(|p| Self::load_from_file(p).ok())
            .and_then(|c| c.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Chat-completion provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name (only "openai" is supported)
    pub provider: String,

    /// Model used by every stage except Master
    pub model: String,

    /// Model used by the Master stage
    #[serde(rename = "master-model")]
    pub master_model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f64,

    /// Transport timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
            master_model: "gpt-4".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: "https://api.openai.com".to_string(),
            max_tokens: 1000,
            temperature: 0.7,
            timeout_ms: 120_000,
        }
    }
}

impl LlmConfig {
    /// Read the API key from the configured environment variable
    ///
    /// Blank values count as missing.
    pub fn api_key(&self) -> Option<String> {
        debug!(api_key_env = %self.api_key_env, "LlmConfig::api_key: called");
        std::env::var(&self.api_key_env).ok().filter(|k| !k.trim().is_empty())
    }
}

/// Image generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Text-to-image model
    #[serde(rename = "generation-model")]
    pub generation_model: String,

    /// Image edit model used by the product studio
    #[serde(rename = "edit-model")]
    pub edit_model: String,

    /// Output size for generated images
    pub size: String,

    /// Generation style
    pub style: String,

    /// Generation quality
    pub quality: String,

    /// Edit quality
    #[serde(rename = "edit-quality")]
    pub edit_quality: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            generation_model: "dall-e-3".to_string(),
            edit_model: "gpt-image-1".to_string(),
            size: "1024x1024".to_string(),
            style: "natural".to_string(),
            quality: "hd".to_string(),
            edit_quality: "low".to_string(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,

    /// Listen port
    pub port: u16,

    /// Allow cross-origin requests from any origin
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            cors: false,
        }
    }
}

/// Persona document source; the first one set wins (url, path, inline)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaConfig {
    /// Remote content-store URL
    pub url: Option<String>,

    /// Local file
    pub path: Option<PathBuf>,

    /// Inline persona text
    pub inline: Option<String>,
}

/// Itinerary pipeline parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Location the Historian researches
    pub location: String,

    /// Trip length the planner must cover
    pub days: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            location: "Prague".to_string(),
            days: 3,
        }
    }
}

/// Prompt template configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// Directory searched for `{name}.pmt` overrides before the embedded defaults
    #[serde(rename = "override-dir")]
    pub override_dir: PathBuf,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            override_dir: PathBuf::from(".prahaverse/prompts"),
        }
    }
}
