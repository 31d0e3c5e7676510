//! Prompt Loader
//!
//! Loads prompt templates from an override directory or falls back to embedded defaults.

use std::path::{Path, PathBuf};

use eyre::{Context, Result, eyre};
use tracing::{debug, info};

use super::embedded::{self, PROMPTS};
use super::template::PromptTemplate;

/// Where a template's source came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptOrigin {
    Override(PathBuf),
    Embedded,
}

impl std::fmt::Display for PromptOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Override(path) => write!(f, "{}", path.display()),
            Self::Embedded => write!(f, "embedded"),
        }
    }
}

/// Loads prompt templates
pub struct PromptLoader {
    /// Override directory (e.g., `.prahaverse/prompts/`)
    override_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a loader that checks `override_dir` before the embedded defaults
    ///
    /// A directory that does not exist is ignored.
    pub fn new(override_dir: impl AsRef<Path>) -> Self {
        let override_dir = override_dir.as_ref();
        let exists = override_dir.is_dir();
        debug!(?override_dir, %exists, "PromptLoader::new: called");

        Self {
            override_dir: exists.then(|| override_dir.to_path_buf()),
        }
    }

    /// Create a loader that only uses embedded prompts (for testing)
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self { override_dir: None }
    }

    /// Load a template's source by name
    ///
    /// Checks in order:
    /// 1. Override: `{override_dir}/{name}.pmt`
    /// 2. Embedded fallback
    fn load_source(&self, name: &str) -> Result<(String, PromptOrigin)> {
        debug!(%name, "PromptLoader::load_source: called");
        if let Some(ref dir) = self.override_dir {
            let path = dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_source: found override");
                let source = std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read prompt override {}: {}", path.display(), e))?;
                return Ok((source, PromptOrigin::Override(path)));
            }
            debug!(?path, "PromptLoader::load_source: no override");
        }

        if let Some(prompt) = embedded::get_embedded(name) {
            debug!(%name, "PromptLoader::load_source: found in embedded");
            return Ok((prompt.source.to_string(), PromptOrigin::Embedded));
        }

        Err(eyre!("Prompt template not found: {}", name))
    }

    /// Load and validate a template by name against its embedded slot contract
    pub fn load(&self, name: &str) -> Result<PromptTemplate> {
        let contract = embedded::get_embedded(name).ok_or_else(|| eyre!("Prompt template not found: {}", name))?;
        let (source, origin) = self.load_source(name)?;
        info!("Loading prompt '{}' from {}", name, origin);

        PromptTemplate::new(name, &source, contract.slots)
            .with_context(|| format!("Invalid prompt template '{}' ({})", name, origin))
    }

    /// List every known template with the origin it would load from
    pub fn list(&self) -> Vec<(&'static str, PromptOrigin)> {
        PROMPTS
            .iter()
            .map(|p| {
                let origin = self
                    .override_dir
                    .as_ref()
                    .map(|dir| dir.join(format!("{}.pmt", p.name)))
                    .filter(|path| path.exists())
                    .map(PromptOrigin::Override)
                    .unwrap_or(PromptOrigin::Embedded);
                (p.name, origin)
            })
            .collect()
    }
}

/// Every compiled template the service needs, validated up front
#[derive(Debug, Clone)]
pub struct PromptSet {
    pub master_system: PromptTemplate,
    pub historian_system: PromptTemplate,
    pub historian_user: PromptTemplate,
    pub tour_guide_system: PromptTemplate,
    pub tour_guide_user: PromptTemplate,
    pub planner_system: PromptTemplate,
    pub planner_user: PromptTemplate,
    pub photo_director_system: PromptTemplate,
    pub photo_director_user: PromptTemplate,
    pub image_preservation: PromptTemplate,
    pub studio_photo: PromptTemplate,
}

impl PromptSet {
    /// Load every template through `loader`; the first invalid one fails the load
    pub fn load(loader: &PromptLoader) -> Result<Self> {
        debug!("PromptSet::load: called");
        Ok(Self {
            master_system: loader.load("master-system")?,
            historian_system: loader.load("historian-system")?,
            historian_user: loader.load("historian-user")?,
            tour_guide_system: loader.load("tour-guide-system")?,
            tour_guide_user: loader.load("tour-guide-user")?,
            planner_system: loader.load("itinerary-planner-system")?,
            planner_user: loader.load("itinerary-planner-user")?,
            photo_director_system: loader.load("photo-director-system")?,
            photo_director_user: loader.load("photo-director-user")?,
            image_preservation: loader.load("image-preservation")?,
            studio_photo: loader.load("studio-photo")?,
        })
    }

    /// The embedded defaults
    pub fn embedded() -> Result<Self> {
        Self::load(&PromptLoader::embedded_only())
    }
}
