//! Prompt template value objects
//!
//! A `PromptTemplate` is compiled and checked once, when it is built: the
//! source must parse, every declared slot must be referenced, and nothing
//! outside the declared slots may be referenced. Rendering then only has to
//! check that the caller supplied exactly the declared slots.

use std::fmt;
use std::sync::Arc;

use handlebars::Handlebars;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

/// Errors raised while building or rendering a template
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("template '{name}' does not parse: {message}")]
    Parse { name: String, message: String },

    #[error("template '{name}' references an undeclared slot: {message}")]
    UndeclaredSlot { name: String, message: String },

    #[error("template '{name}' never uses declared slot '{slot}'")]
    UnusedSlot { name: String, slot: String },

    #[error("template '{name}' is missing a value for slot '{slot}'")]
    MissingSlot { name: String, slot: String },

    #[error("template '{name}' has no slot named '{slot}'")]
    UnknownSlot { name: String, slot: String },

    #[error("template '{name}' failed to render: {message}")]
    Render { name: String, message: String },
}

/// An immutable, validated prompt template with named slots
#[derive(Clone)]
pub struct PromptTemplate {
    name: String,
    slots: Vec<String>,
    registry: Arc<Handlebars<'static>>,
}

impl PromptTemplate {
    /// Compile `source` and validate it against the declared `slots`
    pub fn new(name: &str, source: &str, slots: &[&str]) -> Result<Self, PromptError> {
        debug!(%name, ?slots, source_len = source.len(), "PromptTemplate::new: called");
        let mut hbs = Handlebars::new();
        hbs.set_strict_mode(true);
        hbs.register_escape_fn(handlebars::no_escape);
        hbs.register_template_string(name, source).map_err(|e| PromptError::Parse {
            name: name.to_string(),
            message: e.to_string(),
        })?;

        // Render once with a marker per slot: strict mode rejects anything
        // undeclared, and every marker must show up in the output.
        let mut sample = Map::new();
        for slot in slots {
            sample.insert(slot.to_string(), Value::String(slot_marker(slot)));
        }
        let rendered = hbs.render(name, &Value::Object(sample)).map_err(|e| {
            debug!(%name, error = %e, "PromptTemplate::new: sample render failed");
            PromptError::UndeclaredSlot {
                name: name.to_string(),
                message: e.to_string(),
            }
        })?;

        if let Some(unused) = slots.iter().find(|s| !rendered.contains(&slot_marker(s))) {
            return Err(PromptError::UnusedSlot {
                name: name.to_string(),
                slot: unused.to_string(),
            });
        }

        Ok(Self {
            name: name.to_string(),
            slots: slots.iter().map(|s| s.to_string()).collect(),
            registry: Arc::new(hbs),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slots(&self) -> &[String] {
        &self.slots
    }

    /// Render with exactly the declared slots; values are inserted verbatim
    ///
    /// Trailing whitespace from the template file is trimmed.
    pub fn render(&self, values: &[(&str, &str)]) -> Result<String, PromptError> {
        debug!(name = %self.name, value_count = values.len(), "PromptTemplate::render: called");
        let mut data = Map::new();
        for (key, value) in values {
            if !self.slots.iter().any(|s| s == key) {
                return Err(PromptError::UnknownSlot {
                    name: self.name.clone(),
                    slot: key.to_string(),
                });
            }
            data.insert(key.to_string(), Value::String(value.to_string()));
        }

        if let Some(missing) = self.slots.iter().find(|s| !data.contains_key(s.as_str())) {
            return Err(PromptError::MissingSlot {
                name: self.name.clone(),
                slot: missing.clone(),
            });
        }

        let rendered = self
            .registry
            .render(&self.name, &Value::Object(data))
            .map_err(|e| PromptError::Render {
                name: self.name.clone(),
                message: e.to_string(),
            })?;
        Ok(rendered.trim_end().to_string())
    }
}

impl fmt::Debug for PromptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromptTemplate")
            .field("name", &self.name)
            .field("slots", &self.slots)
            .finish()
    }
}

fn slot_marker(slot: &str) -> String {
    format!("\u{1}slot:{slot}\u{1}")
}
