//! Prompt Template System
//!
//! Loads and renders `.pmt` (prompt template) files for every stage and image request.
//!
//! Template loading chain:
//! 1. `{override-dir}/{name}.pmt` (user override, default `.prahaverse/prompts/`)
//! 2. Embedded fallback in code
//!
//! Templates use Handlebars syntax for slot substitution.

pub mod embedded;
mod loader;
mod template;

pub use loader::{PromptLoader, PromptOrigin, PromptSet};
pub use template::{PromptError, PromptTemplate};
