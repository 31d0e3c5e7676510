//! PrahaVerse - personalized Prague itineraries
//!
//! A request runs through a fixed pipeline of chat-completion stages: Master
//! classifies the query, the Historian writes the city's history, the Tour
//! Guide recommends places for the traveller's persona, and the Itinerary
//! Planner combines all of it into a multi-day plan. A product studio
//! composes product photos through the image APIs.
//!
//! # Modules
//!
//! - [`llm`] - Completion client trait, OpenAI implementation, fallback policy
//! - [`prompts`] - Validated prompt templates with embedded defaults and overrides
//! - [`persona`] - Persona document sources (HTTP, file, inline)
//! - [`stages`] - Per-stage prompt building and execution
//! - [`pipeline`] - The orchestrator and its state machine
//! - [`images`] - Image generation and edits for the product studio
//! - [`server`] - HTTP handlers
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod images;
pub mod llm;
pub mod persona;
pub mod pipeline;
pub mod prompts;
pub mod server;
pub mod stages;

pub use config::Config;
pub use pipeline::{Orchestrator, PipelineContext, PipelineRun, PipelineState};
pub use stages::{Stage, StageResult};
