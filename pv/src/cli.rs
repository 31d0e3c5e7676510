//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::config::Config;

/// PrahaVerse - personalized Prague itineraries from a multi-stage LLM pipeline
#[derive(Parser)]
#[command(
    name = "pv",
    about = "Personalized Prague itineraries from a multi-stage LLM pipeline",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Address to bind (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run the full itinerary pipeline once and print the result
    Plan {
        /// What the traveller is asking for
        query: String,

        /// Read the persona from this file instead of the configured source
        #[arg(long, value_name = "FILE")]
        persona_file: Option<PathBuf>,

        /// Print the run as JSON
        #[arg(long)]
        json: bool,
    },

    /// List prompt templates and where each one loads from
    Prompts,
}

/// Find the `--config` value in raw arguments, before clap has parsed them
///
/// `--help` output is built ahead of parsing, so the config it reports on has
/// to be located by hand.
pub fn config_path_from_args<I>(args: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "--" {
            break;
        }
        if arg == "-c" || arg == "--config" {
            return args.next().map(PathBuf::from);
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            return Some(PathBuf::from(path));
        }
    }
    None
}

/// Get the path to the log file
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("prahaverse")
        .join("logs")
        .join("prahaverse.log");
    debug!(?path, "get_log_path: returning path");
    path
}

/// Generate the after_help text with credential status and the log location
pub fn generate_after_help(config: &Config) -> String {
    debug!("generate_after_help: called");
    let mut help = String::new();

    help.push_str("Credentials:\n");
    let (icon, status) = if config.llm.api_key().is_some() {
        ("\u{2705}", "set")
    } else {
        ("\u{274C}", "not set")
    };
    help.push_str(&format!("  {} {:<16} {}\n", icon, config.llm.api_key_env, status));

    help.push('\n');
    help.push_str(&format!("Logs are written to: {}\n", get_log_path().display()));

    debug!("generate_after_help: returning help text");
    help
}
