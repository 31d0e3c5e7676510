//! PrahaVerse - Prague itinerary service
//!
//! CLI entry point: serve the HTTP API, run one pipeline, or inspect prompts.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{CommandFactory, FromArgMatches};
use colored::Colorize;
use eyre::{Context, Result, eyre};
use tracing::{debug, info};

use prahaverse::cli::{Cli, Command, config_path_from_args, generate_after_help};
use prahaverse::config::Config;
use prahaverse::llm::{CompletionClient, create_client};
use prahaverse::persona::{self, FilePersonaSource, PersonaSource};
use prahaverse::pipeline::{Orchestrator, PipelineContext, PipelineRun};
use prahaverse::prompts::{PromptLoader, PromptSet};
use prahaverse::server::{self, AppState};
use prahaverse::stages::StageRunner;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("prahaverse")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level_str = cli_log_level.or(config_log_level);
    let level = match level_str.map(|s| s.to_uppercase()) {
        Some(s) => match s.as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("prahaverse.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Credential status for --help comes from the config the command line names
    let help_config_path = config_path_from_args(std::env::args());
    let help_config = Config::load(help_config_path.as_ref()).unwrap_or_default();
    let cmd = Cli::command().after_help(generate_after_help(&help_config));
    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!("PrahaVerse loaded config: model={}", config.llm.model);

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::Serve { host, port }) => {
            debug!(?host, ?port, "main: matched Serve command");
            cmd_serve(config, host, port).await
        }
        Some(Command::Plan {
            query,
            persona_file,
            json,
        }) => {
            debug!(%query, ?persona_file, json, "main: matched Plan command");
            cmd_plan(&config, &query, persona_file.as_deref(), json).await
        }
        Some(Command::Prompts) => {
            debug!("main: matched Prompts command");
            cmd_prompts(&config)
        }
        None => {
            debug!("main: no command specified, serving");
            cmd_serve(config, None, None).await
        }
    }
}

fn load_prompts(config: &Config) -> Result<Arc<PromptSet>> {
    let loader = PromptLoader::new(&config.prompts.override_dir);
    let prompts = PromptSet::load(&loader).context("Failed to load prompt templates")?;
    Ok(Arc::new(prompts))
}

/// Start the HTTP server
async fn cmd_serve(mut config: Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    debug!("cmd_serve: called");
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    if let Err(e) = config.validate() {
        println!("{} {}", "warning:".yellow().bold(), e);
    }

    let prompts = load_prompts(&config)?;
    let source = persona::from_config(&config.persona).context("Failed to create persona source")?;
    let context = PipelineContext::initialize(source.as_ref())
        .await
        .context("Failed to fetch persona")?;

    let state = AppState::from_config(&config, prompts, context)?;
    server::start_server(&config.server, Arc::new(state)).await
}

/// Run the pipeline once from the terminal
async fn cmd_plan(config: &Config, query: &str, persona_file: Option<&Path>, json: bool) -> Result<()> {
    debug!(%query, "cmd_plan: called");
    config.validate()?;

    let prompts = load_prompts(config)?;
    let source: Box<dyn PersonaSource> = match persona_file {
        Some(path) => Box::new(FilePersonaSource::new(path)),
        None => persona::from_config(&config.persona).context("Failed to create persona source")?,
    };
    let context = PipelineContext::initialize(source.as_ref())
        .await
        .context("Failed to fetch persona")?;

    let llm = create_client(&config.llm).context("Failed to create completion client")?;
    let runner = StageRunner::from_config(CompletionClient::new(llm), prompts, config);
    let orchestrator = Orchestrator::new(runner, context);

    if !json {
        println!("{} {}", "Planning:".cyan().bold(), query);
    }
    let run = orchestrator.run(query).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&run)?);
    } else {
        print_run(&run);
    }

    run.outcome()
        .map(|_| ())
        .map_err(|e| eyre!("Pipeline run {} failed: {}", run.id, e))
}

fn print_run(run: &PipelineRun) {
    for result in &run.results {
        if result.succeeded {
            println!("  {} {:<18} {} chars", "\u{2713}".green(), result.stage.name(), result.text.len());
        } else {
            println!(
                "  {} {:<18} {}",
                "\u{2717}".red(),
                result.stage.name(),
                result.error_message.as_deref().unwrap_or("failed")
            );
        }
    }

    if let Ok(itinerary) = run.outcome() {
        println!();
        println!("{}", itinerary);
    }
    if let Some(ms) = run.duration_ms() {
        println!();
        println!("{} {} ({} ms)", "Run".dimmed(), run.id.to_string().dimmed(), ms);
    }
}

/// List prompt templates and their origin
fn cmd_prompts(config: &Config) -> Result<()> {
    debug!("cmd_prompts: called");
    let loader = PromptLoader::new(&config.prompts.override_dir);

    for (name, origin) in loader.list() {
        let origin = origin.to_string();
        let origin = if origin == "embedded" {
            origin.dimmed()
        } else {
            origin.yellow()
        };
        println!("{:<28} {}", name.bold(), origin);
    }

    // Surface broken overrides here rather than at server start
    PromptSet::load(&loader).context("Prompt templates failed validation")?;
    println!();
    println!("{}", "All prompt templates are valid.".green());
    Ok(())
}
