//! Command-line interface definition and dispatch for embryo.
//!
//! Uses [`clap`] for argument parsing with derive macros. Running tasks and
//! the interactive prompt live in the [`runner`] submodule.

mod runner;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

use crate::{config::Config, provider, telemetry};
use runner::{Outcome, TaskRunner};

/// Top-level CLI structure for embryo.
#[derive(Parser)]
#[command(
    name = "embryo",
    version,
    about = "A local AI agent that reasons and acts on your machine"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Provider to use (anthropic, openai, openrouter, ollama, gemini)
    #[arg(short, long, global = true)]
    pub provider: Option<String>,

    /// Model to use (overrides config; accepts provider/model)
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Iterations a task may take before giving up
    #[arg(long, global = true)]
    pub max_iterations: Option<usize>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available subcommands. Without one, embryo starts the interactive prompt.
#[derive(Subcommand)]
pub enum Commands {
    /// Run a single task and exit
    Run {
        /// The task to perform
        task: Vec<String>,
    },
    /// Start the interactive prompt
    Chat,
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Subcommands for the `config` command.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective config (API keys masked)
    Show,
    /// Print the config file path
    Path,
}

/// Parses command-line arguments into a [`Cli`] struct.
pub fn parse() -> Cli {
    Cli::parse()
}

/// Dispatches the parsed CLI command to its handler.
pub async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    telemetry::init(if cli.verbose { "debug" } else { config.log_level() });

    match cli.command {
        Some(Commands::Config { action }) => {
            match action {
                ConfigAction::Show => {
                    let path = Config::config_path()?;
                    println!("{} {}", "Config path:".bold(), path.display());
                    println!();
                    println!("{}", toml::to_string_pretty(&config.redacted())?);
                }
                ConfigAction::Path => println!("{}", Config::config_path()?.display()),
            }
            Ok(())
        }
        Some(Commands::Run { task }) => {
            let task = task.join(" ");
            if task.trim().is_empty() {
                anyhow::bail!("No task provided. Usage: embryo run \"your task here\"");
            }
            let runner = build_runner(
                cli.provider.as_deref(),
                cli.model.as_deref(),
                cli.max_iterations,
                &config,
            )?;
            if runner.run_once(&task).await == Outcome::Failed {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Commands::Chat) | None => {
            let runner = build_runner(
                cli.provider.as_deref(),
                cli.model.as_deref(),
                cli.max_iterations,
                &config,
            )?;
            runner.repl().await
        }
    }
}

fn build_runner(
    provider_name: Option<&str>,
    model: Option<&str>,
    max_iterations: Option<usize>,
    config: &Config,
) -> Result<TaskRunner> {
    let selection = provider::resolve_model(provider_name, model, config)?;
    let max_iterations = max_iterations
        .filter(|&n| n > 0)
        .unwrap_or_else(|| config.max_iterations());
    TaskRunner::new(config, &selection, max_iterations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_invocation_has_no_subcommand() {
        let cli = Cli::try_parse_from(["embryo"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_run_collects_task_words() {
        let cli = Cli::try_parse_from([
            "embryo", "run", "-p", "gemini", "list", "my", "files",
        ])
        .unwrap();
        assert_eq!(cli.provider.as_deref(), Some("gemini"));
        match cli.command {
            Some(Commands::Run { task }) => assert_eq!(task.join(" "), "list my files"),
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_global_flags_before_subcommand() {
        let cli =
            Cli::try_parse_from(["embryo", "--max-iterations", "3", "-v", "chat"]).unwrap();
        assert_eq!(cli.max_iterations, Some(3));
        assert!(cli.verbose);
        assert!(matches!(cli.command, Some(Commands::Chat)));
    }
}
