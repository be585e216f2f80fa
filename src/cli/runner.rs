//! Task execution for the CLI: one-shot runs and the interactive prompt.
//!
//! A [`TaskRunner`] owns the provider, tools and approval gate for the whole
//! process. Each task gets a fresh cancellation token from the [`TaskSlot`];
//! Ctrl+C cancels the running task, or exits when nothing is running.

use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{debug, info, warn};

use crate::agent::AgentLoop;
use crate::approval::TerminalApprovalGate;
use crate::cancel::TaskSlot;
use crate::config::Config;
use crate::constants::HISTORY_FILENAME;
use crate::format;
use crate::output::{Spinner, StdoutRenderer};
use crate::prompt;
use crate::provider::{ModelSelection, Provider};
use crate::tools::ToolRegistry;

/// How a task ended, as far as the shell cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Answered,
    Cancelled,
    Failed,
}

pub struct TaskRunner {
    provider: Provider,
    tools: ToolRegistry,
    gate: TerminalApprovalGate,
    slot: Arc<TaskSlot>,
    max_iterations: usize,
}

impl TaskRunner {
    pub fn new(config: &Config, selection: &ModelSelection, max_iterations: usize) -> Result<Self> {
        let provider = Provider::from_config(config, selection)?;
        let working_dir = std::env::current_dir()?;
        let tools = ToolRegistry::with_builtins(
            working_dir,
            &config.permissions,
            config.command_timeout(),
        );
        info!(
            provider = %provider.kind(),
            model = %provider.model(),
            tools = ?tools.names(),
            "runner ready"
        );
        if tools.is_empty() {
            warn!("every tool is denied by config");
        }

        let runner = Self {
            provider,
            tools,
            gate: TerminalApprovalGate::new(),
            slot: TaskSlot::new(),
            max_iterations,
        };
        runner.spawn_interrupt_listener();
        Ok(runner)
    }

    /// Ctrl+C cancels the active task; with no task running it exits.
    fn spawn_interrupt_listener(&self) {
        let slot = Arc::clone(&self.slot);
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if !slot.cancel_active() {
                    eprintln!("{}", "\nExiting...".yellow());
                    std::process::exit(130);
                }
            }
        });
    }

    fn banner(&self) -> String {
        format!(
            "[provider: {}] [model: {}]",
            self.provider.kind().to_string().yellow(),
            self.provider.model().yellow()
        )
    }

    /// Runs one task to completion and reports the result on the terminal.
    pub async fn run_task(&self, task: &str) -> Outcome {
        let guard = self.slot.begin();
        let spinner = Spinner::start("Agent is thinking...");
        let renderer = StdoutRenderer::new(Some(spinner.clone()));
        let gate = self.gate.with_spinner(spinner.clone());

        let result = AgentLoop::new(&self.provider, &self.tools, &gate)
            .with_renderer(&renderer)
            .with_system_prompt(prompt::system_prompt(&self.tools))
            .with_max_iterations(self.max_iterations)
            .run(task, guard.token())
            .await;
        spinner.finish();
        drop(guard);

        match result {
            Ok(answer) => {
                println!(
                    "\n{} {}\n",
                    "Embryo:".blue().bold(),
                    format::render_markdown_lite(&answer)
                );
                Outcome::Answered
            }
            Err(e) if e.is_cancelled() => {
                println!("{}", "Task cancelled.".yellow());
                // Drop anything a tool left open mid-task.
                self.tools.shutdown().await;
                Outcome::Cancelled
            }
            Err(e) => {
                eprintln!("{}", "An error occurred.".red().bold());
                eprintln!("{}", format!("{e}").red());
                Outcome::Failed
            }
        }
    }

    /// `embryo run <task>`.
    pub async fn run_once(&self, task: &str) -> Outcome {
        println!(
            "\n{} {} {}",
            "--- Running Task:".cyan().bold(),
            task,
            "---".cyan().bold()
        );
        println!("{}", self.banner().dimmed());
        println!("{}\n", "Press Ctrl+C to cancel the task.".dimmed());

        let outcome = self.run_task(task).await;
        self.tools.shutdown().await;
        outcome
    }

    /// The interactive prompt. `exit`, `quit`, Ctrl+D and Ctrl+C leave.
    pub async fn repl(&self) -> Result<()> {
        println!("\n{}", "Welcome to Embryo - Your Local AI Agent".cyan().bold());
        println!("{}", self.banner().dimmed());
        println!(
            "{}\n",
            "Type 'exit' to quit. Press Ctrl+C to cancel a running task.".dimmed()
        );

        let mut rl = DefaultEditor::new()?;
        let history_path = Config::cache_dir()?.join(HISTORY_FILENAME);
        if history_path.exists() {
            let _ = rl.load_history(&history_path);
        }

        loop {
            match rl.readline(&format!("{} ", "What should I do?".green())) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
                        break;
                    }
                    let _ = rl.add_history_entry(line);
                    let outcome = self.run_task(line).await;
                    debug!(?outcome, "task done");
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(e) => {
                    eprintln!("{} {}", "error:".red().bold(), e);
                    break;
                }
            }
        }

        if let Some(parent) = history_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let _ = rl.save_history(&history_path);

        println!("{}", "Exiting...".yellow());
        self.tools.shutdown().await;
        Ok(())
    }
}
