//! Entry point for embryo, a local AI agent that reasons and acts in the terminal.
//!
//! This binary loads environment variables, parses CLI arguments via [`cli`],
//! and dispatches to the appropriate subcommand handler.

mod agent;
mod approval;
mod cancel;
mod cli;
mod config;
mod constants;
mod diff;
mod error;
mod format;
mod message;
mod output;
mod prompt;
mod provider;
mod telemetry;
mod tools;

#[cfg(test)]
mod testing;

use anyhow::Result;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = cli::parse();
    cli::run(cli).await
}
