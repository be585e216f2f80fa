//! Output rendering abstraction for embryo.
//!
//! The loop reports what it is doing through the [`Renderer`] trait and never
//! writes to the terminal itself. [`StdoutRenderer`] prints coloured progress
//! lines around an `indicatif` spinner; [`NullRenderer`] discards everything.

use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::agent::parser::ActionCall;
use crate::constants::OBSERVATION_DISPLAY_CHARS;
use crate::format::truncate_chars;

const SPINNER_TICK_MS: u64 = 120;

/// Receives loop progress for display.
pub trait Renderer: Send + Sync {
    /// The model's reasoning for this turn.
    fn thought(&self, text: &str);

    /// A tool call about to be dispatched.
    fn action(&self, call: &ActionCall);

    /// The observation fed back to the model.
    fn observation(&self, text: &str);

    /// A turn had neither an action nor an answer.
    fn format_error(&self, correction: &str);
}

/// Discards all progress output.
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn thought(&self, _text: &str) {}
    fn action(&self, _call: &ActionCall) {}
    fn observation(&self, _text: &str) {}
    fn format_error(&self, _correction: &str) {}
}

/// Terminal spinner shown while the agent works.
///
/// Cloning shares the same bar.
#[derive(Clone)]
pub struct Spinner {
    bar: ProgressBar,
}

impl Spinner {
    pub fn start(message: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", " "]),
        );
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
        Self { bar }
    }

    /// Hides the spinner while `f` runs, then redraws it.
    pub fn suspend<R>(&self, f: impl FnOnce() -> R) -> R {
        self.bar.suspend(f)
    }

    /// Clears the spinner and stops drawing it until [`Spinner::show`].
    ///
    /// Unlike [`Spinner::suspend`] this holds no lock, so the terminal can be
    /// used from another thread meanwhile.
    pub fn hide(&self) {
        self.bar.disable_steady_tick();
        self.bar.set_draw_target(ProgressDrawTarget::hidden());
    }

    pub fn show(&self) {
        self.bar.set_draw_target(ProgressDrawTarget::stderr());
        self.bar.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// Prints progress lines to stdout, above the spinner when there is one.
///
/// Observations are cut to a short prefix here only; the model always
/// receives the full text.
pub struct StdoutRenderer {
    spinner: Option<Spinner>,
}

impl StdoutRenderer {
    pub fn new(spinner: Option<Spinner>) -> Self {
        Self { spinner }
    }

    fn line(&self, text: String) {
        match self.spinner {
            Some(ref spinner) => spinner.suspend(|| println!("{text}")),
            None => println!("{text}"),
        }
    }
}

impl Renderer for StdoutRenderer {
    fn thought(&self, text: &str) {
        self.line(format!("\n{}", format!("Thought: {text}").dimmed()));
    }

    fn action(&self, call: &ActionCall) {
        self.line(
            format!("Action: {}({})", call.name, call.raw_args)
                .yellow()
                .to_string(),
        );
    }

    fn observation(&self, text: &str) {
        self.line(
            format!(
                "Observation: {}",
                truncate_chars(text, OBSERVATION_DISPLAY_CHARS)
            )
            .magenta()
            .to_string(),
        );
    }

    fn format_error(&self, correction: &str) {
        self.line(format!("System: {correction}").red().to_string());
    }
}
