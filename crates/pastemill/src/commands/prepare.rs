//! `pastemill prepare` command implementation.
//!
//! One-shot pipeline run: reads a file (or stdin), prints the cleaned
//! text to stdout, and reports warnings on stderr. With `--json` the
//! full result (cleaned text, outline, stats, warnings) is printed as
//! JSON instead.

use std::io::Read;
use std::path::PathBuf;

use clap::Args;
use pastemill_config::{Config, ConfigError};
use pastemill_core::{HeadingHint, PrepareOptions, TableMode, prepare};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the prepare command.
#[derive(Args)]
pub(crate) struct PrepareArgs {
    /// Input file (reads stdin when omitted).
    file: Option<PathBuf>,

    /// Path to configuration file (default: auto-discover pastemill.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the full result as JSON.
    #[arg(long)]
    json: bool,

    /// Table handling mode (overrides config).
    #[arg(long, value_parser = ["keep", "kv"])]
    table_mode: Option<String>,

    /// Deepest heading level, 1-6 (overrides config).
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=6))]
    max_heading_depth: Option<u8>,

    /// Heading hint; may repeat (literal substring, or /regex/).
    #[arg(long = "heading-hint")]
    heading_hints: Vec<String>,

    /// Split mixed numbered/bulleted blocks into labelled groups.
    #[arg(long)]
    restructure_process_blocks: bool,
}

impl PrepareArgs {
    /// Execute the prepare command.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be read or configuration
    /// loading fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let input = match &self.file {
            Some(path) => std::fs::read_to_string(path)?,
            None => {
                let mut buffer = String::new();
                std::io::stdin().read_to_string(&mut buffer)?;
                buffer
            }
        };

        let options = self.resolve_options()?;
        let result = prepare(&input, &options);

        let stdout = console::Term::stdout();
        if self.json {
            let json = serde_json::to_string_pretty(&result)
                .map_err(|e| CliError::Server(e.to_string()))?;
            stdout.write_line(&json)?;
        } else {
            stdout.write_line(&result.cleaned_text)?;
            for warning in &result.warnings {
                output.warning(warning);
            }
        }

        Ok(())
    }

    /// Merge config-file defaults with CLI overrides.
    fn resolve_options(&self) -> Result<PrepareOptions, ConfigError> {
        let config = Config::load(self.config.as_deref(), None)?;
        let mut options = config.prepare.to_options();

        if let Some(mode) = &self.table_mode {
            options.table_mode = if mode == "kv" { TableMode::Kv } else { TableMode::Keep };
        }
        if let Some(depth) = self.max_heading_depth {
            options.max_heading_depth = depth;
        }
        if !self.heading_hints.is_empty() {
            options.heading_hints = self
                .heading_hints
                .iter()
                .map(|hint| HeadingHint::from_spec(hint))
                .collect();
        }
        if self.restructure_process_blocks {
            options.restructure_process_blocks = true;
        }

        Ok(options)
    }
}
