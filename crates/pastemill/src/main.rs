//! Pastemill CLI - text preparation engine.
//!
//! Provides commands for:
//! - `serve`: Start the prepare-text HTTP server
//! - `prepare`: Run the pipeline once over a file or stdin

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{PrepareArgs, ServeArgs};
use output::Output;

/// Pastemill - text preparation engine.
#[derive(Parser)]
#[command(name = "pastemill", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the prepare-text HTTP server.
    Serve(ServeArgs),
    /// Normalize a file or stdin and print the result.
    Prepare(PrepareArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let verbose = matches!(&cli.command, Commands::Serve(args) if args.verbose);
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = match cli.command {
        Commands::Serve(args) => {
            let rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
            rt.block_on(args.execute())
        }
        Commands::Prepare(args) => args.execute(),
    };

    if let Err(error) = result {
        output.error(&format!("Error: {error}"));
        std::process::exit(1);
    }
}
