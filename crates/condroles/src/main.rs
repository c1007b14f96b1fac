//! condroles CLI - AsciiDoc conditional preprocessor.
//!
//! Provides commands for:
//! - `process`: Replace `ifdef`/`ifndef` conditionals with roles
//! - `inspect`: Write the parse and the conditionals map for debugging
//! - `roles`: Print the role markup for a set of values

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{InspectArgs, ProcessArgs, RolesArgs};
use output::Output;

/// condroles - Resolve AsciiDoc conditionals into roles.
#[derive(Parser)]
#[command(name = "condroles", version, about)]
struct Cli {
    /// Enable verbose output (debug logging of parser and classifier decisions).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace conditionals with role markup.
    Process(ProcessArgs),
    /// Write the parsed structure and the conditionals map.
    Inspect(InspectArgs),
    /// Print role markup for the given values.
    Roles(RolesArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables DEBUG level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Process(args) => args.execute(),
        Commands::Inspect(args) => args.execute(),
        Commands::Roles(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
