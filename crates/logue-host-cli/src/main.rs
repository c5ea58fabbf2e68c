//! unit-host - batch front-end for the logue unit host.

mod commands;
mod wav;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::Level;

#[derive(Parser)]
#[command(name = "unit-host")]
#[command(author, version, about = "Load, drive and profile drumlogue units", long_about = None)]
struct Cli {
    /// Log debug output (capability probing, skipped events, timings)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a unit over a WAV file (or silence)
    Run(commands::run::RunArgs),

    /// Print a unit's identity, parameters and entry points
    Info(commands::info::InfoArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Info(args) => commands::info::run(args),
    };

    match result {
        Ok(outcome) => outcome.exit_code(),
        Err(err) => {
            eprintln!("Error: {err:#}");
            commands::exit_code_for(&err)
        }
    }
}
