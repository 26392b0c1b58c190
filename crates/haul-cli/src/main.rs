//! # haul CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use haul_cli::compliance::{run_compliance, ComplianceArgs};
use haul_cli::pay::{run_pay, PayArgs};
use haul_cli::settle::{run_settle, SettleArgs};

/// Haul CLI
///
/// Offline tools for owner-operator carriers: quote driver pay, settle a
/// trip from an exported bundle, and check fleet credential expirations.
#[derive(Parser, Debug)]
#[command(name = "haul", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Gross driver pay for one set of trip figures.
    Pay(PayArgs),

    /// Trip financials and settlement preview from a JSON bundle.
    Settle(SettleArgs),

    /// Credential expiration report from a JSON fleet file.
    Compliance(ComplianceArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Pay(args) => run_pay(&args),
        Commands::Settle(args) => run_settle(&args),
        Commands::Compliance(args) => run_compliance(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
