//! # mcred CLI entry point
//!
//! Parses command-line arguments, loads configuration, and dispatches to
//! subcommand handlers. Handlers return the process exit code.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mcred_cli::config::CliConfig;
use mcred_cli::disclose::{run_disclose, DiscloseArgs};
use mcred_cli::inspect::{run_inspect, InspectArgs};
use mcred_cli::lookup::{run_lookup, LookupArgs};
use mcred_cli::publish::{run_publish, PublishArgs};
use mcred_cli::verify::{run_verify, VerifyArgs};

/// Academic micro-credential receipts: inspect, disclose, verify, and
/// anchor term roots on a ledger.
#[derive(Parser, Debug)]
#[command(name = "mcred", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a YAML configuration file. Environment variables override it.
    #[arg(long, global = true, env = "MCRED_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse a receipt and print a summary.
    Inspect(InspectArgs),

    /// Export a selective-disclosure receipt.
    Disclose(DiscloseArgs),

    /// Verify a receipt against the verifier service.
    Verify(VerifyArgs),

    /// Publish a term's root commitment on the ledger.
    Publish(PublishArgs),

    /// Look up a root commitment on the ledger.
    Lookup(LookupArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "mcred starting");

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<u8> {
    let load_config = || CliConfig::load(cli.config.as_deref());
    match cli.command {
        Commands::Inspect(args) => run_inspect(&args),
        Commands::Disclose(args) => run_disclose(&args),
        Commands::Verify(args) => runtime()?.block_on(run_verify(&args, &load_config()?)),
        Commands::Publish(args) => runtime()?.block_on(run_publish(&args, &load_config()?)),
        Commands::Lookup(args) => runtime()?.block_on(run_lookup(&args, &load_config()?)),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")
}
