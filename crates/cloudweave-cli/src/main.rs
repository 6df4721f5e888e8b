//! cloudweave CLI - command-line interface for the cross-provider sync engine

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod context;
mod output;
mod secrets;

use commands::config::ConfigCommand;
use commands::init::InitCommand;
use commands::rebalance::RebalanceCommand;
use commands::run::RunCommand;
use commands::scan::ScanCommand;
use commands::status::StatusCommand;
use commands::sync::SyncCommand;
use output::{get_formatter, OutputFormat};

#[derive(Debug, Parser)]
#[command(name = "cloudweave", version, about = "Cross-provider cloud drive sync engine")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Initialize the config directory, metadata store, and secrets envelope
    Init(InitCommand),
    /// Fan out a scan across every account and reconcile the store
    Scan(ScanCommand),
    /// Run one cross-provider convergence pass
    Sync(SyncCommand),
    /// Run one capacity rebalance pass
    Rebalance(RebalanceCommand),
    /// Show account and usage status
    Status(StatusCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Run scan+sync+rebalance on a loop until interrupted
    Run(RunCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let format = if cli.json { OutputFormat::Json } else { OutputFormat::Human };
    let formatter = get_formatter(cli.json);

    match cli.command {
        Commands::Init(cmd) => cmd.execute(formatter.as_ref()).await,
        Commands::Scan(cmd) => cmd.execute(formatter.as_ref(), cli.json).await,
        Commands::Sync(cmd) => cmd.execute(formatter.as_ref(), cli.json).await,
        Commands::Rebalance(cmd) => cmd.execute(formatter.as_ref(), cli.json).await,
        Commands::Status(cmd) => cmd.execute(formatter.as_ref(), cli.json).await,
        Commands::Config(cmd) => cmd.execute(format).await,
        Commands::Run(cmd) => cmd.execute(formatter.as_ref()).await,
    }
}
