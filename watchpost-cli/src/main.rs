//! Watchpost — field-device motion agent CLI.
//!
//! # Usage
//!
//! ```text
//! watchpost init --name <name> --host <host> [--port 8003] --password <pw>
//!               [--https] [--interval 2.0] [--force]
//! watchpost run
//! watchpost status [--json]
//! watchpost wipe [--yes]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{init::InitArgs, status::StatusArgs, wipe::WipeArgs};

#[derive(Parser, Debug)]
#[command(
    name = "watchpost",
    version,
    about = "Sample a motion sensor, record locally, sync with a collection server",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// First-run setup: write the device configuration and seed local files.
    Init(InitArgs),

    /// Run the agent poll loop in the foreground.
    Run,

    /// Show the persisted device state and ledger summary.
    Status(StatusArgs),

    /// Delete this device's ledger, archives, and state (destructive).
    Wipe(WipeArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Run => commands::run::run(),
        Commands::Status(args) => args.run(),
        Commands::Wipe(args) => args.run(),
    }
}
