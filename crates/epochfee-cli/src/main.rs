use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod error;
mod events;

/// Forger fee settlement tool.
#[derive(Parser)]
#[command(name = "epochfee")]
#[command(about = "Settle per-epoch forger fees from recorded block events")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded event log and report every settled epoch.
    Replay {
        /// JSON array of block, reorg, reconciled and settle events.
        #[arg(long)]
        events: PathBuf,

        /// Accounting configuration (JSON). Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Settle a single epoch ledger.
    Settle {
        /// JSON array of {participant_id, pool_fee, tip_fee} entries.
        #[arg(long)]
        ledger: PathBuf,

        /// Print the payments as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let mut out = std::io::stdout().lock();

    let result = match cli.command {
        Commands::Replay {
            events,
            config,
            json,
        } => commands::run_replay(&mut out, &events, config.as_deref(), json),
        Commands::Settle { ledger, json } => commands::run_settle(&mut out, &ledger, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
