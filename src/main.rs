//! ═══════════════════════════════════════════════════════════════════════════════
//! THERMITE — Entry Point
//! ═══════════════════════════════════════════════════════════════════════════════
//! Single binary, subcommand dispatch. Exits nonzero only when a startup
//! capability is missing; steady-state failures are logged and survived.
//! ═══════════════════════════════════════════════════════════════════════════════

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

use thermite::runner::{self, RunnerConfig, DEFAULT_INTERVAL_MS};

#[derive(Parser)]
#[command(name = "thermite")]
#[command(about = "Heuristic thermal feedback governor", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the governor loop (foreground, until killed)
    Run {
        /// Control period in milliseconds
        #[arg(long, default_value_t = DEFAULT_INTERVAL_MS)]
        interval_ms: u64,

        /// Append per-tick JSONL telemetry to this file
        #[arg(long)]
        journal: Option<PathBuf>,

        /// Stop after N ticks (demos and testing)
        #[arg(long)]
        ticks: Option<u64>,
    },

    /// Print discovered sensors, temperatures, and actuator availability
    Probe,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            interval_ms,
            journal,
            ticks,
        } => runner::run(RunnerConfig {
            interval: Duration::from_millis(interval_ms),
            journal,
            max_ticks: ticks,
        })?,
        Commands::Probe => runner::probe()?,
    }
    Ok(())
}
