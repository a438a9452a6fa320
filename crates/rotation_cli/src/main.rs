//! Rotation Engine CLI
//!
//! Drives a `GameEngine` to completion from a JSON setup payload, the way
//! `cache_builder`'s CLI drives a cache build from a JSON/CSV input file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rotation_core::{GameEngine, GameSetup};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rotation_cli")]
#[command(about = "Plan and simulate a fair substitution rotation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run `initialize()` against a setup payload and print the result,
    /// without advancing the clock.
    Plan {
        /// Input setup JSON file
        #[arg(long)]
        setup: PathBuf,
    },
    /// Simulate an entire game, auto-confirming every scheduled rotation,
    /// and print the final snapshot.
    Run {
        /// Input setup JSON file
        #[arg(long)]
        setup: PathBuf,

        /// Wall-clock seconds advanced per tick
        #[arg(long, default_value_t = 1)]
        tick_seconds: u32,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).with_target(false).init();
}

fn load_setup(path: &PathBuf) -> Result<GameSetup> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing setup payload from {}", path.display()))
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Plan { setup } => {
            let setup = load_setup(&setup)?;
            let mut engine = GameEngine::new();
            let result = engine.initialize(setup).map_err(|e| anyhow::anyhow!(e.to_string()))?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Run { setup, tick_seconds } => {
            let mut setup = load_setup(&setup)?;
            setup.auto_confirm_rotations = true;
            let mut engine = GameEngine::new();
            let init_result = engine.initialize(setup).map_err(|e| anyhow::anyhow!(e.to_string()))?;
            tracing::info!(
                roster_size = init_result.roster_size,
                rotations_planned = init_result.rotations_planned,
                "plan generated"
            );

            if !engine.start() {
                anyhow::bail!("engine refused to start");
            }

            while engine.state() != rotation_core::EngineState::GameOver {
                engine.tick(tick_seconds);
                if engine.state() == rotation_core::EngineState::Idle {
                    // Crossed a period boundary; resume for the next period.
                    if !engine.start() {
                        break;
                    }
                }
            }

            let snapshot = engine.get_state();
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
    }

    Ok(())
}
