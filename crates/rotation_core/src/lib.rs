//! # rotation_core — Fair Rotation Engine
//!
//! Plans and executes substitution rotations for a team-sport roster,
//! equalizing field time across players subject to stint-length and
//! substitution-interval constraints.
//!
//! Five collaborators, in dependency order: the Lineup Generator produces a
//! sequence of fair lineups; the Plan Builder turns that sequence into a
//! timed plan; the Deviation-Aware Optimizer generates online recovery
//! plans from any disrupted state; the Game Engine owns authoritative state
//! and drives the timer; the Event Bus and Error Handler connect all of it
//! to collaborators.

#![allow(clippy::too_many_arguments)]

pub mod config;
pub mod engine;
pub mod error;
pub mod error_handler;
pub mod event_bus;
pub mod models;

pub use config::{GameConfig, Tempo, TunableConstants};
pub use engine::{EngineState, GameEngine};
pub use error::{ErrorCategory, Result, RotationError};
pub use error_handler::{ErrorHandler, ErrorRecord, Severity};
pub use event_bus::{EventBus, EventKind, GameEvent};
pub use models::player::{PlayerId, PlayerMeta};
pub use models::setup::{GameSetup, InitializeResult};
pub use models::snapshot::GameSnapshot;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;
    use fxhash::FxHashMap;

    fn ids(labels: &[&str]) -> Vec<PlayerId> {
        labels.iter().map(|l| PlayerId::new(*l)).collect()
    }

    /// End-to-end smoke test exercising initialize → start → tick →
    /// confirm across the public surface re-exported from the crate root.
    #[test]
    fn smoke_test_initialize_start_tick() {
        let mut engine = GameEngine::new();
        let setup = GameSetup {
            roster_starters: ids(&["A", "B", "C", "D"]),
            roster_reserves: ids(&["E", "F"]),
            field_size: 4,
            period_seconds: 1200,
            num_periods: 2,
            swaps_per_change: 1,
            warning_lead_seconds: 60,
            enable_early_warning: true,
            auto_confirm_rotations: false,
            ideal_shifts_per_player: None,
            tempo: Tempo::Balanced,
            player_meta: FxHashMap::default(),
        };

        let result = engine.initialize(setup).unwrap();
        assert_eq!(result.roster_size, 6);
        assert!(engine.start());
        engine.tick(5);
        assert_eq!(engine.get_state().current_time, 5);
    }
}
