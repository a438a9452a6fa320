//! Snapshot restore (design §8 "round-trip law"): rebuilding a `GameEngine`
//! from a previously captured `GameSnapshot` plus the configuration and
//! roster it was built from.
//!
//! `get_state()` (the forward direction) lives on the main impl block in
//! `game_engine.rs`; this file holds only the reverse direction, the way
//! the teacher keeps `MatchEngine::snapshot()` and `MatchEngine::restore()`
//! as separate concerns (`of_core/src/engine/snapshot.rs` vs. the restore
//! path threaded through `match_sim.rs`).

use fxhash::FxHashMap;

use crate::config::GameConfig;
use crate::error::RotationError;
use crate::models::roster::Roster;
use crate::models::snapshot::GameSnapshot;

use super::game_engine::{EngineState, GameEngine};

impl GameEngine {
    /// Rebuilds an engine from a snapshot captured by `get_state()`, given
    /// the configuration and roster it was produced under (neither of which
    /// the snapshot itself carries — both are assumed stable for the life
    /// of one game). The restored engine resumes in `Running` if the
    /// snapshot's plan still has unconsumed events, else `Idle`.
    pub fn restore_from_snapshot(snapshot: GameSnapshot, config: GameConfig, roster: Roster) -> Result<Self, RotationError> {
        config.validate_all()?;
        let field_size = config.field_size;
        snapshot.placement.validate(&roster, field_size)?;

        let rotatable_players: Vec<_> = roster
            .players()
            .iter()
            .filter(|p| !roster.is_exempt(p))
            .cloned()
            .collect();

        let state = if snapshot.plan_cursor < snapshot.plan.len() {
            EngineState::Running
        } else {
            EngineState::Idle
        };

        Ok(Self {
            state,
            config: Some(config),
            roster: Some(roster),
            placement: snapshot.placement,
            ledger: snapshot.ledger,
            plan: snapshot.plan,
            plan_cursor: snapshot.plan_cursor,
            pending_rotation: snapshot.pending_rotation,
            current_time: snapshot.current_time,
            current_period: snapshot.current_period,
            period_elapsed: snapshot.period_elapsed,
            scoring_counters: snapshot.scoring_counters,
            early_warning_fired: false,
            imminent_warning_fired: false,
            halftime_fired: false,
            rotatable_players,
            bus: crate::event_bus::EventBus::new(),
            errors: crate::error_handler::ErrorHandler::new(),
        })
    }
}
