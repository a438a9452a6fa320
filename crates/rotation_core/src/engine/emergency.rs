//! Emergency substitutions and removal/return handling (design §4.4 "Out of
//! band mutations").

use tracing::info;

use crate::error::RotationError;
use crate::error_handler::Severity;
use crate::event_bus::{EventKind, GameEvent};
use crate::models::plan::RotationEvent;
use crate::models::player::PlayerId;

use super::game_engine::{EngineState, GameEngine};

impl GameEngine {
    /// `emergency_substitution(player_off, player_on, remove_from_game)`
    /// (§6): an out-of-band swap that bypasses the pending-rotation flow
    /// entirely, e.g. an injury. `remove_from_game` sends `player_off`
    /// straight to `removed` instead of back onto the bench.
    pub fn emergency_substitution(
        &mut self,
        player_off: &PlayerId,
        player_on: &PlayerId,
        remove_from_game: bool,
    ) -> Result<(), RotationError> {
        if !matches!(self.state, EngineState::Running | EngineState::RotationPending) {
            return Err(RotationError::InvalidState("emergency substitution requires a running game".into()));
        }
        if !self.placement.contains_field(player_off) {
            return Err(RotationError::InvariantViolation(format!("{player_off} is not on the field")));
        }
        if !self.placement.contains_bench(player_on) {
            return Err(RotationError::InvariantViolation(format!("{player_on} is not on the bench")));
        }

        self.placement.field.retain(|p| p != player_off);
        self.placement.field.push(player_on.clone());
        self.placement.bench.retain(|p| p != player_on);
        if remove_from_game {
            self.placement.removed.push(player_off.clone());
        } else {
            self.placement.bench.push(player_off.clone());
        }

        self.ledger.clear_field_stint(player_off);
        self.ledger.start_field_stint(player_on, self.current_time);

        if self.state == EngineState::RotationPending {
            self.pending_rotation = None;
            self.state = EngineState::Running;
        }

        let rotation = RotationEvent::new(
            self.current_time,
            vec![player_off.clone()],
            vec![player_on.clone()],
            Some(crate::models::plan::Reason::Emergency),
        );
        self.bus.emit(GameEvent::new(EventKind::EmergencySubstitution, self.current_time).with_rotation(rotation));
        info!(time = self.current_time, off = %player_off, on = %player_on, remove_from_game, "emergency substitution");

        self.replan("emergency substitution");
        Ok(())
    }

    /// `remove_player(p)` (§6): pulls `p` out of active play entirely. Only
    /// valid for a bench player — a field player is removed via
    /// `emergency_substitution(.., remove_from_game=true)`, which replaces
    /// them on the field in the same atomic step.
    pub fn remove_player(&mut self, p: &PlayerId) -> Result<(), RotationError> {
        if self.placement.contains_removed(p) {
            return Err(RotationError::InvariantViolation(format!("{p} is already removed")));
        }
        if self.placement.contains_field(p) {
            return Err(RotationError::InvalidState(format!(
                "{p} is on the field; use emergency_substitution to remove a field player"
            )));
        }
        self.placement.bench.retain(|x| x != p);
        self.placement.removed.push(p.clone());
        self.ledger.clear_field_stint(p);

        self.bus.emit(GameEvent::new(EventKind::PlayerRemoved, self.current_time).with_message(p.to_string()));
        info!(time = self.current_time, player = %p, "player removed");
        self.replan("player removed");
        Ok(())
    }

    /// `return_player(p)` (§6): brings a previously removed player back onto
    /// the bench, available for future rotations.
    pub fn return_player(&mut self, p: &PlayerId) -> Result<(), RotationError> {
        if !self.placement.contains_removed(p) {
            return Err(RotationError::InvariantViolation(format!("{p} was not removed")));
        }
        self.placement.removed.retain(|x| x != p);
        self.placement.bench.push(p.clone());

        self.bus.emit(GameEvent::new(EventKind::PlayerReturned, self.current_time).with_message(p.to_string()));
        info!(time = self.current_time, player = %p, "player returned");
        self.replan("player returned");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Tempo;
    use crate::models::setup::GameSetup;
    use fxhash::FxHashMap;

    fn ids(labels: &[&str]) -> Vec<PlayerId> {
        labels.iter().map(|l| PlayerId::new(*l)).collect()
    }

    /// `tick()` clamps each call to `max_tick_catchup` (10s by default); this
    /// loops calls so tests can advance to an arbitrary simulated time
    /// without tripping over that cap.
    fn advance_by(engine: &mut GameEngine, mut seconds: u32) {
        while seconds > 0 {
            let step = seconds.min(10);
            engine.tick(step);
            seconds -= step;
        }
    }

    fn setup() -> GameSetup {
        GameSetup {
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
        }
    }

    #[test]
    fn emergency_sub_swaps_field_and_bench() {
        let mut engine = GameEngine::new();
        engine.initialize(setup()).unwrap();
        engine.start();
        let off = PlayerId::new("A");
        let on = PlayerId::new("E");
        engine.emergency_substitution(&off, &on, false).unwrap();
        let snapshot = engine.get_state();
        assert!(snapshot.placement.field.contains(&on));
        assert!(snapshot.placement.bench.contains(&off));
    }

    #[test]
    fn emergency_sub_with_removal_does_not_return_to_bench() {
        let mut engine = GameEngine::new();
        engine.initialize(setup()).unwrap();
        engine.start();
        let before = engine.get_state();
        let field_size_before = before.placement.field.len();
        let removed_count_before = before.placement.removed.len();

        let off = PlayerId::new("A");
        let on = PlayerId::new("E");
        engine.emergency_substitution(&off, &on, true).unwrap();

        let snapshot = engine.get_state();
        assert!(snapshot.placement.removed.contains(&off));
        assert!(!snapshot.placement.bench.contains(&off));
        // §8 boundary: field size is preserved and removed grows by exactly
        // one, regardless of which player was swapped out.
        assert_eq!(snapshot.placement.field.len(), field_size_before);
        assert_eq!(snapshot.placement.removed.len(), removed_count_before + 1);
    }

    #[test]
    fn remove_then_return_round_trips_to_bench() {
        let mut engine = GameEngine::new();
        engine.initialize(setup()).unwrap();
        engine.start();
        let p = PlayerId::new("E");
        engine.remove_player(&p).unwrap();
        assert!(engine.get_state().placement.removed.contains(&p));
        engine.return_player(&p).unwrap();
        let snapshot = engine.get_state();
        assert!(snapshot.placement.bench.contains(&p));
        assert!(!snapshot.placement.removed.contains(&p));
    }

    #[test]
    fn remove_player_rejects_field_player() {
        let mut engine = GameEngine::new();
        engine.initialize(setup()).unwrap();
        engine.start();
        let p = PlayerId::new("A");
        let err = engine.remove_player(&p).unwrap_err();
        assert!(matches!(err, RotationError::InvalidState(_)));
        assert!(engine.get_state().placement.field.contains(&p));
    }

    /// Scenario 4: six players, four on field. At t=300,
    /// `emergency_substitution("A", "E", remove_from_game=true)`. Field
    /// contains E not A, removed contains A, bench shrinks by one, A's
    /// ledger is frozen at 300, and a new plan is generated over the
    /// remaining five players.
    #[test]
    fn scenario_4_emergency_removal_mid_stint() {
        let mut engine = GameEngine::new();
        engine.initialize(setup()).unwrap();
        engine.start();
        advance_by(&mut engine, 300);
        assert_eq!(engine.get_state().current_time, 300);

        let before = engine.get_state();
        assert_eq!(before.placement.field.len() + before.placement.bench.len(), 6);
        let bench_len_before = before.placement.bench.len();

        let a = PlayerId::new("A");
        let e = PlayerId::new("E");
        let a_field_seconds_at_removal = before.ledger.get(&a).field_seconds;

        engine.emergency_substitution(&a, &e, true).unwrap();

        let after = engine.get_state();
        assert!(after.placement.field.contains(&e));
        assert!(!after.placement.field.contains(&a));
        assert!(after.placement.removed.contains(&a));
        assert_eq!(after.placement.bench.len(), bench_len_before - 1);

        // A's ledger is frozen: no more field time accrues for a removed
        // player no matter how much further the game advances.
        assert_eq!(after.ledger.get(&a).field_seconds, a_field_seconds_at_removal);
        engine.tick(10);
        assert_eq!(engine.get_state().ledger.get(&a).field_seconds, a_field_seconds_at_removal);

        // The replan covers exactly the five remaining active players.
        let active: std::collections::HashSet<_> =
            after.placement.field.iter().chain(after.placement.bench.iter()).cloned().collect();
        assert_eq!(active.len(), 5);
        for event in &after.plan.events {
            for p in event.off.iter().chain(event.on.iter()) {
                assert!(active.contains(p));
                assert_ne!(*p, a);
            }
        }
    }
}
