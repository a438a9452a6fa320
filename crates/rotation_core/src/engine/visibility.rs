//! Visibility-triggered catch-up (design §4.4): when the driving context
//! reports a foreground/background transition, bulk-advance game time and
//! ledgers by the elapsed wall-clock instead of replaying it second by
//! second.

use tracing::info;

use crate::event_bus::{EventKind, GameEvent};

use super::game_engine::{EngineState, GameEngine};

impl GameEngine {
    /// `handle_visibility_change(now_visible, elapsed_while_hidden)` (§6).
    /// Hiding is a no-op here: the caller simply stops driving `tick()`
    /// while backgrounded. Becoming visible again bulk-advances by the
    /// elapsed gap, clamped by `max_visibility_catchup` and by the time
    /// remaining in the game, crossing period boundaries as needed.
    pub fn handle_visibility_change(&mut self, now_visible: bool, elapsed_while_hidden: u32) {
        if !now_visible {
            return;
        }
        if !matches!(self.state, EngineState::Running | EngineState::Idle) {
            return;
        }
        let Some(config) = self.config.clone() else { return };
        let game_length = self.game_length();
        let remaining = game_length.saturating_sub(self.current_time);
        let mut elapsed = elapsed_while_hidden.min(config.tunables.max_visibility_catchup).min(remaining);
        if elapsed == 0 {
            return;
        }

        while elapsed > 0 {
            let remaining_in_period = config.period_seconds.saturating_sub(self.period_elapsed);
            let step = elapsed.min(remaining_in_period.max(1));

            self.ledger.advance_seconds(&self.placement.field, &self.placement.bench, step);
            self.current_time += step;
            self.period_elapsed += step;
            elapsed -= step;

            if self.period_elapsed >= config.period_seconds {
                self.cross_period_boundary_during_catchup(config.num_periods);
                if self.state == EngineState::GameOver {
                    break;
                }
            }
        }

        info!(time = self.current_time, period = self.current_period, "visibility catch-up applied");
        self.bus.emit(GameEvent::new(EventKind::StateValidated, self.current_time).with_message("visibility catch-up"));

        if self.state != EngineState::GameOver {
            self.replan("visibility catch-up");
        }
    }

    /// Unlike the tick-driven `on_period_end`, catch-up does not pause into
    /// `Idle` between periods: the whole hidden gap is treated as elapsed
    /// time the game kept running through, per §8 scenario 5.
    fn cross_period_boundary_during_catchup(&mut self, num_periods: u8) {
        self.bus.emit(GameEvent::new(EventKind::PeriodEnd, self.current_time));
        if self.current_period >= num_periods {
            self.state = EngineState::GameOver;
            self.bus.emit(GameEvent::new(EventKind::GameEnded, self.current_time));
        } else {
            self.current_period += 1;
            self.period_elapsed = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Tempo;
    use crate::models::player::PlayerId;
    use crate::models::setup::GameSetup;
    use fxhash::FxHashMap;

    fn ids(labels: &[&str]) -> Vec<PlayerId> {
        labels.iter().map(|l| PlayerId::new(*l)).collect()
    }

    /// `tick()` clamps each call to `max_tick_catchup` (10s by default), and
    /// a period boundary drops the engine back to `Idle`; this steps through
    /// both so tests can advance to an arbitrary simulated time.
    fn advance_by(engine: &mut GameEngine, mut seconds: u32) {
        while seconds > 0 {
            if engine.state() == EngineState::Idle {
                engine.start();
            }
            let step = seconds.min(10);
            engine.tick(step);
            seconds -= step;
        }
    }

    fn setup_scenario_5() -> GameSetup {
        GameSetup {
            roster_starters: ids(&["A", "B", "C", "D"]),
            roster_reserves: ids(&["E"]),
            field_size: 4,
            period_seconds: 600,
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
    fn catchup_across_half_advances_period_and_time() {
        let mut engine = GameEngine::new();
        engine.initialize(setup_scenario_5()).unwrap();
        engine.start();
        advance_by(&mut engine, 550);
        assert_eq!(engine.get_state().current_time, 550);

        engine.handle_visibility_change(true, 100);

        let snapshot = engine.get_state();
        assert_eq!(snapshot.current_time, 650);
        assert_eq!(snapshot.current_period, 2);
        assert_eq!(snapshot.period_elapsed, 50);
    }

    #[test]
    fn catchup_is_clamped_by_time_remaining() {
        let mut engine = GameEngine::new();
        engine.initialize(setup_scenario_5()).unwrap();
        engine.start();
        advance_by(&mut engine, 1190);
        engine.handle_visibility_change(true, 1000);
        let snapshot = engine.get_state();
        assert_eq!(snapshot.current_time, 1200);
        assert_eq!(engine.state(), EngineState::GameOver);
    }

    #[test]
    fn catchup_spanning_two_periods_advances_period_counter_twice() {
        let mut engine = GameEngine::new();
        let mut setup = setup_scenario_5();
        setup.period_seconds = 200;
        setup.num_periods = 4;
        engine.initialize(setup).unwrap();
        engine.start();
        advance_by(&mut engine, 150);
        assert_eq!(engine.get_state().current_period, 1);

        engine.handle_visibility_change(true, 300);

        let snapshot = engine.get_state();
        assert_eq!(snapshot.current_period, 3);
        assert_eq!(snapshot.current_time, 450);
        assert_eq!(snapshot.period_elapsed, 50);
        assert_eq!(engine.state(), EngineState::Running);
    }

    #[test]
    fn hiding_is_a_no_op() {
        let mut engine = GameEngine::new();
        engine.initialize(setup_scenario_5()).unwrap();
        engine.start();
        engine.tick(10);
        engine.handle_visibility_change(false, 0);
        assert_eq!(engine.get_state().current_time, 10);
    }
}
