//! The Game Engine (design §4.4): owns authoritative placement and minute
//! ledgers, drives the timer, validates invariants, executes confirmed
//! rotations, and invokes the Optimizer after any disruption.
//!
//! State and core construction live here; `confirmation.rs`, `emergency.rs`,
//! `visibility.rs` and `snapshot_io.rs` hold separate `impl GameEngine`
//! blocks for each responsibility, the way the teacher splits one engine's
//! methods across files (`of_core/src/engine/substitutions.rs` is an
//! `impl MatchEngine` block pulled out of the main match-sim file).

use fxhash::FxHashMap;
use tracing::{debug, info, warn};

use crate::config::{GameConfig, Tempo, TunableConstants};
use crate::error::RotationError;
use crate::error_handler::{ErrorHandler, ErrorRecord, Severity};
use crate::event_bus::{EventBus, EventKind, GameEvent};
use crate::models::ledger::MinuteLedger;
use crate::models::placement::Placement;
use crate::models::plan::{Plan, Reason};
use crate::models::player::PlayerId;
use crate::models::roster::Roster;
use crate::models::setup::{GameSetup, InitializeResult};

use super::lineup_generator::generate_lineups;
use super::optimizer::{initial_state, Optimizer, PlayerStatus, TrackedPlayer};
use super::plan_builder::build_plan;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Idle,
    Running,
    RotationPending,
    GameOver,
}

pub struct GameEngine {
    pub(super) state: EngineState,
    pub(super) config: Option<GameConfig>,
    pub(super) roster: Option<Roster>,
    pub(super) placement: Placement,
    pub(super) ledger: MinuteLedger,
    pub(super) plan: Plan,
    pub(super) plan_cursor: usize,
    pub(super) pending_rotation: Option<crate::models::plan::PendingRotation>,
    pub(super) current_time: u32,
    pub(super) current_period: u8,
    pub(super) period_elapsed: u32,
    pub(super) scoring_counters: FxHashMap<String, i64>,
    pub(super) early_warning_fired: bool,
    pub(super) imminent_warning_fired: bool,
    pub(super) halftime_fired: bool,
    pub(super) rotatable_players: Vec<PlayerId>,
    pub(super) bus: EventBus,
    pub(super) errors: ErrorHandler,
}

impl Default for GameEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GameEngine {
    pub fn new() -> Self {
        Self {
            state: EngineState::Uninitialized,
            config: None,
            roster: None,
            placement: Placement::new(Vec::new(), Vec::new(), Vec::new()),
            ledger: MinuteLedger::default(),
            plan: Plan::empty(),
            plan_cursor: 0,
            pending_rotation: None,
            current_time: 0,
            current_period: 1,
            period_elapsed: 0,
            scoring_counters: FxHashMap::default(),
            early_warning_fired: false,
            imminent_warning_fired: false,
            halftime_fired: false,
            rotatable_players: Vec::new(),
            bus: EventBus::new(),
            errors: ErrorHandler::new(),
        }
    }

    pub fn on_event(&mut self, kind: EventKind, handler: impl FnMut(&GameEvent) + Send + 'static) {
        self.bus.subscribe(kind, handler);
    }

    pub fn on_error(&mut self, listener: impl FnMut(&ErrorRecord) + Send + 'static) {
        self.errors.on_error(listener);
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub(super) fn game_length(&self) -> u32 {
        self.config.as_ref().map(|c| c.game_length_seconds()).unwrap_or(0)
    }

    /// `initialize(setup)` (§6). Builds roster/placement/ledger, validates
    /// configuration, and produces the initial plan from the Lineup
    /// Generator + Plan Builder.
    pub fn initialize(&mut self, setup: GameSetup) -> Result<InitializeResult, RotationError> {
        let roster = Roster::new(setup.roster_starters.clone(), setup.roster_reserves.clone(), setup.player_meta.clone())?;

        let active_count = roster.len();
        if setup.field_size > active_count {
            return Err(RotationError::FieldSizeExceedsRoster { field_size: setup.field_size, roster_size: active_count });
        }
        let bench_size = active_count - setup.field_size;
        if setup.swaps_per_change == 0 || setup.swaps_per_change > setup.field_size.min(bench_size) {
            return Err(RotationError::IncompatibleSwaps {
                swaps: setup.swaps_per_change,
                field_size: setup.field_size,
                roster_size: active_count,
            });
        }

        let config = GameConfig {
            field_size: setup.field_size,
            period_seconds: setup.period_seconds,
            num_periods: setup.num_periods,
            swaps_per_change: setup.swaps_per_change,
            warning_lead_seconds: setup.warning_lead_seconds,
            enable_early_warning: setup.enable_early_warning,
            auto_confirm_rotations: setup.auto_confirm_rotations,
            ideal_shifts_override: setup.ideal_shifts_per_player,
            tempo: setup.tempo,
            tunables: TunableConstants::default(),
        };
        config.validate_all()?;

        let placement = Placement::new(setup.roster_starters.clone(), setup.roster_reserves.clone(), Vec::new());
        let ledger = MinuteLedger::new(roster.players().iter().cloned());

        let exempt_field: Vec<PlayerId> = placement.field.iter().filter(|p| roster.is_exempt(p)).cloned().collect();
        let rotatable_field: Vec<PlayerId> = placement.field.iter().filter(|p| !roster.is_exempt(p)).cloned().collect();
        let rotatable_bench: Vec<PlayerId> = placement.bench.iter().filter(|p| !roster.is_exempt(p)).cloned().collect();
        let rotatable_players: Vec<PlayerId> = rotatable_field.iter().chain(rotatable_bench.iter()).cloned().collect();
        let rotatable_field_size = rotatable_field.len();

        let game_length = config.game_length_seconds();
        let lineups = generate_lineups(&rotatable_players, &roster, rotatable_field_size, config.swaps_per_change);
        let plan = build_plan(game_length, &lineups, config.swaps_per_change, &config.tunables, &rotatable_players);

        let expected_variance = simulate_expected_variance(&rotatable_players, &lineups, &plan, game_length);

        info!(roster_size = active_count, rotations_planned = plan.len(), "engine initialized");
        // Exempt starters (e.g. a goalkeeper) are excluded from the Lineup
        // Generator/Plan Builder pipeline above, so the initial plan never
        // rotates them; `replan()` re-derives the same exclusion from
        // `roster` on every call, so online replanning never picks one
        // either.
        let _ = exempt_field;

        self.rotatable_players = rotatable_players;
        self.config = Some(config.clone());
        self.roster = Some(roster);
        self.placement = placement;
        self.ledger = ledger;
        self.plan = plan;
        self.plan_cursor = 0;
        self.pending_rotation = None;
        self.current_time = 0;
        self.current_period = 1;
        self.period_elapsed = 0;
        self.scoring_counters = FxHashMap::default();
        self.early_warning_fired = false;
        self.imminent_warning_fired = false;
        self.halftime_fired = false;
        self.state = EngineState::Idle;

        Ok(InitializeResult {
            success: true,
            roster_size: active_count,
            rotations_planned: self.plan.len(),
            target_seconds_per_player: game_length as f64 * config.field_size as f64 / active_count as f64,
            expected_variance,
        })
    }

    pub fn start(&mut self) -> bool {
        if self.state == EngineState::GameOver || self.state == EngineState::Uninitialized {
            return false;
        }
        if self.state != EngineState::Idle {
            return false;
        }
        self.state = EngineState::Running;
        self.bus.emit(GameEvent::new(EventKind::GameStarted, self.current_time));
        true
    }

    pub fn stop(&mut self) -> bool {
        if self.state != EngineState::Running {
            return false;
        }
        self.state = EngineState::Idle;
        self.bus.emit(GameEvent::new(EventKind::GameStopped, self.current_time));
        true
    }

    pub fn reset(&mut self) {
        *self = GameEngine::new();
    }

    pub fn get_state(&self) -> crate::models::snapshot::GameSnapshot {
        crate::models::snapshot::GameSnapshot {
            schema_version: crate::models::snapshot::SCHEMA_VERSION,
            placement: self.placement.clone(),
            ledger: self.ledger.clone(),
            plan: self.plan.clone(),
            plan_cursor: self.plan_cursor,
            pending_rotation: self.pending_rotation.clone(),
            current_time: self.current_time,
            current_period: self.current_period,
            period_elapsed: self.period_elapsed,
            scoring_counters: self.scoring_counters.clone(),
        }
    }

    /// Requests a recovery plan from the Optimizer using the current
    /// snapshot and replaces the plan tail with it (§4.4 "on disruption").
    ///
    /// Exempt players (e.g. a goalkeeper, SPEC_FULL §15) are held out of
    /// the field/bench handed to the Optimizer entirely, so they never
    /// appear as an `off`/`on` candidate in the generated plan.
    pub(super) fn replan(&mut self, reason: &str) {
        let Some(config) = self.config.clone() else { return };
        let game_length = config.game_length_seconds();
        let optimizer = Optimizer::new(&config, game_length);

        let is_exempt = |p: &PlayerId| self.roster.as_ref().map(|r| r.is_exempt(p)).unwrap_or(false);
        let rotatable_field: Vec<PlayerId> = self.placement.field.iter().filter(|p| !is_exempt(p)).cloned().collect();
        let rotatable_bench: Vec<PlayerId> = self.placement.bench.iter().filter(|p| !is_exempt(p)).cloned().collect();
        let required_field_size = config.field_size.saturating_sub(self.placement.field.len() - rotatable_field.len());

        let mut state: FxHashMap<PlayerId, TrackedPlayer> = initial_state(&rotatable_field, &rotatable_bench);
        for (p, l) in self.ledger.iter() {
            if let Some(entry) = state.get_mut(p) {
                entry.total_played = l.field_seconds;
                entry.total_benched = l.bench_seconds;
                entry.current_field_stint = l.current_stint(self.current_time);
            }
        }
        for p in &self.placement.removed {
            state.insert(p.clone(), TrackedPlayer { status: PlayerStatus::Removed, total_played: 0, current_field_stint: 0, current_bench_stint: 0, total_benched: 0 });
        }

        let halftime_time = if config.num_periods > 0 { Some(game_length / 2) } else { None };

        match optimizer.generate_plan(self.current_time, rotatable_field, rotatable_bench, state, halftime_time, required_field_size) {
            Ok(new_plan) => {
                debug!(reason, events = new_plan.len(), "replanned");
                self.plan = new_plan;
                self.plan_cursor = 0;
            }
            Err(e) => {
                self.errors.report_error(&e, Severity::Warning);
                self.bus.emit(
                    GameEvent::new(EventKind::Warning, self.current_time)
                        .with_error(ErrorRecord::from_error(&e, Severity::Warning))
                        .with_message(format!("replan failed: {reason}")),
                );
            }
        }
    }

    fn in_halftime_window(&self) -> bool {
        let half = self.game_length() / 2;
        self.current_time.abs_diff(half) <= 30
    }

    /// Tick (§4.4 / §5): advances simulated time one second at a time,
    /// accrues ledgers, checks warnings, and triggers scheduled rotations.
    ///
    /// Continues to advance while `rotation_pending`: the clock (and ledger
    /// accrual) does not stop for a substitution decision, only the
    /// evaluation of further scheduled events does (§4.4 line 196). This is
    /// what lets a confirmation arrive "late" relative to `scheduled_time`.
    pub fn tick(&mut self, wall_clock_delta_seconds: u32) {
        if self.state != EngineState::Running && self.state != EngineState::RotationPending {
            return;
        }
        let tunables = match &self.config {
            Some(c) => c.tunables,
            None => return,
        };
        let advance = wall_clock_delta_seconds.min(tunables.max_tick_catchup);

        for _ in 0..advance {
            self.advance_one_second();
            if self.state != EngineState::Running && self.state != EngineState::RotationPending {
                break;
            }
        }
    }

    fn advance_one_second(&mut self) {
        self.ledger.advance_one_second(&self.placement.field, &self.placement.bench, self.current_time + 1);
        self.current_time += 1;
        self.period_elapsed += 1;

        let period_seconds = self.config.as_ref().map(|c| c.period_seconds).unwrap_or(0);
        if period_seconds > 0 && self.period_elapsed >= period_seconds {
            self.on_period_end();
            return;
        }

        self.check_warnings();
        self.check_scheduled_rotation();

        if self.state == EngineState::Running && !self.halftime_fired && self.in_halftime_window() {
            self.halftime_fired = true;
            self.replan("halftime window");
        }
    }

    fn check_warnings(&mut self) {
        let Some(config) = &self.config else { return };
        if !config.enable_early_warning {
            return;
        }
        if let Some(event) = self.plan.next_after(self.current_time) {
            let remaining = event.time.saturating_sub(self.current_time);
            if remaining <= config.warning_lead_seconds && !self.early_warning_fired {
                self.early_warning_fired = true;
                self.bus.emit(GameEvent::new(EventKind::Warning, self.current_time).with_message("rotation approaching"));
            }
            if remaining <= 10 && !self.imminent_warning_fired {
                self.imminent_warning_fired = true;
                self.bus.emit(GameEvent::new(EventKind::Warning, self.current_time).with_message("rotation imminent"));
            }
        }
    }

    fn check_scheduled_rotation(&mut self) {
        if self.state != EngineState::Running || self.pending_rotation.is_some() {
            return;
        }
        let Some((idx, event)) = self.plan.at_or_after(self.plan_cursor, self.current_time) else { return };
        if event.time > self.current_time {
            return;
        }
        let off_valid = event.off.iter().all(|p| self.placement.field.contains(p));
        if !off_valid {
            warn!(time = self.current_time, "scheduled off player not on field, skipping");
            self.plan_cursor = idx + 1;
            self.errors.report_error(
                &RotationError::InvalidScheduledRotation("scheduled off player not on field".into()),
                Severity::Warning,
            );
            self.bus.emit(GameEvent::new(EventKind::Warning, self.current_time).with_message("scheduled rotation skipped"));
            self.replan("invalid scheduled rotation");
            return;
        }

        self.pending_rotation = Some(crate::models::plan::PendingRotation {
            off: event.off.clone(),
            on: event.on.clone(),
            scheduled_time: event.time,
        });
        self.plan_cursor = idx;
        self.state = EngineState::RotationPending;
        self.bus.emit(GameEvent::new(EventKind::RotationPending, self.current_time).with_rotation(event.clone()));

        let auto_confirm = self.config.as_ref().map(|c| c.auto_confirm_rotations).unwrap_or(false);
        if auto_confirm {
            self.confirm_rotation();
        }
    }

    fn on_period_end(&mut self) {
        let num_periods = self.config.as_ref().map(|c| c.num_periods).unwrap_or(1);
        self.bus.emit(GameEvent::new(EventKind::PeriodEnd, self.current_time));
        if self.current_period >= num_periods {
            self.state = EngineState::GameOver;
            self.bus.emit(GameEvent::new(EventKind::GameEnded, self.current_time));
        } else {
            self.current_period += 1;
            self.period_elapsed = 0;
            self.state = EngineState::Idle;
        }
    }

    pub(super) fn mark_halftime(&mut self) {
        self.halftime_fired = true;
    }

    pub(super) fn emit(&mut self, event: GameEvent) {
        self.bus.emit(event);
    }

    pub(super) fn tempo(&self) -> Tempo {
        self.config.as_ref().map(|c| c.tempo).unwrap_or_default()
    }

    pub(super) fn emit_reason_event(&mut self, reason: Option<Reason>) {
        if reason == Some(Reason::HalftimeRefresh) {
            self.mark_halftime();
        }
    }
}

/// Simulates the initial plan's execution to completion and returns the
/// root-mean-square deviation from the mean field-seconds total — the
/// `expected_variance` reported by `initialize()`.
fn simulate_expected_variance(players: &[PlayerId], lineups: &[Vec<PlayerId>], plan: &Plan, game_length: u32) -> f64 {
    if players.is_empty() {
        return 0.0;
    }
    let mut totals: FxHashMap<PlayerId, u32> = players.iter().map(|p| (p.clone(), 0)).collect();
    let mut current_field: Vec<PlayerId> = lineups.first().cloned().unwrap_or_default();
    let mut last_time = 0u32;

    for event in &plan.events {
        let segment = event.time - last_time;
        for p in players {
            if current_field.contains(p) {
                *totals.entry(p.clone()).or_insert(0) += segment;
            }
        }
        current_field.retain(|p| !event.off.contains(p));
        current_field.extend(event.on.iter().cloned());
        last_time = event.time;
    }
    let remaining = game_length.saturating_sub(last_time);
    for p in players {
        if current_field.contains(p) {
            *totals.entry(p.clone()).or_insert(0) += remaining;
        }
    }

    let mean = totals.values().copied().sum::<u32>() as f64 / players.len() as f64;
    let sum_sq: f64 = totals.values().map(|&v| (v as f64 - mean).powi(2)).sum();
    (sum_sq / players.len() as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::setup::GameSetup;

    fn ids(labels: &[&str]) -> Vec<PlayerId> {
        labels.iter().map(|l| PlayerId::new(*l)).collect()
    }

    fn setup_scenario_1() -> GameSetup {
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
    fn initialize_rejects_field_size_over_roster() {
        let mut engine = GameEngine::new();
        let mut setup = setup_scenario_1();
        setup.field_size = 10;
        let result = engine.initialize(setup);
        assert!(matches!(result, Err(RotationError::FieldSizeExceedsRoster { .. })));
    }

    #[test]
    fn initialize_transitions_to_idle() {
        let mut engine = GameEngine::new();
        let result = engine.initialize(setup_scenario_1()).unwrap();
        assert_eq!(engine.state(), EngineState::Idle);
        assert_eq!(result.roster_size, 6);
    }

    #[test]
    fn start_requires_initialization() {
        let mut engine = GameEngine::new();
        assert!(!engine.start());
    }

    #[test]
    fn tick_accrues_field_and_bench_seconds() {
        let mut engine = GameEngine::new();
        engine.initialize(setup_scenario_1()).unwrap();
        engine.start();
        engine.tick(5);
        let snapshot = engine.get_state();
        assert_eq!(snapshot.current_time, 5);
        let total: u64 = snapshot.ledger.iter().map(|(_, l)| l.field_seconds as u64).sum();
        assert_eq!(total, 5 * 4);
    }

    #[test]
    fn boundary_empty_plan_when_roster_equals_field_size() {
        let mut engine = GameEngine::new();
        let mut setup = setup_scenario_1();
        setup.roster_starters = ids(&["A", "B", "C", "D"]);
        setup.roster_reserves = Vec::new();
        setup.field_size = 4;
        setup.swaps_per_change = 1;
        let result = engine.initialize(setup);
        assert!(matches!(result, Err(RotationError::IncompatibleSwaps { .. })));
    }

    fn advance_until_pending(engine: &mut GameEngine, max_seconds: u32) -> bool {
        let mut elapsed = 0;
        while elapsed < max_seconds {
            if engine.state() == EngineState::Idle && !engine.start() {
                return false;
            }
            engine.tick(10);
            elapsed += 10;
            if engine.state() == EngineState::RotationPending {
                return true;
            }
        }
        false
    }

    #[test]
    fn exempt_player_excluded_from_replanned_plan() {
        let mut engine = GameEngine::new();
        let mut meta = FxHashMap::default();
        meta.insert(
            PlayerId::new("GK"),
            crate::models::player::PlayerMeta { position: Some("GK".into()), jersey_number: None, exempt: true },
        );
        let setup = GameSetup {
            roster_starters: ids(&["GK", "A", "B", "C"]),
            roster_reserves: ids(&["D", "E"]),
            field_size: 4,
            period_seconds: 600,
            num_periods: 2,
            swaps_per_change: 1,
            warning_lead_seconds: 60,
            enable_early_warning: true,
            auto_confirm_rotations: false,
            ideal_shifts_per_player: None,
            tempo: Tempo::Balanced,
            player_meta: meta,
        };
        engine.initialize(setup).unwrap();
        engine.start();
        let gk = PlayerId::new("GK");

        let initial = engine.get_state();
        assert!(!initial.plan.events.iter().any(|e| e.off.contains(&gk) || e.on.contains(&gk)));
        assert!(initial.placement.field.contains(&gk));

        assert!(advance_until_pending(&mut engine, 600));
        assert!(engine.cancel_rotation());

        let snapshot = engine.get_state();
        assert!(!snapshot.plan.events.iter().any(|e| e.off.contains(&gk) || e.on.contains(&gk)));
        assert!(snapshot.placement.field.contains(&gk));
    }

    use proptest::prelude::*;

    proptest! {
        /// §8 Invariant: for every reachable engine state, `field` has
        /// exactly `field_size` players and `field ∪ bench ∪ removed`
        /// partitions the roster with no duplicates — checked after every
        /// tick, confirmed rotation, and cancellation across random roster/
        /// field-size configurations and run lengths.
        #[test]
        fn placement_partition_holds_across_random_runs(
            roster_size in 3usize..8,
            field_size in 1usize..8,
            period_seconds in 300u32..1800,
            run_seconds in 100u32..2000,
            always_cancel in proptest::bool::ANY,
        ) {
            let field_size = field_size.min(roster_size - 1).max(1);
            let bench_size = roster_size - field_size;
            if bench_size == 0 {
                return Ok(());
            }
            let all: Vec<PlayerId> = (0..roster_size).map(|i| PlayerId::new(format!("P{i}"))).collect();
            let starters = all[..field_size].to_vec();
            let reserves = all[field_size..].to_vec();
            let swaps = 1.min(field_size).min(bench_size).max(1);

            let setup = GameSetup {
                roster_starters: starters,
                roster_reserves: reserves,
                field_size,
                period_seconds,
                num_periods: 2,
                swaps_per_change: swaps,
                warning_lead_seconds: 60,
                enable_early_warning: false,
                auto_confirm_rotations: false,
                ideal_shifts_per_player: None,
                tempo: Tempo::Balanced,
                player_meta: FxHashMap::default(),
            };

            let mut engine = GameEngine::new();
            if engine.initialize(setup).is_err() {
                return Ok(());
            }
            let roster = engine.roster.clone().unwrap();
            engine.start();

            let mut elapsed = 0u32;
            while elapsed < run_seconds && engine.state() != EngineState::GameOver {
                engine.tick(10);
                elapsed += 10;
                if engine.state() == EngineState::RotationPending {
                    if always_cancel {
                        engine.cancel_rotation();
                    } else {
                        engine.confirm_rotation();
                    }
                }

                let snapshot = engine.get_state();
                prop_assert_eq!(snapshot.placement.field.len(), field_size);
                let mut seen = std::collections::HashSet::new();
                for p in snapshot.placement.field.iter().chain(snapshot.placement.bench.iter()).chain(snapshot.placement.removed.iter()) {
                    prop_assert!(seen.insert(p.clone()));
                }
                prop_assert_eq!(seen.len(), roster.len());
            }
        }
    }
}
