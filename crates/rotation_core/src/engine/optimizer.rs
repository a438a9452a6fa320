//! Deviation-Aware Optimizer (design §4.3): the online, tick-coupled
//! decision engine and forward-plan generator.
//!
//! No direct teacher analog exists for this online decision function; it
//! follows the general shape of the teacher's `process_substitutions` /
//! `find_substitution_candidate` pair in
//! `of_core/src/engine/substitutions.rs` — classify candidates, rank by a
//! scoring key, act on the best — adapted from fatigue-triggered football
//! subs to minutes-variance-triggered rotation.

use fxhash::FxHashMap;

use crate::config::{GameConfig, TunableConstants};
use crate::error::RotationError;
use crate::models::plan::{Plan, Reason, RotationEvent};
use crate::models::player::PlayerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerStatus {
    OnField,
    OnBench,
    Removed,
}

/// Per-player tracked state maintained during optimizer simulation (§4.3).
#[derive(Debug, Clone, Copy)]
pub struct TrackedPlayer {
    pub status: PlayerStatus,
    pub total_played: u32,
    pub current_field_stint: u32,
    pub current_bench_stint: u32,
    pub total_benched: u32,
}

impl TrackedPlayer {
    fn on_field(total_played: u32, total_benched: u32) -> Self {
        Self { status: PlayerStatus::OnField, total_played, current_field_stint: 0, current_bench_stint: 0, total_benched }
    }

    fn on_bench(total_played: u32, total_benched: u32) -> Self {
        Self { status: PlayerStatus::OnBench, total_played, current_field_stint: 0, current_bench_stint: 0, total_benched }
    }
}

/// Dynamic targets (§4.3), recomputed whenever the active roster size
/// changes.
#[derive(Debug, Clone, Copy)]
pub struct DynamicTargets {
    pub target_per_player: f64,
    pub ideal_shifts: u32,
    pub min_sub_gap: u32,
    pub max_field_stint: u32,
    pub max_bench_stint: u32,
    pub variance_goal: u32,
}

impl DynamicTargets {
    pub fn compute(game_length: u32, field_size: usize, active_count: usize, config: &GameConfig) -> Self {
        let target_per_player = game_length as f64 * field_size as f64 / active_count.max(1) as f64;
        let bench_depth = active_count.saturating_sub(field_size);
        let gap_threshold = if bench_depth < field_size { 120.0 } else { 90.0 };

        let ideal_shifts = config.ideal_shifts_override.map(|v| v as u32).unwrap_or_else(|| {
            (1..=6u32)
                .rev()
                .find(|k| target_per_player / *k as f64 >= gap_threshold)
                .unwrap_or(1)
        });

        let raw_gap = target_per_player / ideal_shifts as f64;
        let min_sub_gap = (raw_gap as u32).clamp(60, (420).min(game_length / 6).max(60));

        let check_interval = config.tunables.check_interval;
        let max_field_stint = [
            (target_per_player / ideal_shifts as f64) as u32,
            2 * check_interval,
            (0.9 * min_sub_gap as f64) as u32,
        ]
        .into_iter()
        .max()
        .unwrap();

        let bench_target = (game_length as f64 - target_per_player).max(0.0);
        let max_bench_stint = [
            (bench_target / ideal_shifts as f64) as u32,
            2 * check_interval,
            (0.9 * min_sub_gap as f64) as u32,
        ]
        .into_iter()
        .max()
        .unwrap();

        let variance_goal = config.tempo.variance_goal_seconds();

        Self { target_per_player, ideal_shifts, min_sub_gap, max_field_stint, max_bench_stint, variance_goal }
    }

    /// `dynamic_variance_threshold(t)` (§4.3): larger allowance early,
    /// tightening linearly to `variance_goal` at end of game.
    pub fn variance_threshold(&self, t: u32, game_length: u32, max_early_variance: u32) -> f64 {
        let fraction_remaining = 1.0 - (t as f64 / game_length.max(1) as f64).min(1.0);
        self.variance_goal as f64 + (max_early_variance as f64 - self.variance_goal as f64) * fraction_remaining
    }
}

pub struct Optimizer<'a> {
    pub config: &'a GameConfig,
    pub tunables: &'a TunableConstants,
    pub game_length: u32,
}

impl<'a> Optimizer<'a> {
    pub fn new(config: &'a GameConfig, game_length: u32) -> Self {
        Self { config, tunables: &config.tunables, game_length }
    }

    fn mean_total_played(state: &FxHashMap<PlayerId, TrackedPlayer>) -> f64 {
        let active: Vec<&TrackedPlayer> = state.values().filter(|p| p.status != PlayerStatus::Removed).collect();
        if active.is_empty() {
            return 0.0;
        }
        active.iter().map(|p| p.total_played as f64).sum::<f64>() / active.len() as f64
    }

    fn variance(state: &FxHashMap<PlayerId, TrackedPlayer>) -> f64 {
        let totals: Vec<u32> = state.values().filter(|p| p.status != PlayerStatus::Removed).map(|p| p.total_played).collect();
        if totals.is_empty() {
            return 0.0;
        }
        (*totals.iter().max().unwrap() - *totals.iter().min().unwrap()) as f64
    }

    /// The online decision function (§4.3 step 1-4), evaluated once per
    /// `check_interval`. Returns `None` when no action should be taken.
    #[allow(clippy::too_many_arguments)]
    pub fn decide(
        &self,
        t: u32,
        field: &[PlayerId],
        bench: &[PlayerId],
        state: &FxHashMap<PlayerId, TrackedPlayer>,
        targets: &DynamicTargets,
        time_since_last_sub: u32,
        halftime_pending: bool,
        in_halftime_window: bool,
    ) -> Option<RotationEvent> {
        if in_halftime_window && halftime_pending {
            let mut all: Vec<PlayerId> = field.iter().chain(bench.iter()).cloned().collect();
            all.sort_by(|a, b| {
                state[a].total_played.cmp(&state[b].total_played).then(a.as_str().cmp(b.as_str()))
            });
            let field_size = field.len();
            let new_field: Vec<PlayerId> = all[..field_size.min(all.len())].to_vec();
            let off: Vec<PlayerId> = field.iter().filter(|p| !new_field.contains(p)).cloned().collect();
            let on: Vec<PlayerId> = new_field.iter().filter(|p| !field.contains(p)).cloned().collect();
            if !off.is_empty() {
                return Some(RotationEvent::new(t, off, on, Some(Reason::HalftimeRefresh)));
            }
        }

        let variance = Self::variance(state);
        let threshold = targets.variance_threshold(t, self.game_length, self.tunables.max_early_variance);
        let pressure = variance > threshold;
        let reduction = if pressure { 0.6 } else { 1.0 };
        let effective_gap = (targets.min_sub_gap as f64 * reduction) as u32;

        if time_since_last_sub < effective_gap && !in_halftime_window {
            return None;
        }

        let mean = Self::mean_total_played(state);

        let mut urgent_off: Vec<PlayerId> = field
            .iter()
            .filter(|p| state[p].current_field_stint >= targets.max_field_stint)
            .cloned()
            .collect();
        urgent_off.sort_by(|a, b| state[b].current_field_stint.cmp(&state[a].current_field_stint));

        let mut upcoming_off: Vec<PlayerId> = field
            .iter()
            .filter(|p| {
                !urgent_off.contains(p)
                    && targets.max_field_stint.saturating_sub(state[p].current_field_stint) <= self.tunables.look_ahead_window
            })
            .cloned()
            .collect();
        upcoming_off.sort_by(|a, b| state[b].current_field_stint.cmp(&state[a].current_field_stint));

        let mut proactive_off: Vec<PlayerId> = field.to_vec();
        proactive_off.sort_by(|a, b| {
            let score = |p: &PlayerId| (state[p].total_played as f64 - mean) + 0.5 * state[p].current_field_stint as f64;
            score(b).partial_cmp(&score(a)).unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut urgent_on: Vec<PlayerId> = bench
            .iter()
            .filter(|p| state[p].current_bench_stint >= targets.max_bench_stint)
            .cloned()
            .collect();
        urgent_on.sort_by(|a, b| {
            state[b]
                .current_bench_stint
                .cmp(&state[a].current_bench_stint)
                .then(state[b].total_benched.cmp(&state[a].total_benched))
        });

        let mut upcoming_on: Vec<PlayerId> = bench
            .iter()
            .filter(|p| {
                !urgent_on.contains(p)
                    && targets.max_bench_stint.saturating_sub(state[p].current_bench_stint) <= self.tunables.look_ahead_window
            })
            .cloned()
            .collect();
        upcoming_on.sort_by(|a, b| {
            state[b]
                .current_bench_stint
                .cmp(&state[a].current_bench_stint)
                .then(state[b].total_benched.cmp(&state[a].total_benched))
        });

        let mut proactive_on: Vec<PlayerId> = bench.to_vec();
        proactive_on.sort_by(|a, b| {
            let score =
                |p: &PlayerId| (mean - state[p].total_played as f64) + 0.5 * state[p].current_bench_stint as f64 + 0.1 * state[p].total_benched as f64;
            score(b).partial_cmp(&score(a)).unwrap_or(std::cmp::Ordering::Equal)
        });

        if !urgent_off.is_empty() || !urgent_on.is_empty() {
            let off_candidates: Vec<PlayerId> = urgent_off.into_iter().chain(upcoming_off).chain(proactive_off).collect();
            let on_candidates: Vec<PlayerId> = urgent_on.into_iter().chain(upcoming_on).chain(proactive_on).collect();
            let n = 2.min(off_candidates.len()).min(on_candidates.len());
            if n > 0 {
                return Some(RotationEvent::new(
                    t,
                    off_candidates[..n].to_vec(),
                    on_candidates[..n].to_vec(),
                    Some(Reason::Urgent),
                ));
            }
        }

        if variance > threshold {
            let n = self.config.swaps_per_change.min(field.len()).min(bench.len());
            if n > 0 {
                return Some(RotationEvent::new(t, proactive_off[..n].to_vec(), proactive_on[..n].to_vec(), Some(Reason::VarianceCorrection)));
            }
        }

        let projected_growth = Self::projected_deviation_growth(state, field, targets.min_sub_gap, mean);
        let late_game = t as f64 >= self.game_length as f64 * 0.7;
        let growth_threshold = if late_game { 90.0 } else { 60.0 };
        if projected_growth > growth_threshold {
            let n = self.config.swaps_per_change.min(field.len()).min(bench.len());
            if n > 0 {
                return Some(RotationEvent::new(t, proactive_off[..n].to_vec(), proactive_on[..n].to_vec(), Some(Reason::Proactive)));
            }
        }

        if !upcoming_off.is_empty() || !upcoming_on.is_empty() {
            let off_candidates: Vec<PlayerId> = upcoming_off.into_iter().chain(proactive_off).collect();
            let on_candidates: Vec<PlayerId> = upcoming_on.into_iter().chain(proactive_on).collect();
            let n = self.config.swaps_per_change.min(off_candidates.len()).min(on_candidates.len());
            if n > 0 {
                return Some(RotationEvent::new(t, off_candidates[..n].to_vec(), on_candidates[..n].to_vec(), Some(Reason::ScheduledBalance)));
            }
        }

        None
    }

    fn projected_deviation_growth(state: &FxHashMap<PlayerId, TrackedPlayer>, field: &[PlayerId], min_sub_gap: u32, mean: f64) -> f64 {
        let current = Self::variance(state);
        let projected_totals: Vec<f64> = state
            .iter()
            .filter(|(_, p)| p.status != PlayerStatus::Removed)
            .map(|(id, p)| {
                if field.contains(id) {
                    p.total_played as f64 + min_sub_gap as f64
                } else {
                    p.total_played as f64
                }
            })
            .collect();
        let max = projected_totals.iter().cloned().fold(f64::MIN, f64::max);
        let min = projected_totals.iter().cloned().fold(f64::MAX, f64::min);
        let _ = mean;
        (max - min) - current
    }

    /// Generates a complete forward plan from `t0` given a starting
    /// placement and per-player state (§4.3 "Full plan generation").
    /// Simulates in `check_interval` increments until `game_length - 30s`.
    ///
    /// `field`/`bench` are the *rotatable* players only — a caller holding
    /// exempt players (e.g. a goalkeeper) out of rotation excludes them
    /// before calling, so they never surface as `off`/`on` candidates.
    /// `required_field_size` is the rotatable field size that must hold for
    /// a plan to be produced at all, which may be smaller than the game's
    /// configured `field_size` whenever exempt players occupy some of it.
    pub fn generate_plan(
        &self,
        t0: u32,
        mut field: Vec<PlayerId>,
        mut bench: Vec<PlayerId>,
        mut state: FxHashMap<PlayerId, TrackedPlayer>,
        halftime_time: Option<u32>,
        required_field_size: usize,
    ) -> Result<Plan, RotationError> {
        let field_size = field.len();
        if field.len() < required_field_size {
            return Err(RotationError::MissingPlan { field_size: required_field_size, available: field.len() });
        }

        let active_count = field.len() + bench.len();
        let targets = DynamicTargets::compute(self.game_length, field_size, active_count, self.config);

        let mut events = Vec::new();
        let mut t = t0;
        // Starts at zero, not `min_sub_gap`: a freshly (re)generated plan
        // never fires its first event at `t0` itself, only after at least
        // one full gap has elapsed from the replan point.
        let mut time_since_last_sub = 0;
        let mut halftime_pending = halftime_time.is_some();
        let end = self.game_length.saturating_sub(30);
        let check_interval = self.tunables.check_interval.max(1);

        while t < end {
            let in_halftime_window = halftime_time.map(|h| t.abs_diff(h) <= 30).unwrap_or(false);

            if let Some(event) = self.decide(t, &field, &bench, &state, &targets, time_since_last_sub, halftime_pending, in_halftime_window) {
                for p in &event.off {
                    field.retain(|x| x != p);
                    bench.push(p.clone());
                    let entry = state.get_mut(p).unwrap();
                    entry.status = PlayerStatus::OnBench;
                    entry.current_bench_stint = 0;
                }
                for p in &event.on {
                    bench.retain(|x| x != p);
                    field.push(p.clone());
                    let entry = state.get_mut(p).unwrap();
                    entry.status = PlayerStatus::OnField;
                    entry.current_field_stint = 0;
                }
                if event.reason == Some(Reason::HalftimeRefresh) {
                    halftime_pending = false;
                }
                events.push(event);
                time_since_last_sub = 0;
            }

            for _ in 0..check_interval {
                for p in &field {
                    let e = state.get_mut(p).unwrap();
                    e.total_played += 1;
                    e.current_field_stint += 1;
                }
                for p in &bench {
                    let e = state.get_mut(p).unwrap();
                    e.total_benched += 1;
                    e.current_bench_stint += 1;
                }
            }
            t += check_interval;
            time_since_last_sub += check_interval;
        }

        Ok(Plan { events })
    }
}

pub fn initial_state(field: &[PlayerId], bench: &[PlayerId]) -> FxHashMap<PlayerId, TrackedPlayer> {
    let mut state = FxHashMap::default();
    for p in field {
        state.insert(p.clone(), TrackedPlayer::on_field(0, 0));
    }
    for p in bench {
        state.insert(p.clone(), TrackedPlayer::on_bench(0, 0));
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Tempo;

    fn ids(labels: &[&str]) -> Vec<PlayerId> {
        labels.iter().map(|l| PlayerId::new(*l)).collect()
    }

    fn config() -> GameConfig {
        GameConfig {
            field_size: 4,
            period_seconds: 1200,
            num_periods: 2,
            swaps_per_change: 1,
            warning_lead_seconds: 60,
            enable_early_warning: true,
            auto_confirm_rotations: false,
            ideal_shifts_override: None,
            tempo: Tempo::Balanced,
            tunables: TunableConstants::default(),
        }
    }

    #[test]
    fn dynamic_targets_shrink_min_sub_gap_for_short_games() {
        let config = config();
        let targets = DynamicTargets::compute(600, 4, 6, &config);
        assert!(targets.min_sub_gap >= 60);
        assert!(targets.min_sub_gap <= 420);
    }

    #[test]
    fn missing_plan_error_when_field_below_required_size() {
        let config = config();
        let optimizer = Optimizer::new(&config, 1200);
        let field = ids(&["A", "B", "C"]);
        let bench = ids(&["D"]);
        let state = initial_state(&field, &bench);
        let result = optimizer.generate_plan(0, field, bench, state, None, 4);
        assert!(matches!(result, Err(RotationError::MissingPlan { .. })));
    }

    #[test]
    fn generated_plan_has_strictly_increasing_times() {
        let config = config();
        let optimizer = Optimizer::new(&config, 1200);
        let field = ids(&["A", "B", "C", "D"]);
        let bench = ids(&["E", "F"]);
        let state = initial_state(&field, &bench);
        let plan = optimizer.generate_plan(0, field, bench, state, None, 4).unwrap();
        assert!(plan.times_strictly_increasing());
    }

    #[test]
    fn urgent_candidates_trigger_a_swap_once_stint_cap_reached() {
        let config = config();
        let optimizer = Optimizer::new(&config, 1200);
        let field = ids(&["A", "B", "C", "D"]);
        let bench = ids(&["E", "F"]);
        let mut state = initial_state(&field, &bench);
        for p in &field {
            state.get_mut(p).unwrap().current_field_stint = 10_000;
            state.get_mut(p).unwrap().total_played = 10_000;
        }
        let targets = DynamicTargets::compute(1200, 4, 6, &config);
        let event = optimizer.decide(100, &field, &bench, &state, &targets, 1000, false, false);
        assert!(event.is_some());
        assert_eq!(event.unwrap().reason, Some(Reason::Urgent));
    }
}
