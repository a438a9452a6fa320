//! Plan Builder (design §4.2): turns a lineup sequence into a timed plan
//! over a segment of duration `D`.
//!
//! Structurally named after the teacher's `plan_builder.rs`/`plan_window.rs`
//! pair (`of_core/src/engine/plan_builder.rs`) — a planning stage that
//! converts a coarse structure (there: ball/player position plan; here: a
//! lineup sequence) into a fine-grained, timed output — though the
//! semantics here (substitution timing, not ball physics) are unrelated.

use fxhash::FxHashMap;

use crate::config::TunableConstants;
use crate::models::plan::{Plan, Reason, RotationEvent};
use crate::models::player::PlayerId;

/// §4.2 step 1-3: the inter-event interval and the number of events that
/// fit, or `None` if no interval satisfies the constraints.
fn compute_interval(duration: u32, lineup_count: usize, min_interval: u32, end_buffer: u32) -> Option<(u32, usize)> {
    if lineup_count <= 1 {
        return None;
    }
    let event_count = lineup_count - 1;
    let initial_interval = duration / lineup_count as u32;

    if initial_interval >= min_interval {
        return Some((initial_interval, event_count));
    }

    let available = duration.saturating_sub(end_buffer);
    if available < min_interval {
        return None;
    }
    let max_events = (available / min_interval) as usize;
    if max_events == 0 {
        return None;
    }

    let (mut interval, mut events) = if max_events < event_count {
        (duration / (max_events as u32 + 1), max_events)
    } else {
        (min_interval, event_count)
    };

    if interval < min_interval {
        if duration >= min_interval + end_buffer {
            interval = min_interval;
        } else {
            return None;
        }
    }
    if events == 0 {
        return None;
    }

    Some((interval, events))
}

fn lineup_diff(prev: &[PlayerId], next: &[PlayerId], swaps_per_change: usize) -> (Vec<PlayerId>, Vec<PlayerId>) {
    let mut off: Vec<PlayerId> = prev.iter().filter(|p| !next.contains(p)).cloned().collect();
    let mut on: Vec<PlayerId> = next.iter().filter(|p| !prev.contains(p)).cloned().collect();
    let cap = off.len().min(on.len()).min(swaps_per_change.max(1));
    off.truncate(cap);
    on.truncate(cap);
    (off, on)
}

fn totals_at(pre: &FxHashMap<PlayerId, u32>, field: &[PlayerId], remaining: u32, all_players: &[PlayerId]) -> Vec<u32> {
    all_players
        .iter()
        .map(|p| {
            let base = pre.get(p).copied().unwrap_or(0);
            if field.contains(p) {
                base + remaining
            } else {
                base
            }
        })
        .collect()
}

fn spread(totals: &[u32]) -> u32 {
    let max = totals.iter().copied().max().unwrap_or(0);
    let min = totals.iter().copied().min().unwrap_or(0);
    max - min
}

/// Builds the plan over `[0, segment_duration)`. `lineups` is `L` from the
/// Lineup Generator; `all_players` is the full rotatable set used for
/// variance accounting.
pub fn build_plan(segment_duration: u32, lineups: &[Vec<PlayerId>], swaps_per_change: usize, tunables: &TunableConstants, all_players: &[PlayerId]) -> Plan {
    let Some((interval, max_events)) = compute_interval(
        segment_duration,
        lineups.len(),
        tunables.min_acceptable_sub_interval,
        tunables.end_buffer,
    ) else {
        return Plan::empty();
    };

    let cutoff = segment_duration.saturating_sub(tunables.end_buffer);
    let mut events = Vec::new();
    let mut pre_totals: FxHashMap<PlayerId, u32> = all_players.iter().map(|p| (p.clone(), 0)).collect();
    let mut current_field = lineups[0].clone();
    let mut last_time = 0u32;

    for i in 1..=max_events {
        let time = i as u32 * interval;
        if time > cutoff {
            break;
        }
        let segment_len = time - last_time;
        for p in all_players {
            if current_field.contains(p) {
                *pre_totals.entry(p.clone()).or_insert(0) += segment_len;
            }
        }
        let next_lineup = &lineups[i];
        let (off, on) = lineup_diff(&current_field, next_lineup, swaps_per_change);
        if !off.is_empty() {
            events.push(RotationEvent::new(time, off.clone(), on.clone(), Some(Reason::ScheduledBalance)));
            current_field.retain(|p| !off.contains(p));
            current_field.extend(on.iter().cloned());
        }
        last_time = time;
    }

    if events.is_empty() {
        return Plan::empty();
    }

    apply_end_game_equity_adjustment(events, segment_duration, &pre_totals, &current_field, all_players, last_time, swaps_per_change)
}

/// §4.2 end-game equity adjustment: compares the original final event (a)
/// against an alternative swap (b) and a no-sub variant (c), adopting
/// whichever improves projected end-of-segment variance by at least 5 s.
fn apply_end_game_equity_adjustment(
    mut events: Vec<RotationEvent>,
    segment_duration: u32,
    pre_totals_before_final: &FxHashMap<PlayerId, u32>,
    field_after_final: &[PlayerId],
    all_players: &[PlayerId],
    final_event_time: u32,
    swaps_per_change: usize,
) -> Plan {
    let final_event = events.last().cloned().unwrap();
    let field_before_final: Vec<PlayerId> = {
        let mut f = field_after_final.to_vec();
        f.retain(|p| !final_event.on.contains(p));
        f.extend(final_event.off.iter().cloned());
        f
    };

    let remaining = segment_duration.saturating_sub(final_event_time);

    // (a) original.
    let variant_a = spread(&totals_at(pre_totals_before_final, field_after_final, remaining, all_players));

    // (b) off = s field players with largest pre-final totals; on = s bench
    // players with smallest pre-final totals.
    let s = swaps_per_change.max(1).min(field_before_final.len());
    let mut field_sorted = field_before_final.clone();
    field_sorted.sort_by_key(|p| std::cmp::Reverse(pre_totals_before_final.get(p).copied().unwrap_or(0)));
    let off_b: Vec<PlayerId> = field_sorted[..s.min(field_sorted.len())].to_vec();

    let bench_before_final: Vec<PlayerId> = all_players.iter().filter(|p| !field_before_final.contains(p)).cloned().collect();
    let mut bench_sorted = bench_before_final.clone();
    bench_sorted.sort_by_key(|p| pre_totals_before_final.get(p).copied().unwrap_or(0));
    let on_b: Vec<PlayerId> = bench_sorted[..s.min(bench_sorted.len())].to_vec();

    let field_b: Vec<PlayerId> = field_before_final
        .iter()
        .filter(|p| !off_b.contains(p))
        .cloned()
        .chain(on_b.iter().cloned())
        .collect();
    let variant_b = spread(&totals_at(pre_totals_before_final, &field_b, remaining, all_players));

    // (c) no-sub: field stays as it was before the final event.
    let variant_c = spread(&totals_at(pre_totals_before_final, &field_before_final, remaining, all_players));

    let best = variant_b.min(variant_c);
    if variant_a.saturating_sub(best) >= 5 {
        if variant_c <= variant_b {
            events.pop();
        } else {
            let len = events.len();
            events[len - 1] = RotationEvent::new(final_event_time, off_b, on_b, final_event.reason);
        }
    }

    Plan { events }
}
