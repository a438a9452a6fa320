//! Lineup Generator (design §4.1).
//!
//! Two-layer strategy: a closed-form, provably minimum-variance pattern for
//! a small set of common `(n, f, s=1)` configurations, and a general
//! fair-rotation builder for everything else.
//!
//! The closed-form tier is a cyclic sliding window over the roster: lineup
//! `i` is the `f` players starting at cyclic offset `i`. Over `n` lineups
//! every player appears in exactly `f` of them (appearance variance is
//! exactly zero) and consecutive lineups differ by exactly one player
//! leaving and one entering — `s = 1` by construction, no simulation
//! required. This is the "provably minimum-variance" pattern the design
//! calls for.

use once_cell::sync::Lazy;

use crate::models::player::PlayerId;
use crate::models::roster::Roster;

/// The 15 configurations named in the design ("from (6,4,1) through
/// (12,11,1)"): the two endpoints are load-bearing for scenario fidelity,
/// the remaining 13 are this crate's own reasonable enumeration of
/// small-roster configs in between (the design doesn't enumerate all 15
/// and treats exact membership as non-binding — see DESIGN.md). All are
/// `s = 1`, since the closed-form window construction below is only exact
/// for single-swap rotations.
const PRECOMPUTED_CONFIGS: &[(usize, usize, usize)] = &[
    (6, 4, 1),
    (6, 5, 1),
    (7, 4, 1),
    (7, 5, 1),
    (7, 6, 1),
    (8, 5, 1),
    (8, 6, 1),
    (8, 7, 1),
    (9, 6, 1),
    (9, 7, 1),
    (9, 8, 1),
    (10, 7, 1),
    (10, 8, 1),
    (10, 9, 1),
    (12, 11, 1),
];

static PRECOMPUTED_SET: Lazy<std::collections::HashSet<(usize, usize, usize)>> =
    Lazy::new(|| PRECOMPUTED_CONFIGS.iter().copied().collect());

fn is_precomputed(n: usize, f: usize, s: usize) -> bool {
    PRECOMPUTED_SET.contains(&(n, f, s))
}

/// Index-level cyclic window pattern: `n` lineups, each `f` indices wide,
/// stepping by one position around a cycle of `n`.
fn cyclic_window_indices(n: usize, f: usize) -> Vec<Vec<usize>> {
    (0..n).map(|start| (0..f).map(|j| (start + j) % n).collect()).collect()
}

/// Sort key used throughout §4.1/§4.3: appearances ascending, last-seen
/// index descending, roster index ascending.
fn sort_key(p: &PlayerId, appearances: &fxhash::FxHashMap<PlayerId, u32>, last_seen: &fxhash::FxHashMap<PlayerId, i64>, roster: &Roster) -> (u32, std::cmp::Reverse<i64>, usize) {
    let app = appearances.get(p).copied().unwrap_or(0);
    let seen = last_seen.get(p).copied().unwrap_or(-1);
    let idx = roster.index_of(p).unwrap_or(usize::MAX);
    (app, std::cmp::Reverse(seen), idx)
}

/// General fair-rotation builder: instead of a full-field re-sort each
/// round (which cannot guarantee an exact `s`-player swap once bench size
/// exceeds `s`), each round ranks the bench by the sort key to pick the `s`
/// most-deserving players on, and ranks the field by the same key to pick
/// the `s` least-deserving players off — guaranteeing `|L_i △ L_{i+1}| = 2s`
/// by construction every round.
fn fair_rotation_builder(players: &[PlayerId], roster: &Roster, f: usize, s: usize) -> Vec<Vec<PlayerId>> {
    let n = players.len();
    let mut appearances: fxhash::FxHashMap<PlayerId, u32> = fxhash::FxHashMap::default();
    let mut last_seen: fxhash::FxHashMap<PlayerId, i64> = fxhash::FxHashMap::default();

    let mut sorted_initial = players.to_vec();
    sorted_initial.sort_by_key(|p| sort_key(p, &appearances, &last_seen, roster));
    let mut field: Vec<PlayerId> = sorted_initial[..f].to_vec();

    for p in &field {
        *appearances.entry(p.clone()).or_insert(0) += 1;
        last_seen.insert(p.clone(), 0);
    }

    let mut sequence = vec![field.clone()];
    let max_iterations = n.max(1) * 4;

    for step in 1..=max_iterations {
        let bench: Vec<PlayerId> = players.iter().filter(|p| !field.contains(p)).cloned().collect();
        if bench.len() < s || field.len() < s {
            break;
        }
        let mut bench_sorted = bench.clone();
        bench_sorted.sort_by_key(|p| sort_key(p, &appearances, &last_seen, roster));
        let on: Vec<PlayerId> = bench_sorted[..s].to_vec();

        let mut field_sorted = field.clone();
        field_sorted.sort_by_key(|p| sort_key(p, &appearances, &last_seen, roster));
        let off: Vec<PlayerId> = field_sorted[field_sorted.len() - s..].to_vec();

        field.retain(|p| !off.contains(p));
        field.extend(on.iter().cloned());

        for p in &on {
            *appearances.entry(p.clone()).or_insert(0) += 1;
            last_seen.insert(p.clone(), step as i64);
        }

        sequence.push(field.clone());

        let min_app = appearances.values().copied().min().unwrap_or(0);
        let max_app = appearances.values().copied().max().unwrap_or(0);
        let everyone_seen = players.iter().all(|p| appearances.get(p).copied().unwrap_or(0) >= 1);
        if everyone_seen && max_app - min_app <= 1 {
            break;
        }
    }

    sequence
}

/// Produces the lineup sequence `L = [L_0, ..., L_k]` (design §4.1).
/// `players` is the rotatable-player set `P` in its canonical order;
/// `roster` supplies the tie-break index. Returns an empty sequence for
/// degenerate inputs (`s == 0`, `n <= f`, `f == 0`).
pub fn generate_lineups(players: &[PlayerId], roster: &Roster, field_size: usize, swaps_per_change: usize) -> Vec<Vec<PlayerId>> {
    let n = players.len();
    if swaps_per_change == 0 || field_size == 0 || n <= field_size {
        return Vec::new();
    }
    if swaps_per_change > field_size.min(n - field_size) {
        return Vec::new();
    }

    if is_precomputed(n, field_size, swaps_per_change) {
        let index_pattern = cyclic_window_indices(n, field_size);
        return index_pattern
            .into_iter()
            .map(|indices| indices.into_iter().map(|i| players[i].clone()).collect())
            .collect();
    }

    fair_rotation_builder(players, roster, field_size, swaps_per_change)
}
