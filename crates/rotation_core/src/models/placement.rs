//! Placement (design §3): partitions the active roster into `field`,
//! `bench` and `removed`, plus the self-heal routine from §4.4
//! (`fix_placement`).
//!
//! Validation is grounded on the teacher's `FormationValidator`
//! (`of_core/src/models/match_setup.rs`) — a hand-rolled `Result<(), String>`
//! checker run after every setup/mutation rather than a declarative
//! `validator`-crate derive, because the invariants here are relational
//! (disjointness across three sets) rather than per-field range checks.

use crate::error::RotationError;
use crate::models::player::PlayerId;
use crate::models::roster::Roster;

#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub field: Vec<PlayerId>,
    pub bench: Vec<PlayerId>,
    pub removed: Vec<PlayerId>,
}

impl Placement {
    pub fn new(field: Vec<PlayerId>, bench: Vec<PlayerId>, removed: Vec<PlayerId>) -> Self {
        Self { field, bench, removed }
    }

    pub fn contains_field(&self, p: &PlayerId) -> bool {
        self.field.contains(p)
    }

    pub fn contains_bench(&self, p: &PlayerId) -> bool {
        self.bench.contains(p)
    }

    pub fn contains_removed(&self, p: &PlayerId) -> bool {
        self.removed.contains(p)
    }

    /// Active (non-removed) players, field first then bench, in their
    /// respective internal orders.
    pub fn active(&self) -> impl Iterator<Item = &PlayerId> {
        self.field.iter().chain(self.bench.iter())
    }

    pub fn active_count(&self) -> usize {
        self.field.len() + self.bench.len()
    }

    /// Checks the §3 invariants. Does not attempt repair — see `fix`.
    pub fn validate(&self, roster: &Roster, field_size: usize) -> Result<(), RotationError> {
        if self.field.len() != field_size {
            return Err(RotationError::InvariantViolation(format!(
                "field has {} players, expected {}",
                self.field.len(),
                field_size
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for p in self.field.iter().chain(self.bench.iter()).chain(self.removed.iter()) {
            if !seen.insert(p) {
                return Err(RotationError::InvariantViolation(format!("duplicate player {p} across sets")));
            }
        }
        for p in &self.field {
            if self.bench.contains(p) || self.removed.contains(p) {
                return Err(RotationError::InvariantViolation(format!("{p} in field and another set")));
            }
        }
        for p in &self.bench {
            if self.removed.contains(p) {
                return Err(RotationError::InvariantViolation(format!("{p} in bench and removed")));
            }
        }
        if seen.len() != roster.len() {
            return Err(RotationError::InvariantViolation(format!(
                "field+bench+removed covers {} players, roster has {}",
                seen.len(),
                roster.len()
            )));
        }
        for p in seen {
            if !roster.contains(p) {
                return Err(RotationError::InvariantViolation(format!("{p} not in roster")));
            }
        }
        Ok(())
    }

    /// Safety-net repair (design §4.4 "Placement self-heal"), not a primary
    /// path. If `field` has grown beyond `field_size`, the extra players
    /// (in their current order) move to the back of `bench`; if `field` has
    /// shrunk, players are pulled from the head of `bench` to fill it.
    /// `bench` is then rebuilt as `active \ field` and everything is
    /// deduped, preserving roster order for any newly-discovered members.
    ///
    /// Idempotent on an already-valid placement (§8 "Idempotence of
    /// validation").
    pub fn fix(&mut self, roster: &Roster, field_size: usize) {
        dedupe_preserve_order(&mut self.field);
        dedupe_preserve_order(&mut self.bench);
        dedupe_preserve_order(&mut self.removed);
        remove_from(&mut self.bench, &self.removed);
        remove_from(&mut self.field, &self.removed);

        if self.field.len() > field_size {
            let overflow = self.field.split_off(field_size);
            for p in overflow {
                if !self.bench.contains(&p) {
                    self.bench.push(p);
                }
            }
        } else {
            while self.field.len() < field_size {
                if let Some(p) = self.bench.first().cloned() {
                    self.bench.remove(0);
                    self.field.push(p);
                } else {
                    break;
                }
            }
        }

        // Rebuild bench as active \ field \ removed, keeping roster order
        // for anyone not already accounted for (e.g. a player present in
        // the roster but missing from every set due to upstream corruption).
        let mut accounted: std::collections::HashSet<PlayerId> =
            self.field.iter().chain(self.removed.iter()).cloned().collect();
        let mut rebuilt_bench: Vec<PlayerId> = self
            .bench
            .iter()
            .filter(|p| !accounted.contains(*p))
            .cloned()
            .collect();
        for p in &rebuilt_bench {
            accounted.insert(p.clone());
        }
        for p in roster.players() {
            if !accounted.contains(p) {
                rebuilt_bench.push(p.clone());
                accounted.insert(p.clone());
            }
        }
        self.bench = rebuilt_bench;
    }
}

fn dedupe_preserve_order(v: &mut Vec<PlayerId>) {
    let mut seen = std::collections::HashSet::new();
    v.retain(|p| seen.insert(p.clone()));
}

fn remove_from(v: &mut Vec<PlayerId>, excluded: &[PlayerId]) {
    v.retain(|p| !excluded.contains(p));
}
