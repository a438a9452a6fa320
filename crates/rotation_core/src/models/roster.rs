//! Roster (design §3): ordered sequence of player identities, immutable
//! after initialization. Ordering is the deterministic tie-break used
//! throughout the Lineup Generator and Optimizer ("roster index ascending").

use fxhash::FxHashMap;

use crate::error::RotationError;
use crate::models::player::{PlayerId, PlayerMeta};

#[derive(Debug, Clone)]
pub struct Roster {
    order: Vec<PlayerId>,
    index: FxHashMap<PlayerId, usize>,
    meta: FxHashMap<PlayerId, PlayerMeta>,
}

impl Roster {
    /// Builds a roster from starters followed by reserves (§6 setup
    /// payload), rejecting duplicate labels.
    pub fn new(
        starters: Vec<PlayerId>,
        reserves: Vec<PlayerId>,
        meta: FxHashMap<PlayerId, PlayerMeta>,
    ) -> Result<Self, RotationError> {
        let order: Vec<PlayerId> = starters.into_iter().chain(reserves).collect();
        let mut index = FxHashMap::default();
        for (i, p) in order.iter().enumerate() {
            if index.insert(p.clone(), i).is_some() {
                return Err(RotationError::DuplicatePlayer(p.to_string()));
            }
        }
        Ok(Self { order, index, meta })
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn players(&self) -> &[PlayerId] {
        &self.order
    }

    pub fn contains(&self, p: &PlayerId) -> bool {
        self.index.contains_key(p)
    }

    /// Roster index used as the deterministic tie-break ("roster index
    /// ascending") throughout §4.1 and §4.3.
    pub fn index_of(&self, p: &PlayerId) -> Option<usize> {
        self.index.get(p).copied()
    }

    pub fn meta(&self, p: &PlayerId) -> Option<&PlayerMeta> {
        self.meta.get(p)
    }

    pub fn is_exempt(&self, p: &PlayerId) -> bool {
        self.meta.get(p).map(|m| m.exempt).unwrap_or(false)
    }

    /// Stable sort of an arbitrary player subset by roster index ascending.
    pub fn sort_by_roster_index(&self, players: &mut [PlayerId]) {
        players.sort_by_key(|p| self.index_of(p).unwrap_or(usize::MAX));
    }
}
