//! Persisted snapshot format (design §6) for collaborator use: a lossless,
//! round-trippable record of everything needed to resume a game.
//!
//! Grounded on `of_core/src/engine/snapshot.rs`'s `MatchStateSnapshot`:
//! every field added after the initial schema carries `#[serde(default)]`
//! so older snapshots keep deserializing as the schema grows (SPEC_FULL
//! §15). Bit-exactness is not required, only a lossless round trip (§6).

use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::models::ledger::MinuteLedger;
use crate::models::placement::Placement;
use crate::models::plan::{PendingRotation, Plan};
use crate::models::player::PlayerId;

pub const SCHEMA_VERSION: u8 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSnapshot {
    #[serde(default = "default_schema_version")]
    pub schema_version: u8,
    pub placement: Placement,
    pub ledger: MinuteLedger,
    pub plan: Plan,
    pub plan_cursor: usize,
    pub pending_rotation: Option<PendingRotation>,
    pub current_time: u32,
    pub current_period: u8,
    pub period_elapsed: u32,
    /// Opaque, engine-held, planning-irrelevant counters (§1: "sport-specific
    /// scoring is modeled as an opaque counter the engine holds but does not
    /// interpret"). Keys and values are collaborator-defined.
    #[serde(default)]
    pub scoring_counters: FxHashMap<String, i64>,
}

fn default_schema_version() -> u8 {
    SCHEMA_VERSION
}
