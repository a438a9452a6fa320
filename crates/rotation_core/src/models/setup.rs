//! Setup payload and initialize() result (design §6).

use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::config::Tempo;
use crate::models::player::{PlayerId, PlayerMeta};

/// The enumerated recognized setup options (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSetup {
    pub roster_starters: Vec<PlayerId>,
    pub roster_reserves: Vec<PlayerId>,
    pub field_size: usize,
    pub period_seconds: u32,
    pub num_periods: u8,
    pub swaps_per_change: usize,
    #[serde(default = "default_warning_lead")]
    pub warning_lead_seconds: u32,
    #[serde(default = "default_true")]
    pub enable_early_warning: bool,
    #[serde(default)]
    pub auto_confirm_rotations: bool,
    #[serde(default)]
    pub ideal_shifts_per_player: Option<u8>,
    #[serde(default)]
    pub tempo: Tempo,
    #[serde(default)]
    pub player_meta: FxHashMap<PlayerId, PlayerMeta>,
}

fn default_warning_lead() -> u32 {
    60
}

fn default_true() -> bool {
    true
}

/// Result of a successful `initialize()` call (§6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitializeResult {
    pub success: bool,
    pub roster_size: usize,
    pub rotations_planned: usize,
    pub target_seconds_per_player: f64,
    pub expected_variance: f64,
}
