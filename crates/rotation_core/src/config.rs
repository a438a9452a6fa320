//! Tunable constants and game configuration (SPEC_FULL §13).
//!
//! Grounded on the teacher's `ThresholdsConfig` pattern
//! (`of_core/src/engine/config/thresholds_config.rs`): a `Default` baseline,
//! named presets, and an environment-variable override hook — here,
//! `Tempo::from_env_or_default()` reads `ROTATION_TEMPO` the way the
//! teacher's `ThresholdsConfig::from_env_or_default()` reads
//! `OF_THRESHOLD_PROFILE`.

use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use validator::Validate;

use crate::error::RotationError;

/// The §6 compile-time defaults, as an overridable struct rather than bare
/// `const`s (the teacher's stated rationale for `ThresholdsConfig`: "instead
/// of hardcoded magic numbers, thresholds can be configured via presets").
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TunableConstants {
    pub min_acceptable_sub_interval: u32,
    pub end_buffer: u32,
    pub min_field_stint: u32,
    pub max_tick_catchup: u32,
    pub max_visibility_catchup: u32,
    pub validation_interval: u32,
    pub check_interval: u32,
    pub look_ahead_window: u32,
    pub variance_goal_balanced: u32,
    /// Upper bound of `dynamic_variance_threshold` at `t=0` (§4.3); the
    /// threshold relaxes linearly from this down to the tempo's
    /// `variance_goal` over the course of the game.
    pub max_early_variance: u32,
}

impl Default for TunableConstants {
    fn default() -> Self {
        Self {
            min_acceptable_sub_interval: 60,
            end_buffer: 30,
            min_field_stint: 180,
            max_tick_catchup: 10,
            max_visibility_catchup: 3600,
            validation_interval: 30,
            check_interval: 15,
            look_ahead_window: 60,
            variance_goal_balanced: 60,
            max_early_variance: 180,
        }
    }
}

/// Tempo selects the Optimizer's `variance_goal` (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default)]
#[strum(serialize_all = "snake_case")]
pub enum Tempo {
    #[default]
    Balanced,
    Aggressive,
    Conservative,
}

impl Tempo {
    pub fn variance_goal_seconds(&self) -> u32 {
        match self {
            Tempo::Balanced => 60,
            Tempo::Aggressive => 45,
            Tempo::Conservative => 75,
        }
    }

    /// Reads `ROTATION_TEMPO` (case-insensitive `balanced`/`aggressive`/
    /// `conservative`), falling back to `Balanced` on anything unset or
    /// unparseable.
    pub fn from_env_or_default() -> Self {
        env::var("ROTATION_TEMPO")
            .ok()
            .and_then(|v| Tempo::from_str(&v.to_lowercase()).ok())
            .unwrap_or_default()
    }
}

/// Game Configuration (design §3): immutable per game, validated at
/// construction. Declarative range checks use the `validator` derive
/// (matching the dependency the teacher already carries); the one
/// cross-field rule (`swaps_per_change <= min(n - f, f)`) is hand-rolled in
/// `GameSetup::into_config`, same hybrid the teacher's own
/// `FormationValidator` uses despite `validator` being available.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct GameConfig {
    #[validate(range(min = 1))]
    pub field_size: usize,
    #[validate(range(min = 1))]
    pub period_seconds: u32,
    pub num_periods: u8,
    #[validate(range(min = 1))]
    pub swaps_per_change: usize,
    pub warning_lead_seconds: u32,
    pub enable_early_warning: bool,
    pub auto_confirm_rotations: bool,
    pub ideal_shifts_override: Option<u8>,
    pub tempo: Tempo,
    pub tunables: TunableConstants,
}

impl GameConfig {
    pub fn validate_all(&self) -> Result<(), RotationError> {
        self.validate().map_err(|e| RotationError::Validation(e.to_string()))?;
        if !matches!(self.num_periods, 2 | 4) {
            return Err(RotationError::Validation(format!(
                "num_periods must be 2 (halves) or 4 (quarters), got {}",
                self.num_periods
            )));
        }
        Ok(())
    }

    pub fn game_length_seconds(&self) -> u32 {
        self.period_seconds * self.num_periods as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tempo_variance_goals_match_spec() {
        assert_eq!(Tempo::Balanced.variance_goal_seconds(), 60);
        assert_eq!(Tempo::Aggressive.variance_goal_seconds(), 45);
        assert_eq!(Tempo::Conservative.variance_goal_seconds(), 75);
    }

    #[test]
    fn rejects_zero_field_size() {
        let config = GameConfig {
            field_size: 0,
            period_seconds: 1200,
            num_periods: 2,
            swaps_per_change: 1,
            warning_lead_seconds: 60,
            enable_early_warning: true,
            auto_confirm_rotations: false,
            ideal_shifts_override: None,
            tempo: Tempo::Balanced,
            tunables: TunableConstants::default(),
        };
        assert!(config.validate_all().is_err());
    }

    #[test]
    fn rejects_odd_period_count() {
        let config = GameConfig {
            field_size: 4,
            period_seconds: 1200,
            num_periods: 3,
            swaps_per_change: 1,
            warning_lead_seconds: 60,
            enable_early_warning: true,
            auto_confirm_rotations: false,
            ideal_shifts_override: None,
            tempo: Tempo::Balanced,
            tunables: TunableConstants::default(),
        };
        assert!(config.validate_all().is_err());
    }
}
