//! Typed errors for the rotation core.
//!
//! Styled after the teacher's `thiserror`-derived error enums (see
//! `save::error::SaveError` in the original football engine) rather than the
//! hand-rolled `Display` impls used elsewhere in that codebase — the 6-kind
//! taxonomy in the design doc maps cleanly onto one `#[derive(Error)]` enum.

use thiserror::Error;

/// The six error kinds from the error-handling design. Kept as a separate
/// enum (rather than just matching on `RotationError` variants) because
/// `ErrorHandler` categorizes *all* error records, including ones that
/// never passed through a `Result` at all (e.g. a log-only warning).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Validation,
    State,
    Rotation,
    Timer,
    MissingPlan,
    Unrecoverable,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::State => "state",
            ErrorCategory::Rotation => "rotation",
            ErrorCategory::Timer => "timer",
            ErrorCategory::MissingPlan => "missing_plan",
            ErrorCategory::Unrecoverable => "unrecoverable",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RotationError {
    #[error("invalid setup: {0}")]
    Validation(String),

    #[error("duplicate player label: {0}")]
    DuplicatePlayer(String),

    #[error("field size {field_size} exceeds roster size {roster_size}")]
    FieldSizeExceedsRoster { field_size: usize, roster_size: usize },

    #[error("swaps_per_change {swaps} incompatible with field_size {field_size} and roster_size {roster_size}")]
    IncompatibleSwaps { swaps: usize, field_size: usize, roster_size: usize },

    #[error("placement invariant violated: {0}")]
    InvariantViolation(String),

    #[error("scheduled rotation invalid: {0}")]
    InvalidScheduledRotation(String),

    #[error("timer callback failed: {0}")]
    TimerFailure(String),

    #[error("optimizer has fewer than field_size ({field_size}) available players ({available})")]
    MissingPlan { field_size: usize, available: usize },

    #[error("operation invalid in current state: {0}")]
    InvalidState(String),

    #[error("unrecoverable: {0}")]
    Unrecoverable(String),
}

impl RotationError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            RotationError::Validation(_)
            | RotationError::DuplicatePlayer(_)
            | RotationError::FieldSizeExceedsRoster { .. }
            | RotationError::IncompatibleSwaps { .. } => ErrorCategory::Validation,
            RotationError::InvariantViolation(_) | RotationError::InvalidState(_) => {
                ErrorCategory::State
            }
            RotationError::InvalidScheduledRotation(_) => ErrorCategory::Rotation,
            RotationError::TimerFailure(_) => ErrorCategory::Timer,
            RotationError::MissingPlan { .. } => ErrorCategory::MissingPlan,
            RotationError::Unrecoverable(_) => ErrorCategory::Unrecoverable,
        }
    }
}

pub type Result<T> = std::result::Result<T, RotationError>;
