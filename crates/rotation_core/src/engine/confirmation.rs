//! Rotation confirmation and cancellation (design §4.4).

use tracing::{error, info};

use crate::error::RotationError;
use crate::error_handler::Severity;
use crate::event_bus::{EventKind, GameEvent};
use crate::models::plan::RotationEvent;

use super::game_engine::{EngineState, GameEngine};

/// Wall-clock delay past `scheduled_time`, past which a confirmation is
/// itself treated as a disruption requiring a recovery plan (§4.4).
const LATE_CONFIRM_THRESHOLD: u32 = 15;

impl GameEngine {
    /// `confirm_rotation()` (§6): applies the pending rotation atomically.
    pub fn confirm_rotation(&mut self) -> bool {
        if self.state != EngineState::RotationPending {
            return false;
        }
        let Some(pending) = self.pending_rotation.clone() else { return false };

        if pending.off.len() != pending.on.len() {
            return false;
        }
        if !pending.off.iter().all(|p| self.placement.field.contains(p)) {
            return false;
        }
        if !pending.on.iter().all(|p| self.placement.bench.contains(p)) {
            return false;
        }

        self.placement.field.retain(|p| !pending.off.contains(p));
        self.placement.field.extend(pending.on.iter().cloned());
        self.placement.bench.retain(|p| !pending.on.contains(p));
        self.placement.bench.extend(pending.off.iter().cloned());

        for p in &pending.off {
            self.ledger.clear_field_stint(p);
        }
        for p in &pending.on {
            self.ledger.start_field_stint(p, self.current_time);
        }

        if let Some(roster) = &self.roster {
            let field_size = self.config.as_ref().map(|c| c.field_size).unwrap_or(self.placement.field.len());
            if self.placement.validate(roster, field_size).is_err() {
                error!(time = self.current_time, "placement invariant violated after confirm, repairing");
                self.placement.fix(roster, field_size);
                self.errors.report_error(
                    &RotationError::InvariantViolation("placement repaired after confirm_rotation".into()),
                    Severity::Error,
                );
                self.bus.emit(GameEvent::new(EventKind::Error, self.current_time).with_message("placement repaired"));
            }
        }

        let rotation = RotationEvent::new(pending.scheduled_time, pending.off.clone(), pending.on.clone(), None);
        self.pending_rotation = None;
        self.state = EngineState::Running;
        self.plan_cursor += 1;
        self.early_warning_fired = false;
        self.imminent_warning_fired = false;

        self.bus.emit(GameEvent::new(EventKind::RotationConfirmed, self.current_time).with_rotation(rotation));
        info!(time = self.current_time, "rotation confirmed");

        let delay = self.current_time.saturating_sub(pending.scheduled_time);
        if delay > LATE_CONFIRM_THRESHOLD {
            self.replan("late confirmation");
        }

        true
    }

    /// `cancel_rotation()` (§6): always legal while pending; advances the
    /// cursor and triggers a recovery plan.
    pub fn cancel_rotation(&mut self) -> bool {
        if self.state != EngineState::RotationPending {
            return false;
        }
        self.pending_rotation = None;
        self.state = EngineState::Running;
        self.plan_cursor += 1;
        self.early_warning_fired = false;
        self.imminent_warning_fired = false;
        self.bus.emit(GameEvent::new(EventKind::RotationCancelled, self.current_time));
        self.replan("cancelled rotation");
        true
    }
}
