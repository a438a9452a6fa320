//! Plan (design §3): ordered sequence of Rotation Events, replaced wholesale
//! on replan. `Reason` is the origin tag attached by whichever component
//! built the event (Plan Builder or Optimizer).

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::models::player::PlayerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum Reason {
    Urgent,
    VarianceCorrection,
    Proactive,
    ScheduledBalance,
    HalftimeRefresh,
    Emergency,
    Recovery,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationEvent {
    pub time: u32,
    pub off: Vec<PlayerId>,
    pub on: Vec<PlayerId>,
    pub reason: Option<Reason>,
}

impl RotationEvent {
    pub fn new(time: u32, off: Vec<PlayerId>, on: Vec<PlayerId>, reason: Option<Reason>) -> Self {
        Self { time, off, on, reason }
    }

    pub fn swap_count(&self) -> usize {
        self.off.len().min(self.on.len())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub events: Vec<RotationEvent>,
}

impl Plan {
    pub fn empty() -> Self {
        Self { events: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Next event strictly after `now`, if any.
    pub fn next_after(&self, now: u32) -> Option<&RotationEvent> {
        self.events.iter().find(|e| e.time > now)
    }

    /// First unfired event at-or-past `now` starting at `cursor` (the plan
    /// is consumed forward-only via the engine's plan cursor).
    pub fn at_or_after(&self, cursor: usize, now: u32) -> Option<(usize, &RotationEvent)> {
        self.events[cursor..]
            .iter()
            .enumerate()
            .map(|(i, e)| (cursor + i, e))
            .find(|(_, e)| e.time <= now)
    }

    /// Strictly-increasing-time invariant check (§3/§8).
    pub fn times_strictly_increasing(&self) -> bool {
        self.events.windows(2).all(|w| w[0].time < w[1].time)
    }
}

/// Pending Rotation (design §3): at most one outstanding at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingRotation {
    pub off: Vec<PlayerId>,
    pub on: Vec<PlayerId>,
    pub scheduled_time: u32,
}
