//! Typed pub/sub broker connecting engine state transitions to collaborators
//! (design §4.5).
//!
//! The engine's scheduling model is single-threaded cooperative (§5) — there
//! is no tokio runtime anywhere in this crate's dependency graph, matching
//! the teacher (`of_core` has no async runtime either; its own "Google
//! Football style" APIs are plain synchronous functions). `emit_async` is
//! therefore "async" only in name: it runs every handler to completion
//! before returning, same as `emit`, but exists as a distinct entry point so
//! a future executor-backed collaborator has somewhere to hook in without
//! changing the emit-ordering contract.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error_handler::ErrorRecord;
use crate::models::plan::{Plan, RotationEvent};
use crate::models::snapshot::GameSnapshot;

/// Fixed enumeration of emittable event names (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    GameStarted,
    GameStopped,
    RotationPending,
    RotationConfirmed,
    RotationCancelled,
    EmergencySubstitution,
    PlayerRemoved,
    PlayerReturned,
    PeriodEnd,
    GameEnded,
    StateValidated,
    Error,
    Warning,
}

/// Payload carried by a bus emission. Immutable once constructed — listeners
/// read, they never get a handle back into engine state (§5: "the event bus
/// is read-only to listeners").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameEvent {
    pub kind: EventKind,
    pub at_game_seconds: u32,
    pub timestamp: DateTime<Utc>,
    pub rotation: Option<RotationEvent>,
    pub plan: Option<Plan>,
    pub snapshot: Option<GameSnapshot>,
    pub error: Option<ErrorRecord>,
    pub message: Option<String>,
}

impl GameEvent {
    pub fn new(kind: EventKind, at_game_seconds: u32) -> Self {
        Self {
            kind,
            at_game_seconds,
            timestamp: Utc::now(),
            rotation: None,
            plan: None,
            snapshot: None,
            error: None,
            message: None,
        }
    }

    pub fn with_rotation(mut self, rotation: RotationEvent) -> Self {
        self.rotation = Some(rotation);
        self
    }

    pub fn with_plan(mut self, plan: Plan) -> Self {
        self.plan = Some(plan);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_error(mut self, error: ErrorRecord) -> Self {
        self.error = Some(error);
        self
    }
}

const RING_BUFFER_CAPACITY: usize = 50;

type Handler = Box<dyn FnMut(&GameEvent) + Send>;

struct Subscription {
    handler: Handler,
    once: bool,
    fired: bool,
}

/// Synchronous, ordered-per-subscriber pub/sub broker.
#[derive(Default)]
pub struct EventBus {
    subscribers: std::collections::HashMap<EventKind, Vec<Subscription>>,
    history: VecDeque<GameEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self { subscribers: std::collections::HashMap::new(), history: VecDeque::with_capacity(RING_BUFFER_CAPACITY) }
    }

    pub fn subscribe(&mut self, kind: EventKind, handler: impl FnMut(&GameEvent) + Send + 'static) {
        self.subscribers.entry(kind).or_default().push(Subscription {
            handler: Box::new(handler),
            once: false,
            fired: false,
        });
    }

    /// Registers a listener that auto-unsubscribes after its first firing.
    pub fn once(&mut self, kind: EventKind, handler: impl FnMut(&GameEvent) + Send + 'static) {
        self.subscribers.entry(kind).or_default().push(Subscription {
            handler: Box::new(handler),
            once: true,
            fired: false,
        });
    }

    /// Emits `event` to every subscriber of `event.kind`, in registration
    /// order, then records it in the ring buffer. Emission completes fully
    /// before this call returns (§5: "Event bus emits complete before the
    /// engine proceeds").
    pub fn emit(&mut self, event: GameEvent) {
        if let Some(subs) = self.subscribers.get_mut(&event.kind) {
            for sub in subs.iter_mut() {
                (sub.handler)(&event);
                sub.fired = true;
            }
            subs.retain(|sub| !(sub.once && sub.fired));
        }
        if self.history.len() >= RING_BUFFER_CAPACITY {
            self.history.pop_front();
        }
        self.history.push_back(event);
    }

    /// Same contract as `emit`; see module docs for why this isn't `async`.
    pub fn emit_async(&mut self, event: GameEvent) {
        self.emit(event);
    }

    pub fn history(&self) -> impl Iterator<Item = &GameEvent> {
        self.history.iter()
    }
}
