//! Categorized error record, bounded log, listener fan-out (design §4.6).
//!
//! Independent of `Result`-based error propagation (`error::RotationError`):
//! this is the thing a UI collaborator subscribes to for a status banner,
//! not a control-flow mechanism. Grounded on the teacher's `ApiError`/
//! `ApiResponse<T>` structured-error pattern
//! (`of_core/src/api/player_json.rs`) generalized from a one-shot API
//! response into a running, bounded log with listeners.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorCategory, RotationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

/// One entry in the error handler's bounded log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub severity: Severity,
    pub category: ErrorCategory,
    pub context: String,
    pub data: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl ErrorRecord {
    pub fn new(severity: Severity, category: ErrorCategory, context: impl Into<String>) -> Self {
        Self { severity, category, context: context.into(), data: None, timestamp: Utc::now() }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Bridges a typed `RotationError` into the categorized log, per §12.
    pub fn from_error(err: &RotationError, severity: Severity) -> Self {
        Self::new(severity, err.category(), err.to_string())
    }
}

const LOG_CAPACITY: usize = 100;

type Listener = Box<dyn FnMut(&ErrorRecord) + Send>;

/// Fixed-capacity error log with registered listeners.
///
/// No retry policy is imposed here (per §4.6) — callers decide whether and
/// how to retry; this module only records and notifies.
#[derive(Default)]
pub struct ErrorHandler {
    log: VecDeque<ErrorRecord>,
    listeners: Vec<Listener>,
}

impl ErrorHandler {
    pub fn new() -> Self {
        Self { log: VecDeque::with_capacity(LOG_CAPACITY), listeners: Vec::new() }
    }

    pub fn on_error(&mut self, listener: impl FnMut(&ErrorRecord) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Records a record, trimming the oldest entry once over capacity, and
    /// fans it out to listeners. A listener panicking would otherwise take
    /// down the caller; we don't catch panics (the teacher doesn't either)
    /// but listener *logic* errors are simply not possible here since
    /// listeners take `&ErrorRecord` and return nothing.
    pub fn report(&mut self, record: ErrorRecord) {
        if self.log.len() >= LOG_CAPACITY {
            self.log.pop_front();
        }
        for listener in &mut self.listeners {
            listener(&record);
        }
        self.log.push_back(record);
    }

    pub fn report_error(&mut self, err: &RotationError, severity: Severity) {
        self.report(ErrorRecord::from_error(err, severity));
    }

    pub fn log(&self) -> impl Iterator<Item = &ErrorRecord> {
        self.log.iter()
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// Runs `f`, reporting and returning `fallback` on error instead of
    /// propagating — the "try" helper from §4.6.
    pub fn try_or<T>(&mut self, severity: Severity, fallback: T, f: impl FnOnce() -> Result<T, RotationError>) -> T {
        match f() {
            Ok(v) => v,
            Err(e) => {
                self.report_error(&e, severity);
                fallback
            }
        }
    }
}
