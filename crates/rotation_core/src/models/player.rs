//! Player identity (design §3: "opaque unique label").
//!
//! A newtype over `String` rather than a bare `String` parameter everywhere
//! — the teacher does the analogous thing for its own identifiers (e.g.
//! `Player` in the baseball-style event-file reference material wraps a
//! retrosheet ID rather than passing raw strings between APIs).

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PlayerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Optional per-player metadata from the setup payload (§6). `exempt` is the
/// supplemented role flag from SPEC_FULL §15 — a player (e.g. a goalkeeper)
/// who must never be auto-selected by the optimizer, neither as an urgent/
/// proactive `off` candidate nor as an `on` candidate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerMeta {
    pub position: Option<String>,
    pub jersey_number: Option<u16>,
    #[serde(default)]
    pub exempt: bool,
}
