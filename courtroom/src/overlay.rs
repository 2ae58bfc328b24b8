//! Overlay Presenter: the single-slot court ruling

use crate::message::Message;
use serde::{Deserialize, Serialize};

/// Law shown when a message carries no violation
pub const DEFAULT_LAW: &str = "General Negligence";
/// Reason shown when a message carries no violation
pub const DEFAULT_REASON: &str = "Ignoring repeated critical issues";

/// A court ruling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ruling {
    pub law: String,
    pub reason: String,
}

impl Ruling {
    /// Ruling for a fined message, falling back to general negligence
    pub fn for_message(message: &Message) -> Self {
        Self {
            law: message
                .law_broken
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_LAW.to_string()),
            reason: message
                .reason
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_REASON.to_string()),
        }
    }
}

impl std::fmt::Display for Ruling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Law broken: {} ({})", self.law, self.reason)
    }
}

/// Holds at most one ruling; a new ruling replaces the current one.
#[derive(Debug, Default)]
pub struct CourtOverlay {
    current: Option<Ruling>,
    shown: u64,
}

impl CourtOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Display a ruling, returning the one it replaced
    pub fn show(&mut self, ruling: Ruling) -> Option<Ruling> {
        self.shown += 1;
        self.current.replace(ruling)
    }

    /// Clear the ruling, returning it
    pub fn dismiss(&mut self) -> Option<Ruling> {
        self.current.take()
    }

    pub fn current(&self) -> Option<&Ruling> {
        self.current.as_ref()
    }

    pub fn is_visible(&self) -> bool {
        self.current.is_some()
    }

    /// Total rulings shown this session
    pub fn shown_count(&self) -> u64 {
        self.shown
    }
}
