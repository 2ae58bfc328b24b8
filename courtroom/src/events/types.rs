//! Event types published by the inbox controller

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::{Message, MessageId};
use crate::overlay::Ruling;

/// Everything a presenter needs to follow a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CourtEvent {
    /// Initial records were loaded from the store
    InboxLoaded {
        loaded: usize,
        armed: usize,
        timestamp: DateTime<Utc>,
    },

    /// A fabricated message joined the inbox
    MessageArrived {
        message: Message,
        timestamp: DateTime<Utc>,
    },

    /// A message reached its urgent deadline
    MessageEscalated {
        message: Message,
        /// True if it had been denied and came back
        resurfaced: bool,
        timestamp: DateTime<Utc>,
    },

    /// The user accepted a message
    MessageResolved {
        message_id: MessageId,
        timestamp: DateTime<Utc>,
    },

    /// The user denied a message
    MessageDenied {
        message_id: MessageId,
        /// Whether its escalation timers are still running
        still_armed: bool,
        timestamp: DateTime<Utc>,
    },

    /// A message reached its court deadline
    MessageFined {
        message_id: MessageId,
        ruling: Ruling,
        timestamp: DateTime<Utc>,
    },

    /// The ruling overlay was acknowledged
    RulingDismissed {
        ruling: Ruling,
        timestamp: DateTime<Utc>,
    },

    /// The session was torn down
    SessionEnded {
        cancelled_timers: usize,
        timestamp: DateTime<Utc>,
    },
}

impl CourtEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::InboxLoaded { .. } => "inbox_loaded",
            Self::MessageArrived { .. } => "message_arrived",
            Self::MessageEscalated { .. } => "message_escalated",
            Self::MessageResolved { .. } => "message_resolved",
            Self::MessageDenied { .. } => "message_denied",
            Self::MessageFined { .. } => "message_fined",
            Self::RulingDismissed { .. } => "ruling_dismissed",
            Self::SessionEnded { .. } => "session_ended",
        }
    }

    /// Get the message ID if applicable
    pub fn message_id(&self) -> Option<MessageId> {
        match self {
            Self::MessageArrived { message, .. } | Self::MessageEscalated { message, .. } => {
                Some(message.id)
            }
            Self::MessageResolved { message_id, .. }
            | Self::MessageDenied { message_id, .. }
            | Self::MessageFined { message_id, .. } => Some(*message_id),
            _ => None,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::InboxLoaded { timestamp, .. }
            | Self::MessageArrived { timestamp, .. }
            | Self::MessageEscalated { timestamp, .. }
            | Self::MessageResolved { timestamp, .. }
            | Self::MessageDenied { timestamp, .. }
            | Self::MessageFined { timestamp, .. }
            | Self::RulingDismissed { timestamp, .. }
            | Self::SessionEnded { timestamp, .. } => *timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = CourtEvent::MessageFined {
            message_id: 3,
            ruling: Ruling {
                law: "Laws of Tort".to_string(),
                reason: "Known input validation flaw led to breach".to_string(),
            },
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "message_fined");
        assert_eq!(json["ruling"]["law"], "Laws of Tort");
        assert_eq!(event.event_type(), "message_fined");
        assert_eq!(event.message_id(), Some(3));
    }

    #[test]
    fn test_session_events_have_no_message_id() {
        let event = CourtEvent::SessionEnded {
            cancelled_timers: 2,
            timestamp: Utc::now(),
        };
        assert_eq!(event.message_id(), None);
    }
}
