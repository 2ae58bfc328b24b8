//! Message model shared by the store client, scheduler and inbox
//!
//! Field names follow the store's JSON wire format (camelCase, lowercase
//! statuses, capitalized categories).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned message identity. Negative values are local placeholders.
pub type MessageId = i64;

/// Prefix applied to a message's text when it escalates to urgent
pub const URGENT_PREFIX: &str = "URGENT: ";

/// Who the message is from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Boss,
    Family,
    Agile,
}

impl Category {
    /// Every category, in catalog order
    pub const ALL: [Category; 3] = [Category::Boss, Category::Family, Category::Agile];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boss => "Boss",
            Self::Family => "Family",
            Self::Agile => "Agile",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Message lifecycle status
///
/// ```text
/// normal ──(urgent deadline)──▶ urgent
///   │  │                          │
///   │  └──(deny)──▶ denied ───────┤ (urgent deadline re-surfaces it)
///   │                             │
///   ├──(accept)──▶ resolved       ├──(accept)──▶ resolved
///   └──(court deadline)──▶ fined ◀┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Normal,
    Urgent,
    Resolved,
    Fined,
    Denied,
}

impl MessageStatus {
    /// Retired messages are never displayed or armed again.
    pub fn is_retired(self) -> bool {
        matches!(self, Self::Resolved | Self::Fined)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Urgent => "urgent",
            Self::Resolved => "resolved",
            Self::Fined => "fined",
            Self::Denied => "denied",
        }
    }
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// A task message shown in the inbox
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub category: Category,
    pub text: String,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
    /// Fixed at creation by the classifier
    #[serde(default)]
    pub escalatable: bool,
    #[serde(default)]
    pub law_broken: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl Message {
    /// Text the message carries once escalated. Already-prefixed text
    /// (an urgent record reloaded from the store) is not prefixed twice.
    pub fn urgent_text(&self) -> String {
        if self.text.starts_with(URGENT_PREFIX) {
            self.text.clone()
        } else {
            format!("{}{}", URGENT_PREFIX, self.text)
        }
    }

    /// Mark urgent and prefix the text, in place.
    pub fn escalate(&mut self) {
        self.text = self.urgent_text();
        self.status = MessageStatus::Urgent;
    }

    /// Payload used to create this message in the store
    pub fn to_new(&self) -> NewMessage {
        NewMessage {
            category: self.category,
            text: self.text.clone(),
            status: self.status,
            escalatable: self.escalatable,
            law_broken: self.law_broken.clone(),
            reason: self.reason.clone(),
        }
    }
}

/// Create request body for `POST /api/messages`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub category: Category,
    pub text: String,
    pub status: MessageStatus,
    pub escalatable: bool,
    pub law_broken: Option<String>,
    pub reason: Option<String>,
}

/// Partial update body for `PUT /api/messages/{id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MessageStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl MessagePatch {
    pub fn status(status: MessageStatus) -> Self {
        Self {
            status: Some(status),
            text: None,
        }
    }

    pub fn escalated(message: &Message) -> Self {
        Self {
            status: Some(MessageStatus::Urgent),
            text: Some(message.urgent_text()),
        }
    }
}

/// The part of a created record the core cares about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedRecord {
    pub id: MessageId,
    pub created_at: DateTime<Utc>,
}
