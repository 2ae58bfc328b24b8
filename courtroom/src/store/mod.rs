//! Message Store Client: stateless proxy to the CRUD collaborator
//!
//! The escalation core only needs create/update/list. `get` and `delete`
//! round out the record API for the terminal runner and tests.
//!
//! Two implementations:
//! - [`HttpMessageStore`]: talks to `/api/messages` over HTTP
//! - [`MemoryMessageStore`]: in-process stand-in with the same semantics
//!
//! [`StoreWriter`] sits in front of either one for fire-and-forget updates.

pub mod http;
pub mod memory;
pub mod writer;

use crate::message::{CreatedRecord, Message, MessageId, MessagePatch, NewMessage};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub use http::HttpMessageStore;
pub use memory::MemoryMessageStore;
pub use writer::StoreWriter;

/// Error types for store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Message not found: {0}")]
    NotFound(MessageId),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Shared reference to a message store
pub type SharedMessageStore = Arc<dyn MessageStore>;

/// Operations the core consumes from the persistence collaborator
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a new record and return its store identity
    async fn create(&self, message: &NewMessage) -> StoreResult<CreatedRecord>;

    /// Apply a partial update
    async fn update(&self, id: MessageId, patch: &MessagePatch) -> StoreResult<()>;

    /// All records, newest first
    async fn list(&self) -> StoreResult<Vec<Message>>;

    /// Fetch one record
    async fn get(&self, id: MessageId) -> StoreResult<Message>;

    /// Remove one record
    async fn delete(&self, id: MessageId) -> StoreResult<()>;
}
