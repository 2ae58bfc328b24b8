//! In-process message store
//!
//! Mirrors the HTTP store's behavior (ids from 1, newest-first listing,
//! `NotFound` for unknown ids). `set_offline(true)` makes every call fail
//! with `Unavailable`, for exercising the best-effort persistence paths.

use super::{MessageStore, StoreError, StoreResult};
use crate::message::{CreatedRecord, Message, MessageId, MessagePatch, NewMessage};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(Default)]
struct Records {
    next_id: MessageId,
    by_id: BTreeMap<MessageId, Message>,
}

/// Message store held in memory
#[derive(Default)]
pub struct MemoryMessageStore {
    records: Mutex<Records>,
    offline: AtomicBool,
    update_calls: AtomicU64,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an unreachable store
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of update calls received, including failed ones
    pub fn update_calls(&self) -> u64 {
        self.update_calls.load(Ordering::SeqCst)
    }

    /// Direct read without the async API (for assertions)
    pub fn snapshot(&self, id: MessageId) -> Option<Message> {
        self.lock().by_id.get(&id).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Records> {
        // A panic while holding the lock cannot leave a record half-written.
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn ensure_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store is offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn create(&self, message: &NewMessage) -> StoreResult<CreatedRecord> {
        self.ensure_online()?;
        if message.text.is_empty() {
            return Err(StoreError::Rejected {
                status: 400,
                message: "category and text are required".to_string(),
            });
        }

        let mut records = self.lock();
        records.next_id += 1;
        let id = records.next_id;
        let created_at = Utc::now();
        records.by_id.insert(
            id,
            Message {
                id,
                category: message.category,
                text: message.text.clone(),
                status: message.status,
                created_at,
                escalatable: message.escalatable,
                law_broken: message.law_broken.clone().filter(|s| !s.is_empty()),
                reason: message.reason.clone().filter(|s| !s.is_empty()),
            },
        );
        Ok(CreatedRecord { id, created_at })
    }

    async fn update(&self, id: MessageId, patch: &MessagePatch) -> StoreResult<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.ensure_online()?;

        let mut records = self.lock();
        let record = records.by_id.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if let Some(status) = patch.status {
            record.status = status;
        }
        if let Some(text) = &patch.text {
            record.text = text.clone();
        }
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<Message>> {
        self.ensure_online()?;
        let records = self.lock();
        let mut all: Vec<Message> = records.by_id.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(all)
    }

    async fn get(&self, id: MessageId) -> StoreResult<Message> {
        self.ensure_online()?;
        self.lock()
            .by_id
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn delete(&self, id: MessageId) -> StoreResult<()> {
        self.ensure_online()?;
        self.lock()
            .by_id
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }
}
