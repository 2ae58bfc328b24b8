//! Store Writer: one background task that applies message updates in order
//!
//! The session loop never awaits the store. Patches are queued here and a
//! single writer applies them first-in first-out, so a message's urgent
//! update always lands before its fined update.

use super::SharedMessageStore;
use crate::message::{MessageId, MessagePatch};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

enum WriteOp {
    Update { id: MessageId, patch: MessagePatch },
    Flush(oneshot::Sender<()>),
}

/// Queue in front of [`super::MessageStore::update`]
pub struct StoreWriter {
    tx: mpsc::UnboundedSender<WriteOp>,
    task: JoinHandle<u64>,
}

impl StoreWriter {
    pub fn spawn(store: SharedMessageStore) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(store, rx));
        Self { tx, task }
    }

    /// Queue an update. Never blocks.
    pub fn submit(&self, id: MessageId, patch: MessagePatch) {
        if self.tx.send(WriteOp::Update { id, patch }).is_err() {
            warn!(message_id = id, "Store writer is gone, dropping update");
        }
    }

    /// Wait until every update queued so far has been attempted.
    pub async fn flush(&self) {
        let (done, flushed) = oneshot::channel();
        if self.tx.send(WriteOp::Flush(done)).is_ok() {
            let _ = flushed.await;
        }
    }

    /// Stop accepting updates and wait for the queue to drain.
    /// Returns how many updates the writer attempted.
    pub async fn close(self) -> u64 {
        drop(self.tx);
        self.task.await.unwrap_or_default()
    }
}

async fn run(store: SharedMessageStore, mut rx: mpsc::UnboundedReceiver<WriteOp>) -> u64 {
    let mut attempted = 0u64;
    while let Some(op) = rx.recv().await {
        match op {
            WriteOp::Update { id, patch } => {
                attempted += 1;
                if let Err(e) = store.update(id, &patch).await {
                    warn!(message_id = id, error = %e, "Failed to persist message update");
                }
            }
            WriteOp::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!(attempted, "Store writer drained");
    attempted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Category, MessageStatus, NewMessage};
    use crate::store::{MemoryMessageStore, MessageStore};
    use std::sync::Arc;

    async fn stored(store: &MemoryMessageStore) -> MessageId {
        store
            .create(&NewMessage {
                category: Category::Agile,
                text: "Fix User login".to_string(),
                status: MessageStatus::Normal,
                escalatable: true,
                law_broken: None,
                reason: None,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_updates_apply_in_order() {
        let store = Arc::new(MemoryMessageStore::new());
        let id = stored(&store).await;
        let writer = StoreWriter::spawn(store.clone());

        writer.submit(id, MessagePatch::status(MessageStatus::Urgent));
        writer.submit(id, MessagePatch::status(MessageStatus::Fined));
        writer.flush().await;

        assert_eq!(store.snapshot(id).unwrap().status, MessageStatus::Fined);
        assert_eq!(writer.close().await, 2);
    }

    #[tokio::test]
    async fn test_failed_update_does_not_stop_writer() {
        let store = Arc::new(MemoryMessageStore::new());
        let id = stored(&store).await;
        let writer = StoreWriter::spawn(store.clone());

        store.set_offline(true);
        writer.submit(id, MessagePatch::status(MessageStatus::Denied));
        writer.flush().await;
        store.set_offline(false);
        writer.submit(id, MessagePatch::status(MessageStatus::Resolved));

        assert_eq!(writer.close().await, 2);
        assert_eq!(store.snapshot(id).unwrap().status, MessageStatus::Resolved);
    }
}
