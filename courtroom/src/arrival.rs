//! Arrival Generator: a steady drip of new inbox messages
//!
//! One task, one pending timer at a time:
//!
//! ```text
//! ┌─▶ sleep(base + jitter) ─▶ fabricate ─▶ store.create ─▶ send to inbox ─┐
//! └────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The loop stops when its cancellation token fires or the inbox side of
//! the channel goes away. A `store.create` already sent is never abandoned:
//! the loop finishes it and hands the message over before exiting.
//! Stopping returns the generator, so a resumed loop keeps its random
//! sequence and placeholder counter.

use crate::catalog;
use crate::escalation::ArrivalTiming;
use crate::message::{Message, MessageId, MessageStatus};
use crate::store::SharedMessageStore;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Fabricates messages and persists them
pub struct ArrivalGenerator {
    timing: ArrivalTiming,
    store: SharedMessageStore,
    rng: StdRng,
    next_placeholder: MessageId,
}

impl ArrivalGenerator {
    pub fn new(timing: ArrivalTiming, store: SharedMessageStore, rng: StdRng) -> Self {
        Self {
            timing,
            store,
            rng,
            next_placeholder: -1,
        }
    }

    /// Seeded for reproducible sessions, entropy otherwise
    pub fn with_seed(timing: ArrivalTiming, store: SharedMessageStore, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::new(timing, store, rng)
    }

    /// `base + uniform[0, jitter)`, at millisecond granularity
    pub fn next_delay(&mut self) -> Duration {
        let jitter_ms = self.timing.jitter.as_millis() as u64;
        let extra = if jitter_ms == 0 {
            0
        } else {
            self.rng.gen_range(0..jitter_ms)
        };
        self.timing.base + Duration::from_millis(extra)
    }

    /// Build a classified message with a negative placeholder id
    pub fn fabricate(&mut self) -> Message {
        let category = catalog::random_category(&mut self.rng);
        let text = catalog::pick(&mut self.rng, category);

        let id = self.next_placeholder;
        self.next_placeholder -= 1;

        let (escalatable, law_broken, reason) = match catalog::classify(text) {
            catalog::Classification::Escalatable { law_broken, reason } => {
                (true, Some(law_broken), Some(reason))
            }
            catalog::Classification::Benign => (false, None, None),
        };

        Message {
            id,
            category,
            text: text.to_string(),
            status: MessageStatus::Normal,
            created_at: Utc::now(),
            escalatable,
            law_broken,
            reason,
        }
    }

    /// Next placeholder id this generator will hand out
    pub fn next_placeholder(&self) -> MessageId {
        self.next_placeholder
    }

    /// Never hand out a placeholder at or above `id`.
    pub fn continue_below(&mut self, id: MessageId) {
        self.next_placeholder = self.next_placeholder.min(id - 1);
    }

    /// Persist a fabricated message; on failure keep the placeholder.
    pub async fn deliver(&self, draft: Message) -> Message {
        match self.store.create(&draft.to_new()).await {
            Ok(created) => Message {
                id: created.id,
                created_at: created.created_at,
                ..draft
            },
            Err(e) => {
                warn!(
                    placeholder = draft.id,
                    error = %e,
                    "Failed to persist arrival, keeping placeholder id"
                );
                draft
            }
        }
    }

    /// Run the loop on its own task.
    pub fn spawn(self, tx: mpsc::Sender<Message>) -> ArrivalLoop {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(self.run(tx, cancel.clone()));
        ArrivalLoop {
            cancel,
            task: Some(task),
        }
    }

    async fn run(
        mut self,
        tx: mpsc::Sender<Message>,
        cancel: CancellationToken,
    ) -> (Self, u64) {
        let mut delivered = 0u64;
        loop {
            let delay = self.next_delay();
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }

            // Not cancellable: the store may keep the record either way.
            let draft = self.fabricate();
            let message = self.deliver(draft).await;
            debug!(message_id = message.id, category = %message.category, "Message arrived");

            let permit = tokio::select! {
                _ = cancel.cancelled() => {
                    match tx.try_send(message) {
                        Ok(()) => delivered += 1,
                        Err(e) => warn!(error = %e, "Arrival dropped while stopping"),
                    }
                    break;
                }
                permit = tx.reserve() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };
            permit.send(message);
            delivered += 1;
        }
        info!(delivered, "Arrival loop stopped");
        (self, delivered)
    }
}

/// What a stopped loop hands back
pub struct StoppedArrivals {
    /// Messages sent to the inbox by this run
    pub delivered: u64,
    /// `None` only if the loop task panicked
    pub generator: Option<ArrivalGenerator>,
}

/// Handle to a running arrival loop. Dropping it cancels the loop.
pub struct ArrivalLoop {
    cancel: CancellationToken,
    task: Option<JoinHandle<(ArrivalGenerator, u64)>>,
}

impl ArrivalLoop {
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Cancel the pending timer and wait for the loop to exit. An
    /// in-flight create is allowed to finish first.
    pub async fn stop(mut self) -> StoppedArrivals {
        self.cancel.cancel();
        let Some(task) = self.task.take() else {
            return StoppedArrivals {
                delivered: 0,
                generator: None,
            };
        };
        match task.await {
            Ok((generator, delivered)) => StoppedArrivals {
                delivered,
                generator: Some(generator),
            },
            Err(e) => {
                warn!(error = %e, "Arrival loop task failed");
                StoppedArrivals {
                    delivered: 0,
                    generator: None,
                }
            }
        }
    }
}

impl Drop for ArrivalLoop {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
