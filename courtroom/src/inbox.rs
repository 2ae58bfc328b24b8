//! Inbox Controller: owns the visible messages and every escalation timer
//!
//! All mutations go through `&mut self`, so whoever drives the controller
//! (the session loop, or a test) serializes user actions, arrivals and
//! timer firings. Store writes are best effort and never awaited: they go
//! to a [`StoreWriter`], failures are logged, and the in-memory inbox stays
//! the source of truth for the session.

use crate::catalog;
use crate::escalation::{
    EscalationEvent, EscalationPhase, EscalationReceiver, EscalationScheduler, EscalationTiming,
    Firing,
};
use crate::events::{CourtEvent, SharedEventBus};
use crate::message::{Message, MessageId, MessagePatch, MessageStatus};
use crate::overlay::{CourtOverlay, Ruling};
use crate::store::{SharedMessageStore, StoreWriter};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Error types for inbox actions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InboxError {
    #[error("Message {0} is not in the inbox")]
    NotInInbox(MessageId),
}

/// What `load_initial` did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadSummary {
    /// Records added to the visible set
    pub loaded: usize,
    /// Records armed for escalation
    pub armed: usize,
    /// Records whose violation was re-derived
    pub backfilled: usize,
}

/// Visible effect of a live timer firing
#[derive(Debug, Clone, PartialEq)]
pub enum EscalationOutcome {
    Escalated {
        message_id: MessageId,
        resurfaced: bool,
    },
    Fined {
        message_id: MessageId,
        ruling: Ruling,
        /// Ruling that was on screen and got overwritten
        replaced: Option<Ruling>,
    },
}

/// The inbox orchestrator
pub struct InboxController {
    store: SharedMessageStore,
    writer: StoreWriter,
    scheduler: EscalationScheduler,
    visible: Vec<Message>,
    overlay: CourtOverlay,
    bus: SharedEventBus,
}

impl InboxController {
    /// Create a controller; timer firings arrive on the returned receiver
    /// and must be passed back through [`Self::handle_escalation`].
    pub fn new(
        store: SharedMessageStore,
        timing: EscalationTiming,
        bus: SharedEventBus,
    ) -> (Self, EscalationReceiver) {
        let (scheduler, escalations) = EscalationScheduler::new(timing);
        let controller = Self {
            writer: StoreWriter::spawn(store.clone()),
            store,
            scheduler,
            visible: Vec::new(),
            overlay: CourtOverlay::new(),
            bus,
        };
        (controller, escalations)
    }

    /// Seed the inbox from the store and resume escalation for active
    /// escalatable records.
    pub async fn load_initial(&mut self) -> LoadSummary {
        let records = match self.store.list().await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Failed to load messages, starting with an empty inbox");
                Vec::new()
            }
        };

        let mut summary = LoadSummary::default();
        for mut record in records.into_iter().filter(|m| !m.status.is_retired()) {
            if self.position(record.id).is_some() {
                continue;
            }
            if catalog::backfill(&mut record) {
                summary.backfilled += 1;
            }
            if self.scheduler.arm(&record) {
                summary.armed += 1;
            }
            self.visible.push(record);
            summary.loaded += 1;
        }

        info!(
            loaded = summary.loaded,
            armed = summary.armed,
            backfilled = summary.backfilled,
            "Inbox loaded"
        );
        self.bus.publish(CourtEvent::InboxLoaded {
            loaded: summary.loaded,
            armed: summary.armed,
            timestamp: Utc::now(),
        });
        summary
    }

    /// Add a newly arrived message and arm it.
    pub fn admit(&mut self, message: Message) {
        if message.status.is_retired() || self.position(message.id).is_some() {
            debug!(message_id = message.id, "Ignoring duplicate or retired arrival");
            return;
        }
        self.scheduler.arm(&message);
        self.visible.push(message.clone());
        self.bus.publish(CourtEvent::MessageArrived {
            message,
            timestamp: Utc::now(),
        });
    }

    /// Resolve a message: cancel its timers, persist, remove it for good.
    pub fn accept(&mut self, id: MessageId) -> Result<Message, InboxError> {
        let index = self.position(id).ok_or(InboxError::NotInInbox(id))?;
        self.scheduler.retire(id);
        let message = self.visible.remove(index);

        self.persist(id, MessagePatch::status(MessageStatus::Resolved));
        debug!(message_id = id, "Message resolved");
        self.bus.publish(CourtEvent::MessageResolved {
            message_id: id,
            timestamp: Utc::now(),
        });
        Ok(message)
    }

    /// Deny a message: hide it and persist, leaving its timers running so
    /// an escalatable message comes back.
    pub fn deny(&mut self, id: MessageId) -> Result<Message, InboxError> {
        let index = self.position(id).ok_or(InboxError::NotInInbox(id))?;
        let message = self.visible.remove(index);

        self.persist(id, MessagePatch::status(MessageStatus::Denied));
        let still_armed = self.scheduler.is_armed(id);
        debug!(message_id = id, still_armed, "Message denied");
        self.bus.publish(CourtEvent::MessageDenied {
            message_id: id,
            still_armed,
            timestamp: Utc::now(),
        });
        Ok(message)
    }

    /// Apply a timer firing. Stale events (cancelled or already fired)
    /// return `None`.
    pub fn handle_escalation(&mut self, event: EscalationEvent) -> Option<EscalationOutcome> {
        match self.scheduler.fire(event)? {
            Firing::Urgent(snapshot) => Some(self.escalate(snapshot)),
            Firing::Court(snapshot) => Some(self.fine(snapshot)),
        }
    }

    fn escalate(&mut self, snapshot: Message) -> EscalationOutcome {
        let id = snapshot.id;
        let (escalated, resurfaced) = match self.position(id) {
            Some(index) => {
                self.visible[index].escalate();
                (self.visible[index].clone(), false)
            }
            None => {
                let mut message = snapshot;
                message.escalate();
                self.visible.push(message.clone());
                (message, true)
            }
        };

        self.persist(id, MessagePatch::escalated(&escalated));

        info!(message_id = id, resurfaced, "Message escalated to urgent");
        self.bus.publish(CourtEvent::MessageEscalated {
            message: escalated,
            resurfaced,
            timestamp: Utc::now(),
        });
        EscalationOutcome::Escalated {
            message_id: id,
            resurfaced,
        }
    }

    fn fine(&mut self, snapshot: Message) -> EscalationOutcome {
        let id = snapshot.id;
        self.persist(id, MessagePatch::status(MessageStatus::Fined));

        if let Some(index) = self.position(id) {
            self.visible.remove(index);
        }

        let ruling = Ruling::for_message(&snapshot);
        let replaced = self.overlay.show(ruling.clone());
        info!(message_id = id, law = %ruling.law, "Court ruling issued");
        self.bus.publish(CourtEvent::MessageFined {
            message_id: id,
            ruling: ruling.clone(),
            timestamp: Utc::now(),
        });
        EscalationOutcome::Fined {
            message_id: id,
            ruling,
            replaced,
        }
    }

    /// Acknowledge the current ruling
    pub fn dismiss_ruling(&mut self) -> Option<Ruling> {
        let ruling = self.overlay.dismiss()?;
        self.bus.publish(CourtEvent::RulingDismissed {
            ruling: ruling.clone(),
            timestamp: Utc::now(),
        });
        Some(ruling)
    }

    /// Cancel every outstanding escalation timer. Returns how many were live.
    pub fn teardown(&mut self) -> usize {
        let cancelled = self.scheduler.cancel_all();
        info!(cancelled, "Inbox torn down");
        cancelled
    }

    /// Wait for every queued store write to be attempted.
    pub async fn flush_writes(&self) {
        self.writer.flush().await;
    }

    fn persist(&self, id: MessageId, patch: MessagePatch) {
        // Placeholder ids were never stored.
        if id < 0 {
            debug!(message_id = id, "Skipping store update for placeholder id");
            return;
        }
        self.writer.submit(id, patch);
    }

    fn position(&self, id: MessageId) -> Option<usize> {
        self.visible.iter().position(|m| m.id == id)
    }

    /// Messages currently shown, in display order
    pub fn visible(&self) -> &[Message] {
        &self.visible
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.visible.iter().find(|m| m.id == id)
    }

    pub fn is_visible(&self, id: MessageId) -> bool {
        self.position(id).is_some()
    }

    pub fn ruling(&self) -> Option<&Ruling> {
        self.overlay.current()
    }

    pub fn overlay(&self) -> &CourtOverlay {
        &self.overlay
    }

    pub fn phase(&self, id: MessageId) -> EscalationPhase {
        self.scheduler.phase(id)
    }

    pub fn is_armed(&self, id: MessageId) -> bool {
        self.scheduler.is_armed(id)
    }

    pub fn armed_count(&self) -> usize {
        self.scheduler.armed_count()
    }

    pub fn bus(&self) -> &SharedEventBus {
        &self.bus
    }
}
