//! Escalation Scheduler: per-message urgent/court deadline pairs
//!
//! Arming a message spawns two one-shot timer tasks measured from the same
//! arm instant. Each task only posts an [`EscalationEvent`] on a channel;
//! the owner of the scheduler (the inbox controller) receives it and calls
//! [`EscalationScheduler::fire`], which checks the event still belongs to a
//! live arm before reporting a [`Firing`]. This keeps cancellation
//! effective even for events already sitting in the channel.
//!
//! ```text
//! arm ──┬── sleep(urgent_after) ──▶ Urgent event ──▶ fire() ──▶ Firing::Urgent
//!       └── sleep(court_after)  ──▶ Court event  ──▶ fire() ──▶ Firing::Court (retires)
//! ```

use super::timing::EscalationTiming;
use crate::message::{Message, MessageId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Identifies one arm of one message
pub type ArmId = u64;

/// Receiving side of the scheduler's event channel
pub type EscalationReceiver = mpsc::UnboundedReceiver<EscalationEvent>;

/// Which deadline elapsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationStage {
    Urgent,
    Court,
}

impl std::fmt::Display for EscalationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Urgent => write!(f, "urgent"),
            Self::Court => write!(f, "court"),
        }
    }
}

/// Posted by a timer task when its deadline elapses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscalationEvent {
    pub message_id: MessageId,
    pub arm_id: ArmId,
    pub stage: EscalationStage,
}

/// Where a message is in its escalation lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationPhase {
    /// No live timers
    Unarmed,
    /// Both deadlines pending
    Armed,
    /// Urgent fired, court pending
    UrgentFired,
    /// Resolved or fined; never armed again
    Retired,
}

/// A live firing the controller must apply
#[derive(Debug, Clone, PartialEq)]
pub enum Firing {
    /// Carries the message as it was when armed
    Urgent(Message),
    /// Carries the message as it was when armed; the arm is now retired
    Court(Message),
}

/// Live timer pair for one message. Dropping the handle aborts both timers.
pub struct EscalationHandle {
    arm_id: ArmId,
    snapshot: Message,
    armed_at: Instant,
    urgent_fired: bool,
    urgent_task: JoinHandle<()>,
    court_task: JoinHandle<()>,
}

impl EscalationHandle {
    pub fn arm_id(&self) -> ArmId {
        self.arm_id
    }

    /// The message as it was when armed
    pub fn snapshot(&self) -> &Message {
        &self.snapshot
    }

    pub fn armed_at(&self) -> Instant {
        self.armed_at
    }

    pub fn urgent_fired(&self) -> bool {
        self.urgent_fired
    }
}

impl Drop for EscalationHandle {
    fn drop(&mut self) {
        self.urgent_task.abort();
        self.court_task.abort();
    }
}

/// Owns every armed message's timers
pub struct EscalationScheduler {
    timing: EscalationTiming,
    tx: mpsc::UnboundedSender<EscalationEvent>,
    armed: HashMap<MessageId, EscalationHandle>,
    /// Resolved and fined ids. Only grows, bounded by the messages one
    /// session sees; survives `cancel_all`.
    retired: HashSet<MessageId>,
    next_arm_id: ArmId,
}

impl EscalationScheduler {
    /// Create a scheduler and the receiver its timers post to
    pub fn new(timing: EscalationTiming) -> (Self, EscalationReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            timing,
            tx,
            armed: HashMap::new(),
            retired: HashSet::new(),
            next_arm_id: 1,
        };
        (scheduler, rx)
    }

    pub fn timing(&self) -> EscalationTiming {
        self.timing
    }

    /// Start the urgent/court deadlines for a message.
    ///
    /// Returns false (and does nothing) if the message is not escalatable,
    /// already has live timers, or has been retired. Must be called from
    /// within a tokio runtime.
    pub fn arm(&mut self, message: &Message) -> bool {
        if !message.escalatable
            || self.armed.contains_key(&message.id)
            || self.retired.contains(&message.id)
        {
            return false;
        }

        let arm_id = self.next_arm_id;
        self.next_arm_id += 1;

        let armed_at = Instant::now();
        let urgent_task = self.spawn_deadline(
            armed_at + self.timing.urgent_after,
            EscalationEvent {
                message_id: message.id,
                arm_id,
                stage: EscalationStage::Urgent,
            },
        );
        let court_task = self.spawn_deadline(
            armed_at + self.timing.court_after,
            EscalationEvent {
                message_id: message.id,
                arm_id,
                stage: EscalationStage::Court,
            },
        );

        debug!(
            message_id = message.id,
            arm_id,
            urgent_after = ?self.timing.urgent_after,
            court_after = ?self.timing.court_after,
            "Escalation armed"
        );

        self.armed.insert(
            message.id,
            EscalationHandle {
                arm_id,
                snapshot: message.clone(),
                armed_at,
                urgent_fired: false,
                urgent_task,
                court_task,
            },
        );
        true
    }

    fn spawn_deadline(&self, deadline: Instant, event: EscalationEvent) -> JoinHandle<()> {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if tx.send(event).is_err() {
                trace!(message_id = event.message_id, "Escalation receiver gone");
            }
        })
    }

    /// Clear both deadlines. Idempotent; returns whether timers were live.
    pub fn cancel(&mut self, id: MessageId) -> bool {
        let cancelled = self.armed.remove(&id).is_some();
        if cancelled {
            debug!(message_id = id, "Escalation cancelled");
        }
        cancelled
    }

    /// Cancel and refuse any future arm for this message.
    pub fn retire(&mut self, id: MessageId) -> bool {
        self.retired.insert(id);
        self.cancel(id)
    }

    /// Cancel every armed message (teardown). Returns how many were live.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.armed.len();
        self.armed.clear();
        count
    }

    /// Validate an event against the live arms.
    ///
    /// Returns `None` for stale events (cancelled, re-armed, duplicate).
    /// A court firing retires the message.
    pub fn fire(&mut self, event: EscalationEvent) -> Option<Firing> {
        let handle = match self.armed.get_mut(&event.message_id) {
            Some(handle) if handle.arm_id == event.arm_id => handle,
            _ => {
                trace!(
                    message_id = event.message_id,
                    arm_id = event.arm_id,
                    stage = %event.stage,
                    "Dropping stale escalation event"
                );
                return None;
            }
        };

        match event.stage {
            EscalationStage::Urgent => {
                if handle.urgent_fired {
                    return None;
                }
                handle.urgent_fired = true;
                Some(Firing::Urgent(handle.snapshot.clone()))
            }
            EscalationStage::Court => {
                self.retired.insert(event.message_id);
                self.armed
                    .remove(&event.message_id)
                    .map(|handle| Firing::Court(handle.snapshot.clone()))
            }
        }
    }

    pub fn phase(&self, id: MessageId) -> EscalationPhase {
        if self.retired.contains(&id) {
            return EscalationPhase::Retired;
        }
        match self.armed.get(&id) {
            Some(handle) if handle.urgent_fired => EscalationPhase::UrgentFired,
            Some(_) => EscalationPhase::Armed,
            None => EscalationPhase::Unarmed,
        }
    }

    pub fn is_armed(&self, id: MessageId) -> bool {
        self.armed.contains_key(&id)
    }

    pub fn handle(&self, id: MessageId) -> Option<&EscalationHandle> {
        self.armed.get(&id)
    }

    pub fn armed_count(&self) -> usize {
        self.armed.len()
    }
}
