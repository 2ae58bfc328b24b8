//! Court Session: the single event loop that owns the inbox
//!
//! ```text
//!   SessionHandle ──commands──┐
//!   escalation timers ─events─┼──▶ session task ──▶ InboxController ──▶ EventBus
//!   arrival loop ──messages───┘    (one at a time)
//! ```
//!
//! Every mutation happens on the session task, so user actions, timer
//! firings and arrivals never interleave. Handles talk to the task over a
//! request/reply channel. The task never waits on a store write; those go
//! through the inbox's background writer.

use crate::arrival::{ArrivalGenerator, ArrivalLoop};
use crate::clock::SessionClock;
use crate::escalation::{EscalationReceiver, TimingError, TimingProfile};
use crate::events::{CourtEvent, EventBus, EventSubscriber, SharedEventBus};
use crate::inbox::{InboxController, InboxError};
use crate::message::{Message, MessageId};
use crate::overlay::Ruling;
use crate::store::SharedMessageStore;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

const COMMAND_QUEUE: usize = 64;
const ARRIVAL_QUEUE: usize = 16;

/// Error types for session operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid timing profile: {0}")]
    Timing(#[from] TimingError),

    #[error(transparent)]
    Inbox(#[from] InboxError),

    #[error("Arrival loop is already running")]
    ArrivalsRunning,

    #[error("Session has ended")]
    Closed,
}

/// How a session runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub timing: TimingProfile,
    /// Seed for the arrival generator; entropy when unset
    pub seed: Option<u64>,
    /// Start the arrival loop once the inbox is loaded
    pub arrivals: bool,
}

impl SessionConfig {
    /// Compressed timing, for demos and tests
    pub fn test_mode() -> Self {
        Self {
            timing: TimingProfile::test_mode(),
            ..Self::default()
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timing: TimingProfile::production(),
            seed: None,
            arrivals: true,
        }
    }
}

/// Point-in-time view of the inbox
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboxSnapshot {
    pub messages: Vec<Message>,
    pub ruling: Option<Ruling>,
    /// Session clock, `MM:SS`
    pub clock: String,
    /// Messages with live escalation timers
    pub armed: usize,
    pub arrivals_running: bool,
}

enum SessionCommand {
    Accept {
        id: MessageId,
        reply: oneshot::Sender<Result<Message, InboxError>>,
    },
    Deny {
        id: MessageId,
        reply: oneshot::Sender<Result<Message, InboxError>>,
    },
    DismissRuling {
        reply: oneshot::Sender<Option<Ruling>>,
    },
    Snapshot {
        reply: oneshot::Sender<InboxSnapshot>,
    },
    StartArrivals {
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    StopArrivals {
        reply: oneshot::Sender<Option<u64>>,
    },
    Shutdown {
        reply: oneshot::Sender<usize>,
    },
}

/// The session event loop
pub struct CourtSession {
    config: SessionConfig,
    store: SharedMessageStore,
    inbox: InboxController,
    escalations: EscalationReceiver,
    commands: mpsc::Receiver<SessionCommand>,
    arrival_tx: mpsc::Sender<Message>,
    arrival_rx: mpsc::Receiver<Message>,
    arrival_loop: Option<ArrivalLoop>,
    /// Generator of the paused loop, reused on resume
    idle_arrivals: Option<ArrivalGenerator>,
    /// Lowest placeholder id admitted so far
    lowest_placeholder: MessageId,
    clock: SessionClock,
}

impl CourtSession {
    /// Spawn a session with its own event bus.
    pub fn start(
        store: SharedMessageStore,
        config: SessionConfig,
    ) -> Result<SessionHandle, SessionError> {
        Self::start_on(store, config, EventBus::new().shared())
    }

    /// Spawn a session publishing to `bus`. Subscribe before calling this
    /// to observe the initial `inbox_loaded` event.
    pub fn start_on(
        store: SharedMessageStore,
        config: SessionConfig,
        bus: SharedEventBus,
    ) -> Result<SessionHandle, SessionError> {
        config.timing.validate()?;

        let (inbox, escalations) =
            InboxController::new(store.clone(), config.timing.escalation, bus.clone());
        let (command_tx, commands) = mpsc::channel(COMMAND_QUEUE);
        let (arrival_tx, arrival_rx) = mpsc::channel(ARRIVAL_QUEUE);

        let session = Self {
            config,
            store,
            inbox,
            escalations,
            commands,
            arrival_tx,
            arrival_rx,
            arrival_loop: None,
            idle_arrivals: None,
            lowest_placeholder: 0,
            clock: SessionClock::start(),
        };
        info!(
            urgent_after = ?config.timing.escalation.urgent_after,
            court_after = ?config.timing.escalation.court_after,
            arrivals = config.arrivals,
            "Court session starting"
        );
        tokio::spawn(session.run());

        Ok(SessionHandle {
            commands: command_tx,
            bus,
        })
    }

    async fn run(mut self) {
        self.inbox.load_initial().await;
        if self.config.arrivals {
            if let Err(e) = self.start_arrivals() {
                warn!(error = %e, "Failed to start arrivals");
            }
        }

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(SessionCommand::Shutdown { reply }) => {
                        let cancelled = self.teardown().await;
                        let _ = reply.send(cancelled);
                        return;
                    }
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                Some(event) = self.escalations.recv() => {
                    self.inbox.handle_escalation(event);
                }
                Some(message) = self.arrival_rx.recv() => {
                    self.admit_arrival(message);
                }
            }
        }

        debug!("All session handles dropped");
        self.teardown().await;
    }

    async fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Accept { id, reply } => {
                let _ = reply.send(self.inbox.accept(id));
            }
            SessionCommand::Deny { id, reply } => {
                let _ = reply.send(self.inbox.deny(id));
            }
            SessionCommand::DismissRuling { reply } => {
                let _ = reply.send(self.inbox.dismiss_ruling());
            }
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            SessionCommand::StartArrivals { reply } => {
                let _ = reply.send(self.start_arrivals());
            }
            SessionCommand::StopArrivals { reply } => {
                let delivered = match self.arrival_loop.take() {
                    Some(arrivals) => Some(self.pause_arrivals(arrivals).await),
                    None => None,
                };
                let _ = reply.send(delivered);
            }
            SessionCommand::Shutdown { .. } => {}
        }
    }

    fn start_arrivals(&mut self) -> Result<(), SessionError> {
        if self.arrival_loop.as_ref().is_some_and(|a| a.is_running()) {
            return Err(SessionError::ArrivalsRunning);
        }
        let mut generator = match self.idle_arrivals.take() {
            Some(generator) => generator,
            None => ArrivalGenerator::with_seed(
                self.config.timing.arrival,
                self.store.clone(),
                self.config.seed,
            ),
        };
        generator.continue_below(self.lowest_placeholder);
        info!(next_placeholder = generator.next_placeholder(), "Arrival loop started");
        self.arrival_loop = Some(generator.spawn(self.arrival_tx.clone()));
        Ok(())
    }

    /// Stop the loop and admit whatever it already handed over, so nothing
    /// arrives after the pause is acknowledged.
    async fn pause_arrivals(&mut self, arrivals: ArrivalLoop) -> u64 {
        let stopped = arrivals.stop().await;
        while let Ok(message) = self.arrival_rx.try_recv() {
            self.admit_arrival(message);
        }
        self.idle_arrivals = stopped.generator;
        info!(delivered = stopped.delivered, "Arrival loop paused");
        stopped.delivered
    }

    fn admit_arrival(&mut self, message: Message) {
        self.lowest_placeholder = self.lowest_placeholder.min(message.id);
        self.inbox.admit(message);
    }

    fn snapshot(&self) -> InboxSnapshot {
        InboxSnapshot {
            messages: self.inbox.visible().to_vec(),
            ruling: self.inbox.ruling().cloned(),
            clock: self.clock.label(),
            armed: self.inbox.armed_count(),
            arrivals_running: self.arrival_loop.as_ref().is_some_and(|a| a.is_running()),
        }
    }

    async fn teardown(&mut self) -> usize {
        if let Some(arrivals) = self.arrival_loop.take() {
            arrivals.stop().await;
        }
        let cancelled_timers = self.inbox.teardown();
        self.inbox.bus().publish(CourtEvent::SessionEnded {
            cancelled_timers,
            timestamp: Utc::now(),
        });
        info!(cancelled_timers, clock = %self.clock.label(), "Court session ended");
        cancelled_timers
    }
}

/// Cheap, cloneable front door to a running session
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    bus: SharedEventBus,
}

impl SessionHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, SessionError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| SessionError::Closed)?;
        response.await.map_err(|_| SessionError::Closed)
    }

    pub async fn accept(&self, id: MessageId) -> Result<Message, SessionError> {
        Ok(self
            .request(|reply| SessionCommand::Accept { id, reply })
            .await??)
    }

    pub async fn deny(&self, id: MessageId) -> Result<Message, SessionError> {
        Ok(self
            .request(|reply| SessionCommand::Deny { id, reply })
            .await??)
    }

    /// Acknowledge the court ruling, if one is shown
    pub async fn dismiss_ruling(&self) -> Result<Option<Ruling>, SessionError> {
        self.request(|reply| SessionCommand::DismissRuling { reply })
            .await
    }

    pub async fn snapshot(&self) -> Result<InboxSnapshot, SessionError> {
        self.request(|reply| SessionCommand::Snapshot { reply }).await
    }

    /// Resume arrivals; fails if the loop is already running.
    pub async fn start_arrivals(&self) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::StartArrivals { reply })
            .await?
    }

    /// Pause arrivals. Returns how many the stopped loop delivered.
    pub async fn stop_arrivals(&self) -> Result<Option<u64>, SessionError> {
        self.request(|reply| SessionCommand::StopArrivals { reply })
            .await
    }

    pub fn subscribe(&self) -> EventSubscriber {
        self.bus.subscribe()
    }

    /// Stop the session. Returns how many escalation timers were cancelled.
    pub async fn shutdown(&self) -> Result<usize, SessionError> {
        self.request(|reply| SessionCommand::Shutdown { reply })
            .await
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escalation::EscalationTiming;
    use crate::message::{Category, MessageStatus, NewMessage};
    use crate::store::{MemoryMessageStore, MessageStore};
    use std::sync::Arc;
    use std::time::Duration;

    fn quiet() -> SessionConfig {
        SessionConfig {
            arrivals: false,
            seed: Some(1),
            ..SessionConfig::test_mode()
        }
    }

    async fn seeded_store(text: &str) -> (Arc<MemoryMessageStore>, MessageId) {
        let store = Arc::new(MemoryMessageStore::new());
        let created = store
            .create(&NewMessage {
                category: Category::Agile,
                text: text.to_string(),
                status: MessageStatus::Normal,
                escalatable: true,
                law_broken: None,
                reason: None,
            })
            .await
            .unwrap();
        (store, created.id)
    }

    #[tokio::test]
    async fn test_rejects_invalid_timing() {
        let mut config = quiet();
        config.timing.escalation = EscalationTiming {
            urgent_after: Duration::from_secs(4),
            court_after: Duration::from_secs(4),
        };
        let result = CourtSession::start(Arc::new(MemoryMessageStore::new()), config);
        assert!(matches!(result, Err(SessionError::Timing(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_accept_through_handle() {
        let (store, id) = seeded_store("Fix alt in img1").await;
        let session = CourtSession::start(store.clone(), quiet()).unwrap();

        let snapshot = session.snapshot().await.unwrap();
        assert_eq!(snapshot.messages.len(), 1);
        assert_eq!(snapshot.armed, 1);

        let accepted = session.accept(id).await.unwrap();
        assert_eq!(accepted.id, id);
        assert!(matches!(
            session.accept(id).await,
            Err(SessionError::Inbox(InboxError::NotInInbox(_)))
        ));

        tokio::time::sleep(Duration::from_secs(10)).await;
        let snapshot = session.snapshot().await.unwrap();
        assert!(snapshot.messages.is_empty());
        assert!(snapshot.ruling.is_none());
        assert_eq!(store.snapshot(id).unwrap().status, MessageStatus::Resolved);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_timers_and_closes() {
        let bus = EventBus::new().shared();
        let mut events = bus.subscribe();
        let (store, id) = seeded_store("Fix input validation").await;
        let session = CourtSession::start_on(store.clone(), quiet(), bus).unwrap();

        session.deny(id).await.unwrap();
        assert_eq!(session.shutdown().await.unwrap(), 1);
        assert!(matches!(session.snapshot().await, Err(SessionError::Closed)));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(store.snapshot(id).unwrap().status, MessageStatus::Denied);

        let types: Vec<_> = events.drain().iter().map(|e| e.event_type()).collect();
        assert_eq!(types, vec!["inbox_loaded", "message_denied", "session_ended"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_arrivals_flow_into_inbox() {
        let store = Arc::new(MemoryMessageStore::new());
        let config = SessionConfig {
            seed: Some(42),
            ..SessionConfig::test_mode()
        };
        let session = CourtSession::start(store.clone(), config).unwrap();

        tokio::time::sleep(Duration::from_millis(1_600)).await;
        let snapshot = session.snapshot().await.unwrap();
        assert!(snapshot.arrivals_running);
        assert!(snapshot.messages.len() >= 3);
        assert!(snapshot.messages.iter().all(|m| m.id > 0));

        assert!(matches!(
            session.start_arrivals().await,
            Err(SessionError::ArrivalsRunning)
        ));
        assert!(session.stop_arrivals().await.unwrap().is_some());
        assert_eq!(session.stop_arrivals().await.unwrap(), None);

        let stored = store.list().await.unwrap().len();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(store.list().await.unwrap().len(), stored);

        session.start_arrivals().await.unwrap();
        session.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_resumed_arrivals_are_admitted_with_fresh_placeholders() {
        let store = Arc::new(MemoryMessageStore::new());
        store.set_offline(true);
        let config = SessionConfig {
            seed: Some(5),
            ..SessionConfig::test_mode()
        };
        let session = CourtSession::start(store, config).unwrap();

        tokio::time::sleep(Duration::from_secs(2)).await;
        let first_run = session.stop_arrivals().await.unwrap().unwrap();
        let before: Vec<MessageId> = session
            .snapshot()
            .await
            .unwrap()
            .messages
            .iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(before.len() as u64, first_run);
        assert!(before.iter().all(|id| *id < 0));

        // Paused: nothing new shows up.
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(session.snapshot().await.unwrap().messages.len(), before.len());

        session.start_arrivals().await.unwrap();
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        let second_run = session.stop_arrivals().await.unwrap().unwrap();
        assert!(second_run > 0);

        let after: Vec<MessageId> = session
            .snapshot()
            .await
            .unwrap()
            .messages
            .iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(after.len() as u64, first_run + second_run);
        assert_eq!(&after[..before.len()], &before[..]);
        let lowest_before = before.iter().min().copied().unwrap_or(0);
        assert!(after[before.len()..].iter().all(|id| *id < lowest_before));
        session.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_in_snapshot() {
        let session =
            CourtSession::start(Arc::new(MemoryMessageStore::new()), quiet()).unwrap();
        tokio::time::sleep(Duration::from_secs(75)).await;
        assert_eq!(session.snapshot().await.unwrap().clock, "01:15");
    }
}
