//! Court Room Escalation Library
//!
//! A productivity-inbox game engine. Messages arrive from the boss, family
//! and the agile board; the ones that hide a real violation escalate if
//! ignored:
//! - ignored for the urgent delay: status `urgent`, text prefixed `URGENT: `,
//!   and a denied message comes back
//! - ignored for the court delay: status `fined`, a court ruling naming the
//!   law broken is shown
//!
//! # Components
//!
//! ## Core
//! - [`catalog`]: candidate texts per category and the keyword classifier
//! - [`escalation`]: per-message urgent/court timers with cancellation
//! - [`arrival`]: randomized self-rescheduling message generator
//! - [`inbox`]: the controller that applies user actions and timer firings
//! - [`overlay`]: single-slot court ruling
//!
//! ## Runtime
//! - [`session`]: the event loop tying it together behind a [`SessionHandle`]
//! - [`events`]: broadcast bus of [`CourtEvent`]s for presenters
//! - [`clock`]: elapsed session time
//!
//! ## Persistence
//! - [`store`]: [`MessageStore`] trait with HTTP and in-memory backends
//!
//! # Usage
//!
//! ```no_run
//! use courtroom::{CourtSession, HttpMessageStore, SessionConfig};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = HttpMessageStore::new("http://localhost:3000", courtroom::store::http::DEFAULT_TIMEOUT)?;
//! let session = CourtSession::start(Arc::new(store), SessionConfig::test_mode())?;
//! let mut events = session.subscribe();
//! while let Ok(event) = events.recv().await {
//!     println!("{}", event.event_type());
//! }
//! # Ok(())
//! # }
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod arrival;
pub mod catalog;
pub mod clock;
pub mod escalation;
pub mod events;
pub mod inbox;
pub mod message;
pub mod overlay;
pub mod session;
pub mod store;

pub use arrival::{ArrivalGenerator, ArrivalLoop, StoppedArrivals};
pub use catalog::{classify, Classification};
pub use clock::SessionClock;
pub use escalation::{
    EscalationEvent, EscalationPhase, EscalationScheduler, EscalationStage, EscalationTiming,
    TimingProfile,
};
pub use events::{CourtEvent, EventBus, EventBusError, EventSubscriber, SharedEventBus};
pub use inbox::{EscalationOutcome, InboxController, InboxError, LoadSummary};
pub use message::{Category, Message, MessageId, MessagePatch, MessageStatus, NewMessage};
pub use overlay::{CourtOverlay, Ruling};
pub use session::{CourtSession, InboxSnapshot, SessionConfig, SessionError, SessionHandle};
pub use store::{
    HttpMessageStore, MemoryMessageStore, MessageStore, SharedMessageStore, StoreError,
    StoreWriter,
};
