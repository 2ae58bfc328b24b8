//! Session events for presenters
//!
//! The inbox controller publishes a [`CourtEvent`] for every visible change;
//! the terminal renderer and tests subscribe.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │  Controller  │────▶│  Event Bus   │────▶│  Subscribers │
//! │  (publish)   │     │  (broadcast) │     │   (recv)     │
//! └──────────────┘     └──────────────┘     └──────────────┘
//! ```

pub mod bus;
pub mod types;

pub use bus::{EventBus, EventBusError, EventBusResult, EventSubscriber, SharedEventBus};
pub use types::CourtEvent;
