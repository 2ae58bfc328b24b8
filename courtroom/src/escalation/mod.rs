//! Escalation: the urgency ladder for ignored messages
//!
//! # Escalation Ladder
//!
//! ```text
//! arrival / load (escalatable only)
//!     │  arm: two deadlines from the same instant
//!     │
//!     ├─ accept before urgent  → cancelled, resolved
//!     ├─ deny                  → hidden, timers keep running
//!     │
//!     ▼
//! urgent_after elapsed
//!     │  status = urgent, text = "URGENT: ..."
//!     │  re-inserted into the inbox if it had been denied
//!     │
//!     ├─ accept                → cancelled, resolved
//!     │
//!     ▼
//! court_after elapsed
//!        status = fined, court ruling shown, message retired
//! ```

pub mod scheduler;
pub mod timing;

pub use scheduler::{
    ArmId, EscalationEvent, EscalationHandle, EscalationPhase, EscalationReceiver,
    EscalationScheduler, EscalationStage, Firing,
};
pub use timing::{ArrivalTiming, EscalationTiming, TimingError, TimingProfile, TEST_MODE_FACTOR};
