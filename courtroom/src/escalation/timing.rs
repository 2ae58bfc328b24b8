//! Timing profiles for escalation deadlines and arrivals

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Test mode divides every production delay by this factor.
pub const TEST_MODE_FACTOR: u32 = 60;

/// Invalid timing configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimingError {
    #[error("court delay {court:?} must be strictly greater than urgent delay {urgent:?}")]
    CourtNotAfterUrgent { urgent: Duration, court: Duration },
}

/// Per-message deadlines, both measured from arm time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationTiming {
    pub urgent_after: Duration,
    pub court_after: Duration,
}

impl EscalationTiming {
    pub fn new(urgent_after: Duration, court_after: Duration) -> Result<Self, TimingError> {
        if court_after <= urgent_after {
            return Err(TimingError::CourtNotAfterUrgent {
                urgent: urgent_after,
                court: court_after,
            });
        }
        Ok(Self {
            urgent_after,
            court_after,
        })
    }
}

impl Default for EscalationTiming {
    fn default() -> Self {
        TimingProfile::production().escalation
    }
}

/// Arrival loop delay: `base + uniform[0, jitter)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrivalTiming {
    pub base: Duration,
    pub jitter: Duration,
}

/// Complete set of session delays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingProfile {
    pub escalation: EscalationTiming,
    pub arrival: ArrivalTiming,
}

impl TimingProfile {
    /// Urgent at 2 min, court at 4 min, a new message every 20-30 s
    pub fn production() -> Self {
        Self {
            escalation: EscalationTiming {
                urgent_after: Duration::from_secs(120),
                court_after: Duration::from_secs(240),
            },
            arrival: ArrivalTiming {
                base: Duration::from_secs(20),
                jitter: Duration::from_secs(10),
            },
        }
    }

    /// Production profile compressed by [`TEST_MODE_FACTOR`]
    /// (urgent 2 s, court 4 s, arrivals every ~333-500 ms).
    pub fn test_mode() -> Self {
        Self::production().compressed(TEST_MODE_FACTOR)
    }

    pub fn for_mode(test_mode: bool) -> Self {
        if test_mode {
            Self::test_mode()
        } else {
            Self::production()
        }
    }

    /// Divide every delay by `factor`, keeping the ratios.
    ///
    /// A factor of zero is treated as one.
    pub fn compressed(&self, factor: u32) -> Self {
        let factor = factor.max(1);
        Self {
            escalation: EscalationTiming {
                urgent_after: self.escalation.urgent_after / factor,
                court_after: self.escalation.court_after / factor,
            },
            arrival: ArrivalTiming {
                base: self.arrival.base / factor,
                jitter: self.arrival.jitter / factor,
            },
        }
    }

    pub fn validate(&self) -> Result<(), TimingError> {
        EscalationTiming::new(self.escalation.urgent_after, self.escalation.court_after).map(|_| ())
    }
}

impl Default for TimingProfile {
    fn default() -> Self {
        Self::production()
    }
}
