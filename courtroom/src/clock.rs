//! Session wall clock shown above the inbox

use std::time::Duration;
use tokio::time::Instant;

/// Elapsed time since the session started
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    started: Instant,
}

impl SessionClock {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// `MM:SS`, minutes wrapping at the hour
    pub fn label(&self) -> String {
        format_elapsed(self.elapsed())
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::start()
    }
}

/// Format whole elapsed seconds as `MM:SS` with minutes modulo 60.
pub fn format_elapsed(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs();
    format!("{:02}:{:02}", (seconds / 60) % 60, seconds % 60)
}
