//! Wall clock for page instances
//!
//! Reads an epoch anchor once and advances it with the async runtime's
//! monotonic clock, so timers and timestamps agree (including under
//! paused test time).

use tokio::time::Instant;

use revalid_core::Timestamp;

/// Epoch milliseconds derived from a monotonic instant
#[derive(Clone, Copy, Debug)]
pub struct EpochClock {
    anchor: Timestamp,
    started: Instant,
}

impl EpochClock {
    /// Anchor at the current system time
    pub fn new() -> Self {
        Self::anchored(Timestamp::now())
    }

    /// Anchor at a fixed epoch time
    pub fn anchored(anchor: Timestamp) -> Self {
        EpochClock {
            anchor,
            started: Instant::now(),
        }
    }

    pub fn now(&self) -> Timestamp {
        self.anchor.saturating_add(self.started.elapsed())
    }
}

impl Default for EpochClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_follows_runtime_time() {
        let clock = EpochClock::anchored(Timestamp(5_000));
        assert_eq!(clock.now(), Timestamp(5_000));

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(clock.now(), Timestamp(5_250));
    }
}
