//! Clock estimate shared with the scheduler

use std::time::Duration;

use revalid_core::Timestamp;

/// Estimated client/server clock relationship
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClockEstimate {
    /// Client clock minus server clock, in milliseconds
    pub offset_ms: i64,
    /// Round-trip time of the freshness probe
    pub latency: Duration,
    /// True until the probe resolves
    pub is_first_measurement: bool,
}

impl ClockEstimate {
    /// Assumed offset before measurement; positive so staleness is judged late
    pub const DEFAULT_OFFSET_MS: i64 = 60;
    /// Assumed latency before measurement
    pub const DEFAULT_LATENCY: Duration = Duration::from_millis(500);

    /// Estimate used until the probe resolves
    pub fn provisional() -> Self {
        ClockEstimate {
            offset_ms: Self::DEFAULT_OFFSET_MS,
            latency: Self::DEFAULT_LATENCY,
            is_first_measurement: true,
        }
    }

    /// Measured estimate
    pub fn measured(offset_ms: i64, latency: Duration) -> Self {
        ClockEstimate {
            offset_ms,
            latency,
            is_first_measurement: false,
        }
    }

    /// Server-clock equivalent of a client timestamp
    pub fn server_time(&self, client_now: Timestamp) -> Timestamp {
        client_now.offset_by(-self.offset_ms)
    }
}

impl Default for ClockEstimate {
    fn default() -> Self {
        Self::provisional()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provisional_defaults() {
        let estimate = ClockEstimate::default();
        assert_eq!(estimate.offset_ms, 60);
        assert_eq!(estimate.latency, Duration::from_millis(500));
        assert!(estimate.is_first_measurement);
    }

    #[test]
    fn test_server_time_applies_offset() {
        let estimate = ClockEstimate::measured(250, Duration::from_millis(30));
        assert_eq!(estimate.server_time(Timestamp(10_250)), Timestamp(10_000));
        assert!(!estimate.is_first_measurement);
    }
}
