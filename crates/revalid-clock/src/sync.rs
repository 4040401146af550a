//! One-shot clock synchronizer

use std::time::Duration;

use revalid_core::Timestamp;

use crate::ClockEstimate;

/// How a probe request settled
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The endpoint answered, with or without a timestamp
    Answered { server_time: Option<Timestamp> },
    /// Transport, decode or timeout failure
    Failed(String),
}

/// Timing of one probe request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeSample {
    pub sent_at: Timestamp,
    pub received_at: Timestamp,
    pub outcome: ProbeOutcome,
}

impl ProbeSample {
    pub fn answered(sent_at: Timestamp, received_at: Timestamp, server_time: Option<Timestamp>) -> Self {
        ProbeSample {
            sent_at,
            received_at,
            outcome: ProbeOutcome::Answered { server_time },
        }
    }

    pub fn failed(sent_at: Timestamp, received_at: Timestamp, reason: impl Into<String>) -> Self {
        ProbeSample {
            sent_at,
            received_at,
            outcome: ProbeOutcome::Failed(reason.into()),
        }
    }

    /// Locally measured round trip; zero if the local clock stepped back
    pub fn round_trip(&self) -> Duration {
        self.received_at - self.sent_at
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, ProbeOutcome::Failed(_))
    }

    /// Offset implied by this sample. A missing or zero server time gives 0.
    pub fn offset_ms(&self) -> i64 {
        match self.outcome {
            ProbeOutcome::Answered {
                server_time: Some(server),
            } if !server.is_zero() => self.received_at.millis_since(server),
            _ => 0,
        }
    }
}

/// Resolves the clock estimate exactly once per mount
#[derive(Clone, Debug)]
pub struct ClockSynchronizer {
    estimate: ClockEstimate,
    resolved: bool,
}

impl ClockSynchronizer {
    /// Start from the provisional estimate
    pub fn new() -> Self {
        Self::with_default(ClockEstimate::provisional())
    }

    /// Start from a host-supplied provisional estimate
    pub fn with_default(estimate: ClockEstimate) -> Self {
        ClockSynchronizer {
            estimate: ClockEstimate {
                is_first_measurement: true,
                ..estimate
            },
            resolved: false,
        }
    }

    pub fn estimate(&self) -> ClockEstimate {
        self.estimate
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Apply a probe sample. Only the first sample is applied, success or
    /// failure; later samples return `None`.
    pub fn resolve(&mut self, sample: &ProbeSample) -> Option<ClockEstimate> {
        if self.resolved {
            return None;
        }
        self.resolved = true;
        self.estimate = ClockEstimate::measured(sample.offset_ms(), sample.round_trip());
        Some(self.estimate)
    }
}

impl Default for ClockSynchronizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_resolve_with_server_time() {
        let mut sync = ClockSynchronizer::new();
        assert!(sync.estimate().is_first_measurement);

        let sample = ProbeSample::answered(Timestamp(1_000), Timestamp(1_120), Some(Timestamp(900)));
        let estimate = sync.resolve(&sample).unwrap();

        assert_eq!(estimate.offset_ms, 220);
        assert_eq!(estimate.latency, Duration::from_millis(120));
        assert!(!estimate.is_first_measurement);
        assert!(sync.is_resolved());
    }

    #[test]
    fn test_resolve_without_timestamp_uses_zero_offset() {
        let mut sync = ClockSynchronizer::new();
        let sample = ProbeSample::answered(Timestamp(10), Timestamp(35), None);
        let estimate = sync.resolve(&sample).unwrap();

        assert_eq!(estimate.offset_ms, 0);
        assert_eq!(estimate.latency, Duration::from_millis(25));
    }

    #[test]
    fn test_failure_falls_back_to_local_round_trip() {
        let mut sync = ClockSynchronizer::new();
        let sample = ProbeSample::failed(Timestamp(0), Timestamp(80), "timeout");
        let estimate = sync.resolve(&sample).unwrap();

        assert_eq!(estimate.offset_ms, 0);
        assert_eq!(estimate.latency, Duration::from_millis(80));
        assert!(!estimate.is_first_measurement);
    }

    #[test]
    fn test_first_resolution_wins() {
        let mut sync = ClockSynchronizer::new();
        sync.resolve(&ProbeSample::failed(Timestamp(0), Timestamp(10), "boom"));

        let later = ProbeSample::answered(Timestamp(0), Timestamp(5), Some(Timestamp(1)));
        assert_eq!(sync.resolve(&later), None);
        assert_eq!(sync.estimate().offset_ms, 0);
        assert_eq!(sync.estimate().latency, Duration::from_millis(10));
    }

    #[test]
    fn test_with_default_forces_first_measurement() {
        let sync = ClockSynchronizer::with_default(ClockEstimate::measured(5, Duration::ZERO));
        assert!(sync.estimate().is_first_measurement);
        assert_eq!(sync.estimate().offset_ms, 5);
    }

    proptest! {
        #[test]
        fn prop_latency_never_negative(
            sent in -1_000_000i64..1_000_000,
            received in -1_000_000i64..1_000_000,
            server in proptest::option::of(1i64..2_000_000),
        ) {
            let mut sync = ClockSynchronizer::new();
            let sample = ProbeSample::answered(Timestamp(sent), Timestamp(received), server.map(Timestamp));
            let estimate = sync.resolve(&sample).unwrap();

            prop_assert_eq!(estimate.latency, Duration::from_millis((received - sent).max(0) as u64));
            let expected_offset = server.map(|s| received - s).unwrap_or(0);
            prop_assert_eq!(estimate.offset_ms, expected_offset);
        }
    }
}
