//! On-mount revalidation policy
//!
//! Attempt 0 refreshes hard right away. Attempts 1 and 2 refresh soft after a
//! delay that grows with the attempt, the regeneration cost, the measured
//! latency and a CDN propagation allowance.

use std::time::Duration;

use revalid_core::Deployment;

/// Initial CDN propagation allowance
pub const DEFAULT_CDN_BACKOFF: Duration = Duration::from_millis(200);
/// Allowance stops growing at this multiple of its initial value
pub const DEFAULT_CDN_BACKOFF_CAP_FACTOR: u32 = 16;

/// Options of the state machine that are not part of page props
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchedulerOptions {
    /// On-mount revalidation only runs in production-like deployments
    pub deployment: Deployment,
    pub cdn_backoff_base: Duration,
    pub cdn_backoff_cap_factor: u32,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        SchedulerOptions {
            deployment: Deployment::default(),
            cdn_backoff_base: DEFAULT_CDN_BACKOFF,
            cdn_backoff_cap_factor: DEFAULT_CDN_BACKOFF_CAP_FACTOR,
        }
    }
}

impl SchedulerOptions {
    pub fn production() -> Self {
        SchedulerOptions {
            deployment: Deployment::Production,
            ..Self::default()
        }
    }
}

/// Escalating CDN propagation allowance, kept for the whole mount
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CdnBackoff {
    current: Duration,
    cap: Duration,
}

impl CdnBackoff {
    pub fn new(base: Duration, cap_factor: u32) -> Self {
        CdnBackoff {
            current: base,
            cap: base.saturating_mul(cap_factor.max(1)),
        }
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    /// Double the allowance unless it already reached the cap
    pub fn escalate(&mut self) -> Duration {
        if self.current < self.cap {
            self.current = self.current.saturating_mul(2);
        }
        self.current
    }
}

impl Default for CdnBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_CDN_BACKOFF, DEFAULT_CDN_BACKOFF_CAP_FACTOR)
    }
}

/// Delay of an on-mount soft refresh:
/// `(0.5 + attempt) * deduping + latency + backoff`
pub fn mount_refresh_delay(
    attempt: u8,
    deduping: Duration,
    latency: Duration,
    backoff: Duration,
) -> Duration {
    let half_steps = 2 * u32::from(attempt) + 1;
    (deduping.saturating_mul(half_steps) / 2)
        .saturating_add(latency)
        .saturating_add(backoff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_mount_delay_formula() {
        let delay = mount_refresh_delay(
            1,
            Duration::from_millis(1_000),
            Duration::from_millis(30),
            Duration::from_millis(200),
        );
        assert_eq!(delay, Duration::from_millis(1_730));

        let delay = mount_refresh_delay(2, Duration::from_millis(101), Duration::ZERO, Duration::ZERO);
        assert_eq!(delay, Duration::from_micros(252_500));
    }

    #[test]
    fn test_backoff_caps_at_sixteen_times() {
        let mut backoff = CdnBackoff::default();
        assert_eq!(backoff.current(), Duration::from_millis(200));

        let mut seen = Vec::new();
        for _ in 0..8 {
            seen.push(backoff.escalate().as_millis());
        }
        assert_eq!(seen, vec![400, 800, 1_600, 3_200, 3_200, 3_200, 3_200, 3_200]);
    }

    proptest! {
        #[test]
        fn prop_mount_delays_non_decreasing(
            deduping_ms in 0u64..600_000,
            latency_ms in 0u64..60_000,
            escalations in 0usize..6,
        ) {
            let deduping = Duration::from_millis(deduping_ms);
            let latency = Duration::from_millis(latency_ms);
            let mut backoff = CdnBackoff::default();
            for _ in 0..escalations {
                backoff.escalate();
            }

            let first = mount_refresh_delay(1, deduping, latency, backoff.current());
            let second = mount_refresh_delay(2, deduping, latency, backoff.escalate());
            prop_assert!(first <= second);
        }
    }
}
