//! Time primitives for revalid
//!
//! All scheduling decisions compare wall-clock timestamps in milliseconds
//! since the UNIX epoch. Client and server clocks may disagree; the
//! difference is carried separately as a signed offset.

use std::ops::{Add, Sub};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Wall-clock timestamp, milliseconds since the UNIX epoch
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    #[inline]
    pub fn from_millis(millis: i64) -> Self {
        Timestamp(millis)
    }

    #[inline]
    pub fn as_millis(self) -> i64 {
        self.0
    }

    /// A zero timestamp means "unset" wherever metadata is concerned
    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Current system time
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        Timestamp(millis)
    }

    /// Shift by a signed number of milliseconds
    #[inline]
    pub fn offset_by(self, millis: i64) -> Self {
        Timestamp(self.0.saturating_add(millis))
    }

    /// Signed difference `self - earlier` in milliseconds
    #[inline]
    pub fn millis_since(self, earlier: Timestamp) -> i64 {
        self.0.saturating_sub(earlier.0)
    }

    #[inline]
    pub fn saturating_add(self, duration: Duration) -> Self {
        Timestamp(self.0.saturating_add(duration_millis(duration)))
    }

    #[inline]
    pub fn saturating_sub(self, duration: Duration) -> Self {
        Timestamp(self.0.saturating_sub(duration_millis(duration)))
    }
}

#[inline]
fn duration_millis(duration: Duration) -> i64 {
    duration.as_millis().min(i64::MAX as u128) as i64
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    #[inline]
    fn add(self, rhs: Duration) -> Self::Output {
        self.saturating_add(rhs)
    }
}

impl Sub<Duration> for Timestamp {
    type Output = Timestamp;

    #[inline]
    fn sub(self, rhs: Duration) -> Self::Output {
        self.saturating_sub(rhs)
    }
}

/// Elapsed time between two timestamps; never negative
impl Sub<Timestamp> for Timestamp {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: Timestamp) -> Self::Output {
        let diff = self.0.saturating_sub(rhs.0);
        if diff >= 0 {
            Duration::from_millis(diff as u64)
        } else {
            Duration::ZERO
        }
    }
}

impl std::fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t({}ms)", self.0)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_sub_saturates() {
        let earlier = Timestamp::from_millis(1_000);
        let later = Timestamp::from_millis(1_250);

        assert_eq!(later - earlier, Duration::from_millis(250));
        assert_eq!(earlier - later, Duration::ZERO);
        assert_eq!(earlier.millis_since(later), -250);
    }

    #[test]
    fn test_timestamp_duration_arithmetic() {
        let t = Timestamp::from_millis(10);
        assert_eq!(t + Duration::from_millis(5), Timestamp(15));
        assert_eq!(t - Duration::from_millis(20), Timestamp(-10));
        assert_eq!(t.offset_by(-4), Timestamp(6));
    }

    #[test]
    fn test_timestamp_now_is_after_epoch() {
        assert!(Timestamp::now() > Timestamp::ZERO);
    }
}
