//! Generation-time metadata
//!
//! Every statically generated page carries a small triple describing when it
//! was generated and when it should be considered stale. The scheduler only
//! consumes it; `GenerationMeta::stamp` is the producer side.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Timestamp;

/// Staleness metadata attached to a generated page
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMeta {
    /// Absolute staleness deadline (0 when the page never goes stale)
    #[serde(default)]
    pub expires: Timestamp,
    /// Dedupe window in milliseconds, roughly the regeneration cost
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deduping_interval: Option<u64>,
    /// Generation start
    #[serde(default)]
    pub time: Timestamp,
}

/// Regeneration policy declared by the page
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegenerationPolicy {
    /// Regeneration period in seconds; `None` or 0 for never
    pub revalidate_secs: Option<u64>,
    /// Extra dedupe time added on top of the measured generation time
    pub extra_deduping: Duration,
    /// Fixed regeneration period overriding the computed one
    pub revalidate_override: Option<u64>,
}

/// Generation metadata plus the regeneration period to hand to the origin
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StampedGeneration {
    pub meta: GenerationMeta,
    /// Period (seconds) after which the origin regenerates; `None` for never
    pub revalidate_secs: Option<u64>,
}

impl GenerationMeta {
    /// Stamp a generation that ran from `started_at` to `finished_at`.
    ///
    /// The deadline leaves slack of twice the regeneration period plus the
    /// time the generation itself took.
    pub fn stamp(
        started_at: Timestamp,
        finished_at: Timestamp,
        policy: &RegenerationPolicy,
    ) -> StampedGeneration {
        let period_secs = policy.revalidate_secs.filter(|s| *s > 0);
        let duration = finished_at - started_at;

        let expires = match period_secs {
            Some(secs) => {
                let period_ms = (secs as i64).saturating_mul(1000);
                let doubled = period_ms
                    .saturating_add(finished_at.as_millis())
                    .saturating_mul(2);
                Timestamp(doubled.saturating_sub(started_at.as_millis()))
            }
            None => Timestamp::ZERO,
        };

        let revalidate_secs = policy
            .revalidate_override
            .or_else(|| period_secs.map(|secs| duration.as_secs() + secs));

        StampedGeneration {
            meta: GenerationMeta {
                expires,
                deduping_interval: Some((duration + policy.extra_deduping).as_millis() as u64),
                time: started_at,
            },
            revalidate_secs,
        }
    }

    /// Whether the page declares a staleness deadline
    pub fn expires_at(&self) -> Option<Timestamp> {
        Some(self.expires).filter(|e| !e.is_zero())
    }
}
