//! Freshness configuration and deployment context

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{GenerationMeta, RevalidError, Timestamp};

/// Page props as delivered by the generation step
pub type PageProps = serde_json::Value;

/// Function computing a refresh period from the current page props
pub type IntervalFn = Arc<dyn Fn(&PageProps) -> Duration + Send + Sync>;

/// Periodic refresh policy
#[derive(Clone, Default)]
pub enum RefreshInterval {
    /// No periodic refresh
    #[default]
    Off,
    /// Fixed period
    Every(Duration),
    /// Period derived from page props at (re)start time
    Computed(IntervalFn),
}

impl RefreshInterval {
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&PageProps) -> Duration + Send + Sync + 'static,
    {
        RefreshInterval::Computed(Arc::new(f))
    }

    /// Resolve the period for the given props. A zero period means off.
    pub fn resolve(&self, props: &PageProps) -> Option<Duration> {
        let period = match self {
            RefreshInterval::Off => return None,
            RefreshInterval::Every(period) => *period,
            RefreshInterval::Computed(f) => f(props),
        };
        (!period.is_zero()).then_some(period)
    }

    pub fn is_off(&self) -> bool {
        matches!(self, RefreshInterval::Off)
    }
}

impl PartialEq for RefreshInterval {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RefreshInterval::Off, RefreshInterval::Off) => true,
            (RefreshInterval::Every(a), RefreshInterval::Every(b)) => a == b,
            (RefreshInterval::Computed(a), RefreshInterval::Computed(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for RefreshInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshInterval::Off => write!(f, "Off"),
            RefreshInterval::Every(period) => write!(f, "Every({:?})", period),
            RefreshInterval::Computed(_) => write!(f, "Computed(..)"),
        }
    }
}

/// Freshness configuration for one render cycle
///
/// Replaced wholesale whenever the host supplies new page props.
#[derive(Clone, Debug, PartialEq)]
pub struct FreshnessConfig {
    /// Offset-adjusted staleness deadline; `None` disables the staleness check
    pub expires: Option<Timestamp>,
    /// Dedupe window; `None` disables staleness tracking altogether
    pub deduping_interval: Option<Duration>,
    pub refresh_interval: RefreshInterval,
    pub revalidate_if_stale: bool,
    pub revalidate_on_mount: bool,
    pub revalidate_on_focus: bool,
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        FreshnessConfig {
            expires: None,
            deduping_interval: None,
            refresh_interval: RefreshInterval::Off,
            revalidate_if_stale: true,
            revalidate_on_mount: true,
            revalidate_on_focus: true,
        }
    }
}

impl FreshnessConfig {
    /// Build a config from generation metadata, keeping default trigger policy
    pub fn from_meta(meta: &GenerationMeta) -> Self {
        FreshnessConfig {
            expires: meta.expires_at(),
            deduping_interval: meta.deduping_interval.map(Duration::from_millis),
            ..FreshnessConfig::default()
        }
    }

    pub fn with_refresh_interval(mut self, interval: RefreshInterval) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn with_revalidate_if_stale(mut self, enabled: bool) -> Self {
        self.revalidate_if_stale = enabled;
        self
    }

    pub fn with_revalidate_on_mount(mut self, enabled: bool) -> Self {
        self.revalidate_on_mount = enabled;
        self
    }

    pub fn with_revalidate_on_focus(mut self, enabled: bool) -> Self {
        self.revalidate_on_focus = enabled;
        self
    }

    /// Staleness tracking is enabled only when a dedupe window is configured
    pub fn tracks_staleness(&self) -> bool {
        self.deduping_interval.is_some()
    }

    /// Whether content is stale at `now`, given a client-minus-server offset.
    /// Falsy `expires` never counts as stale.
    pub fn is_stale(&self, now: Timestamp, offset_ms: i64) -> bool {
        match self.expires {
            Some(expires) if !expires.is_zero() => expires.offset_by(offset_ms) <= now,
            _ => false,
        }
    }
}

/// Deployment context of the host
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Deployment {
    #[default]
    Development,
    Preview,
    Production,
}

impl Deployment {
    /// Preview and production deployments serve regenerated pages through a CDN
    pub fn is_production_like(self) -> bool {
        matches!(self, Deployment::Preview | Deployment::Production)
    }
}

impl FromStr for Deployment {
    type Err = RevalidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" | "" => Ok(Deployment::Development),
            "preview" => Ok(Deployment::Preview),
            "production" | "prod" => Ok(Deployment::Production),
            other => Err(RevalidError::InvalidConfig(format!(
                "unknown deployment: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for Deployment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Deployment::Development => "development",
            Deployment::Preview => "preview",
            Deployment::Production => "production",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_enable_all_triggers() {
        let config = FreshnessConfig::default();
        assert!(config.revalidate_if_stale);
        assert!(config.revalidate_on_mount);
        assert!(config.revalidate_on_focus);
        assert!(!config.tracks_staleness());
        assert!(config.refresh_interval.is_off());
    }

    #[test]
    fn test_from_meta_normalizes_zero_expiry() {
        let meta = GenerationMeta {
            expires: Timestamp::ZERO,
            deduping_interval: Some(120),
            time: Timestamp(5),
        };
        let config = FreshnessConfig::from_meta(&meta);

        assert_eq!(config.expires, None);
        assert_eq!(config.deduping_interval, Some(Duration::from_millis(120)));
    }

    #[test]
    fn test_staleness_boundary() {
        let config = FreshnessConfig {
            expires: Some(Timestamp(1_000)),
            ..FreshnessConfig::default()
        };

        assert!(!config.is_stale(Timestamp(1_059), 60));
        assert!(config.is_stale(Timestamp(1_060), 60));
        assert!(config.is_stale(Timestamp(1_000), 0));
    }

    #[test]
    fn test_interval_resolution() {
        let props = serde_json::json!({ "period": 250 });

        assert_eq!(RefreshInterval::Off.resolve(&props), None);
        assert_eq!(RefreshInterval::Every(Duration::ZERO).resolve(&props), None);
        assert_eq!(
            RefreshInterval::Every(Duration::from_secs(5)).resolve(&props),
            Some(Duration::from_secs(5))
        );

        let computed = RefreshInterval::computed(|props| {
            Duration::from_millis(props["period"].as_u64().unwrap_or(0))
        });
        assert_eq!(computed.resolve(&props), Some(Duration::from_millis(250)));
        assert_eq!(computed, computed.clone());
        assert_ne!(computed, RefreshInterval::computed(|_| Duration::ZERO));
    }

    #[test]
    fn test_deployment_parse() {
        assert_eq!("production".parse::<Deployment>().unwrap(), Deployment::Production);
        assert_eq!(" Preview ".parse::<Deployment>().unwrap(), Deployment::Preview);
        assert_eq!("".parse::<Deployment>().unwrap(), Deployment::Development);
        assert!("staging".parse::<Deployment>().is_err());
        assert!(Deployment::Preview.is_production_like());
        assert!(!Deployment::Development.is_production_like());
    }
}
