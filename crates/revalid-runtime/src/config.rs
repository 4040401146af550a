//! Runtime configuration
//!
//! Loaded from JSON or the environment. Durations are human-readable
//! strings such as `"3s"` or `"200ms"`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use revalid_core::{Deployment, RevalidError, RevalidResult};
use revalid_scheduler::{SchedulerOptions, DEFAULT_CDN_BACKOFF, DEFAULT_CDN_BACKOFF_CAP_FACTOR};

/// Path served by the freshness endpoint
pub const DEFAULT_FRESHNESS_PATH: &str = "/swr";

/// Runtime settings shared by every page instance of a host
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub deployment: Deployment,
    /// Freshness endpoint path
    pub freshness_path: String,
    /// Origin (scheme and authority) the HTTP probe talks to
    pub origin: Option<String>,
    /// Probe requests slower than this count as failed
    #[serde(with = "human_duration")]
    pub probe_timeout: Duration,
    /// Initial CDN propagation allowance for on-mount soft refreshes
    #[serde(with = "human_duration")]
    pub cdn_backoff_base: Duration,
    pub cdn_backoff_cap_factor: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            deployment: Deployment::Development,
            freshness_path: DEFAULT_FRESHNESS_PATH.to_string(),
            origin: None,
            probe_timeout: Duration::from_secs(3),
            cdn_backoff_base: DEFAULT_CDN_BACKOFF,
            cdn_backoff_cap_factor: DEFAULT_CDN_BACKOFF_CAP_FACTOR,
        }
    }
}

impl RuntimeConfig {
    /// Production deployment behind a CDN
    pub fn production() -> Self {
        RuntimeConfig {
            deployment: Deployment::Production,
            ..Self::default()
        }
    }

    /// Configuration for slow mobile links
    pub fn slow_network() -> Self {
        RuntimeConfig {
            probe_timeout: Duration::from_secs(10),
            cdn_backoff_base: Duration::from_millis(400),
            ..Self::production()
        }
    }

    pub fn from_json(json: &str) -> RevalidResult<Self> {
        let config: RuntimeConfig =
            serde_json::from_str(json).map_err(|e| RevalidError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read `REVALID_*` variables on top of the defaults
    pub fn from_env() -> RevalidResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> RevalidResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = RuntimeConfig::default();

        if let Some(deployment) = lookup("REVALID_DEPLOYMENT") {
            config.deployment = deployment.parse()?;
        }
        if let Some(path) = lookup("REVALID_FRESHNESS_PATH") {
            config.freshness_path = path;
        }
        if let Some(origin) = lookup("REVALID_ORIGIN") {
            config.origin = Some(origin);
        }
        if let Some(timeout) = lookup("REVALID_PROBE_TIMEOUT") {
            config.probe_timeout = parse_duration(&timeout)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> RevalidResult<()> {
        if !self.freshness_path.starts_with('/') {
            return Err(RevalidError::InvalidConfig(format!(
                "freshness path must start with '/': {}",
                self.freshness_path
            )));
        }
        if self.probe_timeout.is_zero() {
            return Err(RevalidError::InvalidConfig("probe timeout must be positive".into()));
        }
        if self.cdn_backoff_cap_factor == 0 {
            return Err(RevalidError::InvalidConfig("CDN backoff cap factor must be at least 1".into()));
        }
        Ok(())
    }

    /// Full URL of the freshness endpoint, if an origin is configured
    pub fn freshness_url(&self) -> Option<String> {
        self.origin
            .as_ref()
            .map(|origin| format!("{}{}", origin.trim_end_matches('/'), self.freshness_path))
    }

    pub fn scheduler_options(&self) -> SchedulerOptions {
        SchedulerOptions {
            deployment: self.deployment,
            cdn_backoff_base: self.cdn_backoff_base,
            cdn_backoff_cap_factor: self.cdn_backoff_cap_factor,
        }
    }
}

fn parse_duration(s: &str) -> RevalidResult<Duration> {
    humantime::parse_duration(s.trim())
        .map_err(|e| RevalidError::InvalidConfig(format!("invalid duration {:?}: {}", s, e)))
}

mod human_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
