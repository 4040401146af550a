//! Tracing setup

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use revalid_core::{RevalidError, RevalidResult};

/// Output format of the global subscriber
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

/// Install the global subscriber. `RUST_LOG` overrides the `info` default.
/// Fails if a subscriber is already installed.
pub fn init_tracing(format: LogFormat) -> RevalidResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let result = match format {
        LogFormat::Plain => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| RevalidError::Runtime(format!("tracing setup failed: {}", e)))
}
