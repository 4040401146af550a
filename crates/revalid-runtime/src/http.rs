//! HTTP freshness probe

use std::future::Future;

use reqwest::header::CACHE_CONTROL;
use reqwest::Client;

use revalid_clock::{FreshnessProbe, FreshnessResponse};
use revalid_core::{RevalidError, RevalidResult};

use crate::RuntimeConfig;

/// Probe that `GET`s the freshness endpoint over HTTP
#[derive(Clone, Debug)]
pub struct HttpFreshnessProbe {
    client: Client,
    url: String,
}

impl HttpFreshnessProbe {
    pub fn new(url: impl Into<String>) -> Self {
        HttpFreshnessProbe {
            client: Client::new(),
            url: url.into(),
        }
    }

    /// Build from the configured origin and path
    pub fn from_config(config: &RuntimeConfig) -> RevalidResult<Self> {
        let url = config
            .freshness_url()
            .ok_or_else(|| RevalidError::InvalidConfig("no origin configured for the freshness probe".into()))?;
        let client = Client::builder()
            .timeout(config.probe_timeout)
            .build()
            .map_err(|e| RevalidError::InvalidConfig(e.to_string()))?;
        Ok(HttpFreshnessProbe { client, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl FreshnessProbe for HttpFreshnessProbe {
    fn probe(&self) -> impl Future<Output = RevalidResult<FreshnessResponse>> + Send {
        let request = self.client.get(&self.url).header(CACHE_CONTROL, "no-cache");
        async move {
            let response = request
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| RevalidError::Probe(e.to_string()))?;
            response
                .json::<FreshnessResponse>()
                .await
                .map_err(|e| RevalidError::Probe(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_requires_origin() {
        assert!(HttpFreshnessProbe::from_config(&RuntimeConfig::default()).is_err());

        let config = RuntimeConfig {
            origin: Some("http://localhost:8080".into()),
            ..RuntimeConfig::default()
        };
        let probe = HttpFreshnessProbe::from_config(&config).unwrap();
        assert_eq!(probe.url(), "http://localhost:8080/swr");
    }
}
