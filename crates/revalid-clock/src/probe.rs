//! Freshness probe abstraction
//!
//! The freshness endpoint answers `GET` with `{"timestamp": <server now ms>}`.
//! A probe may also answer without a timestamp, which yields a zero offset.

use std::future::Future;

use serde::{Deserialize, Serialize};

use revalid_core::{RevalidResult, Timestamp};

use crate::ProbeSample;

/// Body returned by the freshness endpoint
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FreshnessResponse {
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
}

impl FreshnessResponse {
    pub fn at(timestamp: Timestamp) -> Self {
        FreshnessResponse {
            timestamp: Some(timestamp),
        }
    }
}

/// Source of server time
pub trait FreshnessProbe: Send + Sync + 'static {
    /// Issue one request to the freshness endpoint
    fn probe(&self) -> impl Future<Output = RevalidResult<FreshnessResponse>> + Send;
}

/// Time one probe request.
///
/// `now` is read right before the request is issued and right after it
/// settles, whatever the outcome.
pub async fn measure<F, Fut>(now: F, request: Fut) -> ProbeSample
where
    F: Fn() -> Timestamp,
    Fut: Future<Output = RevalidResult<FreshnessResponse>>,
{
    let sent_at = now();
    let result = request.await;
    let received_at = now();

    match result {
        Ok(response) => ProbeSample::answered(sent_at, received_at, response.timestamp),
        Err(e) => ProbeSample::failed(sent_at, received_at, e.to_string()),
    }
}
