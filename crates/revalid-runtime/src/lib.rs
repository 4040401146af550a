//! revalid Runtime - drives the scheduler for mounted pages
//!
//! This crate connects the pure scheduler to the outside world:
//! - Page instances: timers, navigator calls, focus and interval triggers
//! - Host: navigator, freshness probe and signal hubs shared by instances
//! - HTTP freshness probe and the axum endpoint it talks to
//! - Runtime configuration and tracing setup

pub mod clock;
pub mod config;
pub mod endpoint;
pub mod host;
pub mod http;
pub mod page;
pub mod stats;
pub mod telemetry;

pub use clock::*;
pub use config::*;
pub use endpoint::*;
pub use host::*;
pub use http::*;
pub use page::*;
pub use stats::*;
pub use telemetry::*;
