//! revalid Core - Fundamental types and primitives
//!
//! This crate defines the types shared by every revalid crate:
//! - Wall-clock timestamps (Timestamp)
//! - Freshness configuration and deployment context
//! - Generation-time metadata produced alongside static pages
//! - Versioned page props
//! - Signal hubs with disposable subscriptions

pub mod time;
pub mod config;
pub mod generation;
pub mod versioned;
pub mod signal;
pub mod error;

pub use time::*;
pub use config::*;
pub use generation::*;
pub use versioned::*;
pub use signal::*;
pub use error::*;
