//! revalid Clock - client/server clock synchronization
//!
//! This crate implements the clock side of revalidation:
//! - Clock estimate (offset, latency, first-measurement flag)
//! - One-shot synchronizer: the first probe resolution wins
//! - Freshness probe abstraction and measurement

pub mod estimate;
pub mod probe;
pub mod sync;

pub use estimate::*;
pub use probe::*;
pub use sync::*;
