//! Error types for revalid

use thiserror::Error;

/// Core revalid errors
///
/// Skipped refreshes are not errors; see `SkipReason` in the scheduler.
#[derive(Error, Debug)]
pub enum RevalidError {
    // Navigation errors
    #[error("Navigation failed: {0}")]
    Navigation(String),

    // Clock errors
    #[error("Freshness probe failed: {0}")]
    Probe(String),

    #[error("Freshness probe timed out")]
    ProbeTimeout,

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Lifecycle errors
    #[error("No async runtime: {0}")]
    Runtime(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for revalid operations
pub type RevalidResult<T> = Result<T, RevalidError>;
