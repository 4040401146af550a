//! Scheduler state owned by one mounted page instance

use std::fmt;

use revalid_core::Timestamp;

/// On-mount attempts stop at this count
pub const MAX_REVALIDATION_ATTEMPTS: u8 = 3;

/// Refresh flavor
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefreshVariant {
    /// Replace discarding client cache
    Hard,
    /// Warm the origin, then replace preserving client cache
    Soft,
}

impl fmt::Display for RefreshVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshVariant::Hard => f.write_str("hard"),
            RefreshVariant::Soft => f.write_str("soft"),
        }
    }
}

/// Identifies one scheduled refresh through its timer and execution
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RefreshToken(pub u64);

impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Refresh#{}", self.0)
    }
}

/// Coarse state of the machine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    HardRefreshing,
    SoftRefreshing,
}

/// Refresh waiting on its delay timer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingRefresh {
    pub token: RefreshToken,
    pub variant: RefreshVariant,
    pub fires_at: Timestamp,
}

/// Step an executing refresh is awaiting
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionStage {
    /// Background cache-warm probe (soft only)
    Warming,
    /// Content replace
    Replacing,
}

/// Refresh whose navigator calls are outstanding
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Execution {
    pub token: RefreshToken,
    pub variant: RefreshVariant,
    pub stage: ExecutionStage,
    /// A hard refresh took over; this one must not touch flags or content
    pub superseded: bool,
}

/// Mutable scheduler state
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SchedulerState {
    pub revalidation_attempt: u8,
    pub is_hard_refreshing: bool,
    pub is_soft_refreshing: bool,
    pub dedupe_expiry: Timestamp,
    pub pending: Option<PendingRefresh>,
    pub executions: Vec<Execution>,
}

impl SchedulerState {
    pub fn phase(&self) -> Phase {
        if self.is_hard_refreshing {
            Phase::HardRefreshing
        } else if self.is_soft_refreshing {
            Phase::SoftRefreshing
        } else {
            Phase::Idle
        }
    }

    pub fn is_deduping(&self, now: Timestamp) -> bool {
        now < self.dedupe_expiry
    }

    pub(crate) fn set_flag(&mut self, variant: RefreshVariant, value: bool) {
        match variant {
            RefreshVariant::Hard => self.is_hard_refreshing = value,
            RefreshVariant::Soft => self.is_soft_refreshing = value,
        }
    }

    pub(crate) fn count_attempt(&mut self) {
        if self.revalidation_attempt < MAX_REVALIDATION_ATTEMPTS {
            self.revalidation_attempt += 1;
        }
    }

    pub(crate) fn take_execution(&mut self, token: RefreshToken, stage: ExecutionStage) -> Option<Execution> {
        let idx = self
            .executions
            .iter()
            .position(|e| e.token == token && e.stage == stage)?;
        Some(self.executions.remove(idx))
    }
}
