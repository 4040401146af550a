//! Inputs and outputs of the transition function

use std::time::Duration;

use revalid_clock::ProbeSample;
use revalid_core::FreshnessConfig;

use crate::{NavigationSignal, RefreshToken, RefreshVariant};

/// Source of a refresh request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// Called directly by the host
    Manual,
    Mount,
    Interval,
    Focus,
}

/// Arguments of the single refresh entry point
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefreshRequest {
    pub delay: Duration,
    pub variant: RefreshVariant,
    pub trigger: Trigger,
}

impl RefreshRequest {
    /// Immediate hard refresh
    pub fn hard() -> Self {
        RefreshRequest {
            delay: Duration::ZERO,
            variant: RefreshVariant::Hard,
            trigger: Trigger::Manual,
        }
    }

    /// Immediate soft refresh
    pub fn soft() -> Self {
        RefreshRequest {
            variant: RefreshVariant::Soft,
            ..Self::hard()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn triggered_by(mut self, trigger: Trigger) -> Self {
        self.trigger = trigger;
        self
    }
}

impl Default for RefreshRequest {
    fn default() -> Self {
        Self::hard()
    }
}

/// Why a refresh request was a no-op
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// No dedupe interval configured
    TrackingDisabled,
    /// A page transition is under way
    Navigating,
    HardRefreshInFlight,
    SoftRefreshInFlight,
    NotStale,
    Deduped,
    Unmounted,
}

/// Result of a refresh request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshDecision {
    Scheduled {
        token: RefreshToken,
        variant: RefreshVariant,
        delay: Duration,
    },
    Skipped(SkipReason),
}

impl RefreshDecision {
    pub fn is_scheduled(&self) -> bool {
        matches!(self, RefreshDecision::Scheduled { .. })
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            RefreshDecision::Skipped(reason) => Some(*reason),
            RefreshDecision::Scheduled { .. } => None,
        }
    }
}

/// Options for an in-place content replace
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ReplaceOptions {
    /// Bypass the client-side data cache
    pub skip_client_cache: bool,
    /// Scroll to top after replacing
    pub scroll: bool,
}

/// Options for a background prefetch
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct PrefetchOptions {
    pub skip_client_cache: bool,
}

/// Host inputs to the transition function
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Page instance attached
    Mounted,
    /// Clock probe settled
    ClockProbed(ProbeSample),
    Navigation(NavigationSignal),
    /// Window regained focus
    Focus,
    IntervalTick,
    TimerFired(RefreshToken),
    PrefetchSettled { token: RefreshToken, ok: bool },
    ReplaceSettled { token: RefreshToken, ok: bool },
    /// New page props arrived
    PageLoaded { path: String, config: FreshnessConfig },
    Unmounted,
}

/// Work the host runtime must carry out
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Issue the single clock probe for this mount
    StartClockProbe,
    /// Fire `Event::TimerFired(token)` after `delay`
    ScheduleTimer { token: RefreshToken, delay: Duration },
    CancelTimer { token: RefreshToken },
    /// Call the navigator, then report `Event::PrefetchSettled`
    Prefetch {
        token: RefreshToken,
        path: String,
        options: PrefetchOptions,
    },
    /// Call the navigator, then report `Event::ReplaceSettled`
    Replace {
        token: RefreshToken,
        path: String,
        options: ReplaceOptions,
    },
    /// (Re)start the periodic trigger from current config and props
    RestartInterval,
    /// Register or drop the focus-regain listener
    SetFocusListener(bool),
    /// Stop every timer, task and listener of the instance
    Teardown,
}
