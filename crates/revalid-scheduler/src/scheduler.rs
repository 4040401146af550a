//! Revalidation scheduler - the transition function
//!
//! `Scheduler::handle(now, event)` is the only way state changes, apart from
//! the `refresh` entry point it shares with the host. Both run synchronously:
//! gating flags are set before any delay elapses, so triggers arriving back to
//! back always observe each other.

use tracing::{debug, trace};

use revalid_clock::{ClockEstimate, ClockSynchronizer, ProbeSample};
use revalid_core::{FreshnessConfig, Timestamp};

use crate::{
    mount_refresh_delay, CdnBackoff, Effect, Event, Execution, ExecutionStage, NavigationCoordinator,
    NavigationOutcome, NavigationSignal, NavigationState, PendingRefresh, PrefetchOptions,
    RefreshDecision, RefreshRequest, RefreshToken, RefreshVariant, ReplaceOptions, SchedulerOptions,
    SchedulerState, SkipReason, Trigger, MAX_REVALIDATION_ATTEMPTS,
};

/// Counters kept across the lifetime of a scheduler
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub requests: u64,
    pub scheduled: u64,
    pub skipped: u64,
    pub hard_completed: u64,
    pub soft_completed: u64,
    pub failed: u64,
    pub canceled: u64,
}

/// Revalidation state machine for one mounted page instance
pub struct Scheduler {
    path: String,
    config: FreshnessConfig,
    options: SchedulerOptions,
    state: SchedulerState,
    clock: ClockSynchronizer,
    navigation: NavigationCoordinator,
    backoff: CdnBackoff,
    next_token: u64,
    unmounted: bool,
    stats: SchedulerStats,
}

impl Scheduler {
    pub fn new(path: impl Into<String>, config: FreshnessConfig, options: SchedulerOptions) -> Self {
        let backoff = CdnBackoff::new(options.cdn_backoff_base, options.cdn_backoff_cap_factor);
        Scheduler {
            path: path.into(),
            config,
            options,
            state: SchedulerState::default(),
            clock: ClockSynchronizer::new(),
            navigation: NavigationCoordinator::new(),
            backoff,
            next_token: 1,
            unmounted: false,
            stats: SchedulerStats::default(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn config(&self) -> &FreshnessConfig {
        &self.config
    }

    pub fn options(&self) -> &SchedulerOptions {
        &self.options
    }

    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    pub fn clock(&self) -> ClockEstimate {
        self.clock.estimate()
    }

    pub fn navigation(&self) -> NavigationState {
        self.navigation.state()
    }

    pub fn cdn_backoff(&self) -> CdnBackoff {
        self.backoff
    }

    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    pub fn is_unmounted(&self) -> bool {
        self.unmounted
    }

    /// Single refresh entry point shared by every trigger
    pub fn refresh(&mut self, now: Timestamp, request: RefreshRequest) -> (RefreshDecision, Vec<Effect>) {
        self.stats.requests += 1;
        let mut effects = Vec::new();

        let decision = match self.gate(now, request) {
            Err(reason) => {
                self.stats.skipped += 1;
                trace!(path = %self.path, trigger = ?request.trigger, ?reason, "refresh skipped");
                RefreshDecision::Skipped(reason)
            }
            Ok(deduping) => {
                self.state.dedupe_expiry = now + deduping;

                match request.variant {
                    RefreshVariant::Hard => {
                        self.state.is_hard_refreshing = true;
                        self.state.is_soft_refreshing = false;
                        for execution in self.state.executions.iter_mut() {
                            if execution.variant == RefreshVariant::Soft {
                                execution.superseded = true;
                            }
                        }
                    }
                    RefreshVariant::Soft => self.state.is_soft_refreshing = true,
                }

                if let Some(previous) = self.state.pending.take() {
                    self.stats.canceled += 1;
                    effects.push(Effect::CancelTimer {
                        token: previous.token,
                    });
                }

                let token = self.issue_token();
                self.state.pending = Some(PendingRefresh {
                    token,
                    variant: request.variant,
                    fires_at: now + request.delay,
                });
                effects.push(Effect::ScheduleTimer {
                    token,
                    delay: request.delay,
                });

                self.stats.scheduled += 1;
                debug!(
                    path = %self.path,
                    trigger = ?request.trigger,
                    variant = %request.variant,
                    delay_ms = request.delay.as_millis() as u64,
                    "refresh scheduled"
                );
                RefreshDecision::Scheduled {
                    token,
                    variant: request.variant,
                    delay: request.delay,
                }
            }
        };

        (decision, effects)
    }

    /// Transition function: apply one event, return the effects it causes
    pub fn handle(&mut self, now: Timestamp, event: Event) -> Vec<Effect> {
        if self.unmounted {
            return Vec::new();
        }

        match event {
            Event::Mounted => vec![
                Effect::StartClockProbe,
                Effect::SetFocusListener(self.config.revalidate_on_focus),
                Effect::RestartInterval,
            ],
            Event::ClockProbed(sample) => self.on_clock_probed(now, &sample),
            Event::Navigation(signal) => self.on_navigation(now, &signal),
            Event::Focus => {
                if !self.config.revalidate_on_focus {
                    return Vec::new();
                }
                self.refresh(now, RefreshRequest::hard().triggered_by(Trigger::Focus)).1
            }
            Event::IntervalTick => self.refresh(now, RefreshRequest::hard().triggered_by(Trigger::Interval)).1,
            Event::TimerFired(token) => self.on_timer_fired(now, token),
            Event::PrefetchSettled { token, ok } => self.on_prefetch_settled(token, ok),
            Event::ReplaceSettled { token, ok } => self.on_replace_settled(now, token, ok),
            Event::PageLoaded { path, config } => self.on_page_loaded(now, path, config),
            Event::Unmounted => self.on_unmounted(),
        }
    }

    /// Gating, in order; `Ok` carries the dedupe interval to apply
    fn gate(&self, now: Timestamp, request: RefreshRequest) -> Result<std::time::Duration, SkipReason> {
        if self.unmounted {
            return Err(SkipReason::Unmounted);
        }
        let Some(deduping) = self.config.deduping_interval else {
            return Err(SkipReason::TrackingDisabled);
        };
        if self.navigation.is_transitioning() {
            return Err(SkipReason::Navigating);
        }
        if self.state.is_hard_refreshing {
            return Err(SkipReason::HardRefreshInFlight);
        }
        if request.variant == RefreshVariant::Soft && self.state.is_soft_refreshing {
            return Err(SkipReason::SoftRefreshInFlight);
        }
        if self.config.revalidate_if_stale && !self.config.is_stale(now, self.clock.estimate().offset_ms) {
            return Err(SkipReason::NotStale);
        }
        if self.state.is_deduping(now) {
            return Err(SkipReason::Deduped);
        }
        Ok(deduping)
    }

    /// On-mount policy; re-run whenever its inputs change
    fn evaluate_mount(&mut self, now: Timestamp) -> Vec<Effect> {
        if !self.config.revalidate_on_mount || !self.options.deployment.is_production_like() {
            return Vec::new();
        }
        let Some(deduping) = self.config.deduping_interval else {
            return Vec::new();
        };
        let attempt = self.state.revalidation_attempt;
        if attempt >= MAX_REVALIDATION_ATTEMPTS {
            return Vec::new();
        }
        let estimate = self.clock.estimate();
        if estimate.is_first_measurement {
            return Vec::new();
        }

        if attempt == 0 {
            return self.refresh(now, RefreshRequest::hard().triggered_by(Trigger::Mount)).1;
        }

        if !self.config.is_stale(now, estimate.offset_ms) {
            return Vec::new();
        }

        let backoff = if attempt == 2 {
            self.backoff.escalate()
        } else {
            self.backoff.current()
        };
        let delay = mount_refresh_delay(attempt, deduping, estimate.latency, backoff);

        self.refresh(
            now,
            RefreshRequest::soft()
                .with_delay(delay)
                .triggered_by(Trigger::Mount),
        )
        .1
    }

    fn on_clock_probed(&mut self, now: Timestamp, sample: &ProbeSample) -> Vec<Effect> {
        match self.clock.resolve(sample) {
            Some(estimate) => {
                debug!(
                    path = %self.path,
                    offset_ms = estimate.offset_ms,
                    latency_ms = estimate.latency.as_millis() as u64,
                    "clock resolved"
                );
                self.evaluate_mount(now)
            }
            None => Vec::new(),
        }
    }

    fn on_navigation(&mut self, now: Timestamp, signal: &NavigationSignal) -> Vec<Effect> {
        let mut effects = Vec::new();
        match self.navigation.observe(signal, &self.path) {
            NavigationOutcome::Preempted => self.cancel_pending(&mut effects),
            // A mount attempt vetoed or preempted by the transition gets another chance
            NavigationOutcome::Settled => effects.extend(self.evaluate_mount(now)),
            NavigationOutcome::Ignored => {}
        }
        effects
    }

    fn on_timer_fired(&mut self, now: Timestamp, token: RefreshToken) -> Vec<Effect> {
        let pending = match self.state.pending {
            Some(pending) if pending.token == token => pending,
            _ => return Vec::new(),
        };
        self.state.pending = None;

        if self.navigation.is_transitioning() {
            self.state.set_flag(pending.variant, false);
            return Vec::new();
        }

        match pending.variant {
            RefreshVariant::Soft => {
                self.state.executions.push(Execution {
                    token,
                    variant: RefreshVariant::Soft,
                    stage: ExecutionStage::Warming,
                    superseded: false,
                });
                vec![Effect::Prefetch {
                    token,
                    path: self.path.clone(),
                    options: PrefetchOptions {
                        skip_client_cache: true,
                    },
                }]
            }
            RefreshVariant::Hard if self.clock.estimate().is_first_measurement => {
                // Nothing rendered from a measured clock yet; nothing to replace
                self.state.is_hard_refreshing = false;
                self.complete(now, RefreshVariant::Hard)
            }
            RefreshVariant::Hard => {
                self.state.executions.push(Execution {
                    token,
                    variant: RefreshVariant::Hard,
                    stage: ExecutionStage::Replacing,
                    superseded: false,
                });
                vec![Effect::Replace {
                    token,
                    path: self.path.clone(),
                    options: ReplaceOptions {
                        skip_client_cache: true,
                        scroll: false,
                    },
                }]
            }
        }
    }

    fn on_prefetch_settled(&mut self, token: RefreshToken, ok: bool) -> Vec<Effect> {
        let Some(mut execution) = self.state.take_execution(token, ExecutionStage::Warming) else {
            return Vec::new();
        };
        if execution.superseded {
            return Vec::new();
        }
        if !ok {
            self.stats.failed += 1;
            self.state.is_soft_refreshing = false;
            return Vec::new();
        }
        if self.navigation.is_transitioning() {
            self.state.is_soft_refreshing = false;
            return Vec::new();
        }

        execution.stage = ExecutionStage::Replacing;
        self.state.executions.push(execution);
        vec![Effect::Replace {
            token,
            path: self.path.clone(),
            options: ReplaceOptions {
                skip_client_cache: false,
                scroll: false,
            },
        }]
    }

    fn on_replace_settled(&mut self, now: Timestamp, token: RefreshToken, ok: bool) -> Vec<Effect> {
        let Some(execution) = self.state.take_execution(token, ExecutionStage::Replacing) else {
            return Vec::new();
        };
        if execution.superseded {
            return Vec::new();
        }

        self.state.set_flag(execution.variant, false);
        if !ok {
            self.stats.failed += 1;
            return Vec::new();
        }
        self.complete(now, execution.variant)
    }

    fn complete(&mut self, now: Timestamp, variant: RefreshVariant) -> Vec<Effect> {
        match variant {
            RefreshVariant::Hard => self.stats.hard_completed += 1,
            RefreshVariant::Soft => self.stats.soft_completed += 1,
        }
        self.state.count_attempt();
        self.evaluate_mount(now)
    }

    fn on_page_loaded(&mut self, now: Timestamp, path: String, config: FreshnessConfig) -> Vec<Effect> {
        let mut effects = Vec::new();

        if path != self.path {
            // New page identity: nothing from the old page may land on it
            self.cancel_pending(&mut effects);
            self.state = SchedulerState::default();
            self.navigation.reset();
            self.path = path;
        } else if config != self.config {
            self.cancel_pending(&mut effects);
            self.state.revalidation_attempt = 0;
        } else {
            effects.push(Effect::RestartInterval);
            return effects;
        }

        self.config = config;
        effects.push(Effect::RestartInterval);
        effects.push(Effect::SetFocusListener(self.config.revalidate_on_focus));
        effects.extend(self.evaluate_mount(now));
        effects
    }

    fn on_unmounted(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.cancel_pending(&mut effects);
        self.state.executions.clear();
        self.state.is_hard_refreshing = false;
        self.state.is_soft_refreshing = false;
        self.unmounted = true;
        effects.push(Effect::Teardown);
        effects
    }

    /// Drop the pending timer and release the flag it held
    fn cancel_pending(&mut self, effects: &mut Vec<Effect>) {
        if let Some(pending) = self.state.pending.take() {
            self.state.set_flag(pending.variant, false);
            self.stats.canceled += 1;
            effects.push(Effect::CancelTimer { token: pending.token });
        }
    }

    fn issue_token(&mut self) -> RefreshToken {
        let token = RefreshToken(self.next_token);
        self.next_token += 1;
        token
    }
}
