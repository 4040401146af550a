//! Mounted page instance
//!
//! Every input (hub signals, timers, navigator completions, the clock probe)
//! goes through `Shared::handle`, which runs the scheduler and applies the
//! resulting effects before releasing the scheduler lock. Effects of two
//! transitions never interleave.
//!
//! Spawned tasks hold a `Weak` reference to the instance and stop reporting
//! once it is gone.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, timeout, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use revalid_clock::{measure, ClockEstimate, FreshnessProbe, ProbeOutcome};
use revalid_core::{FreshnessConfig, PageProps, RevalidError, SignalHub, Subscription, Timestamp, VersionedProps};
use revalid_scheduler::{
    Effect, Event, NavigationSignal, NavigationState, PrefetchOptions, RefreshDecision, RefreshRequest,
    RefreshToken, ReplaceOptions, Scheduler, SchedulerState,
};

use crate::{EpochClock, FocusSignal, Host, Navigator, PageLoad, RuntimeConfig, RuntimeCounters, RuntimeStats};

/// Handles of everything an instance has running
#[derive(Default)]
struct Tasks {
    timer: Option<(RefreshToken, JoinHandle<()>)>,
    executions: Vec<JoinHandle<()>>,
    probe: Option<JoinHandle<()>>,
    interval: Option<JoinHandle<()>>,
    navigation_sub: Option<Subscription>,
    focus_sub: Option<Subscription>,
}

impl Tasks {
    fn track(&mut self, handle: JoinHandle<()>) {
        self.executions.retain(|h| !h.is_finished());
        self.executions.push(handle);
    }

    /// Forget a timer that already fired
    fn release_timer(&mut self, token: RefreshToken) {
        if self.timer.as_ref().is_some_and(|(t, _)| *t == token) {
            self.timer = None;
        }
    }

    fn cancel_timer(&mut self, token: RefreshToken) {
        if self.timer.as_ref().is_some_and(|(t, _)| *t == token) {
            if let Some((_, handle)) = self.timer.take() {
                handle.abort();
            }
        }
    }

    fn shutdown(&mut self) {
        if let Some((_, handle)) = self.timer.take() {
            handle.abort();
        }
        for handle in self.executions.drain(..) {
            handle.abort();
        }
        if let Some(handle) = self.probe.take() {
            handle.abort();
        }
        if let Some(handle) = self.interval.take() {
            handle.abort();
        }
        self.navigation_sub = None;
        self.focus_sub = None;
    }
}

struct Shared<N, P> {
    scheduler: Mutex<Scheduler>,
    tasks: Mutex<Tasks>,
    props: Mutex<VersionedProps<PageProps>>,
    navigator: Arc<N>,
    probe: Arc<P>,
    focus: SignalHub<FocusSignal>,
    config: RuntimeConfig,
    clock: EpochClock,
    runtime: Handle,
    counters: RuntimeCounters,
}

impl<N: Navigator, P: FreshnessProbe> Shared<N, P> {
    fn handle(self: &Arc<Self>, event: Event) {
        let mut scheduler = self.scheduler.lock();
        self.dispatch(&mut scheduler, event);
    }

    /// Run one transition; the caller holds the scheduler lock
    fn dispatch(self: &Arc<Self>, scheduler: &mut Scheduler, event: Event) {
        if let Event::TimerFired(token) = &event {
            self.tasks.lock().release_timer(*token);
        }
        let effects = scheduler.handle(self.clock.now(), event);
        self.apply(scheduler, effects);
    }

    fn refresh(self: &Arc<Self>, request: RefreshRequest) -> RefreshDecision {
        let mut scheduler = self.scheduler.lock();
        let (decision, effects) = scheduler.refresh(self.clock.now(), request);
        self.apply(&scheduler, effects);
        decision
    }

    /// Carry out effects; the caller holds the scheduler lock
    fn apply(self: &Arc<Self>, scheduler: &Scheduler, effects: Vec<Effect>) {
        if effects.is_empty() {
            return;
        }
        let mut tasks = self.tasks.lock();

        for effect in effects {
            match effect {
                Effect::StartClockProbe => {
                    if tasks.probe.is_none() {
                        tasks.probe = Some(self.spawn_probe());
                    }
                }
                Effect::ScheduleTimer { token, delay } => {
                    let handle = self.spawn_timer(token, delay);
                    if let Some((_, previous)) = tasks.timer.replace((token, handle)) {
                        previous.abort();
                    }
                }
                Effect::CancelTimer { token } => tasks.cancel_timer(token),
                Effect::Prefetch { token, path, options } => {
                    let handle = self.spawn_prefetch(token, path, options);
                    tasks.track(handle);
                }
                Effect::Replace { token, path, options } => {
                    let handle = self.spawn_replace(token, path, options);
                    tasks.track(handle);
                }
                Effect::RestartInterval => {
                    if let Some(handle) = tasks.interval.take() {
                        handle.abort();
                    }
                    let period = scheduler.config().refresh_interval.resolve(self.props.lock().get());
                    tasks.interval = period.and_then(|period| self.spawn_interval(period));
                }
                Effect::SetFocusListener(enabled) => {
                    if !enabled {
                        tasks.focus_sub = None;
                    } else if tasks.focus_sub.is_none() {
                        let weak = Arc::downgrade(self);
                        tasks.focus_sub = Some(self.focus.subscribe(move |_: &FocusSignal| {
                            if let Some(shared) = weak.upgrade() {
                                RuntimeCounters::bump(&shared.counters.focus_events);
                                shared.handle(Event::Focus);
                            }
                        }));
                    }
                }
                Effect::Teardown => tasks.shutdown(),
            }
        }
    }

    fn spawn_probe(self: &Arc<Self>) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        let probe = Arc::clone(&self.probe);
        let clock = self.clock;
        let limit = self.config.probe_timeout;
        let log_failures = !self.config.deployment.is_production_like();
        RuntimeCounters::bump(&self.counters.probes_sent);

        self.runtime.spawn(async move {
            let sample = measure(
                || clock.now(),
                async {
                    match timeout(limit, probe.probe()).await {
                        Ok(result) => result,
                        Err(_) => Err(RevalidError::ProbeTimeout),
                    }
                },
            )
            .await;

            if let ProbeOutcome::Failed(reason) = &sample.outcome {
                if log_failures {
                    warn!(%reason, "freshness probe failed, assuming no clock offset");
                }
            }
            if let Some(shared) = weak.upgrade() {
                if sample.is_failure() {
                    RuntimeCounters::bump(&shared.counters.probe_failures);
                }
                shared.handle(Event::ClockProbed(sample));
            }
        })
    }

    fn spawn_timer(self: &Arc<Self>, token: RefreshToken, delay: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        self.runtime.spawn(async move {
            sleep(delay).await;
            if let Some(shared) = weak.upgrade() {
                shared.handle(Event::TimerFired(token));
            }
        })
    }

    fn spawn_prefetch(self: &Arc<Self>, token: RefreshToken, path: String, options: PrefetchOptions) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        let navigator = Arc::clone(&self.navigator);
        RuntimeCounters::bump(&self.counters.prefetches);

        self.runtime.spawn(async move {
            let ok = match navigator.prefetch(&path, options).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(%path, error = %e, "prefetch failed");
                    false
                }
            };
            if let Some(shared) = weak.upgrade() {
                if !ok {
                    RuntimeCounters::bump(&shared.counters.navigator_failures);
                }
                shared.handle(Event::PrefetchSettled { token, ok });
            }
        })
    }

    fn spawn_replace(self: &Arc<Self>, token: RefreshToken, path: String, options: ReplaceOptions) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        let navigator = Arc::clone(&self.navigator);
        RuntimeCounters::bump(&self.counters.replaces);

        self.runtime.spawn(async move {
            let ok = match navigator.replace(&path, options).await {
                Ok(()) => {
                    info!(%path, skip_client_cache = options.skip_client_cache, "page content replaced");
                    true
                }
                Err(e) => {
                    warn!(%path, error = %e, "replace failed");
                    false
                }
            };
            if let Some(shared) = weak.upgrade() {
                if !ok {
                    RuntimeCounters::bump(&shared.counters.navigator_failures);
                }
                shared.handle(Event::ReplaceSettled { token, ok });
            }
        })
    }

    fn spawn_interval(self: &Arc<Self>, period: Duration) -> Option<JoinHandle<()>> {
        let weak: Weak<Self> = Arc::downgrade(self);
        let Some(start) = Instant::now().checked_add(period) else {
            warn!(?period, "refresh interval out of range, not starting it");
            return None;
        };

        Some(self.runtime.spawn(async move {
            let mut ticker = interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(shared) = weak.upgrade() else {
                    break;
                };
                RuntimeCounters::bump(&shared.counters.interval_ticks);
                shared.handle(Event::IntervalTick);
            }
        }))
    }
}

/// A page attached to a host. Dropping it unmounts.
pub struct PageInstance<N: Navigator, P: FreshnessProbe> {
    shared: Arc<Shared<N, P>>,
}

impl<N: Navigator, P: FreshnessProbe> PageInstance<N, P> {
    pub(crate) fn mount(host: &Host<N, P>, load: PageLoad, runtime: Handle) -> Self {
        let PageLoad {
            path,
            config,
            props,
            generated_at,
        } = load;

        let shared = Arc::new(Shared {
            scheduler: Mutex::new(Scheduler::new(path, config, host.config.scheduler_options())),
            tasks: Mutex::new(Tasks::default()),
            props: Mutex::new(VersionedProps::new(props, generated_at)),
            navigator: Arc::clone(&host.navigator),
            probe: Arc::clone(&host.probe),
            focus: host.focus.clone(),
            config: host.config.clone(),
            clock: host.clock,
            runtime,
            counters: RuntimeCounters::default(),
        });

        let weak = Arc::downgrade(&shared);
        let navigation_sub = host.navigation.subscribe(move |signal: &NavigationSignal| {
            if let Some(shared) = weak.upgrade() {
                shared.handle(Event::Navigation(signal.clone()));
            }
        });
        shared.tasks.lock().navigation_sub = Some(navigation_sub);

        debug!(
            path = %shared.scheduler.lock().path(),
            deployment = %host.config.deployment,
            "page mounted"
        );
        shared.handle(Event::Mounted);

        PageInstance { shared }
    }

    /// Request a refresh through the shared entry point
    pub fn refresh(&self, request: RefreshRequest) -> RefreshDecision {
        self.shared.refresh(request)
    }

    /// Deliver reloaded props.
    ///
    /// On the same path, props older than the held version are dropped along
    /// with their config; returns whether the load was applied.
    pub fn load(&self, load: PageLoad) -> bool {
        let PageLoad {
            path,
            config,
            props,
            generated_at,
        } = load;

        // Path check, props swap and transition happen under one scheduler lock
        let mut scheduler = self.shared.scheduler.lock();
        if scheduler.path() == path {
            if !self.shared.props.lock().offer(props, generated_at) {
                debug!(%path, version = %generated_at, "ignoring props older than the rendered ones");
                return false;
            }
        } else {
            *self.shared.props.lock() = VersionedProps::new(props, generated_at);
        }

        self.shared.dispatch(&mut scheduler, Event::PageLoaded { path, config });
        true
    }

    /// Apply a local edit to the props, versioned at the current server time
    pub fn set_props(&self, value: PageProps) {
        let server_now = self.shared.scheduler.lock().clock().server_time(self.shared.clock.now());
        self.shared.props.lock().set(value, server_now);
    }

    pub fn props(&self) -> PageProps {
        self.shared.props.lock().get().clone()
    }

    pub fn props_version(&self) -> Timestamp {
        self.shared.props.lock().version()
    }

    /// Stop every timer, task and listener. Safe to call more than once.
    pub fn unmount(&self) {
        self.shared.handle(Event::Unmounted);
    }

    pub fn is_unmounted(&self) -> bool {
        self.shared.scheduler.lock().is_unmounted()
    }

    pub fn path(&self) -> String {
        self.shared.scheduler.lock().path().to_string()
    }

    pub fn config(&self) -> FreshnessConfig {
        self.shared.scheduler.lock().config().clone()
    }

    pub fn state(&self) -> SchedulerState {
        self.shared.scheduler.lock().state().clone()
    }

    pub fn clock(&self) -> ClockEstimate {
        self.shared.scheduler.lock().clock()
    }

    pub fn navigation(&self) -> NavigationState {
        self.shared.scheduler.lock().navigation()
    }

    /// Current on-mount CDN propagation allowance
    pub fn cdn_backoff(&self) -> Duration {
        self.shared.scheduler.lock().cdn_backoff().current()
    }

    pub fn stats(&self) -> RuntimeStats {
        let scheduler = self.shared.scheduler.lock().stats().clone();
        self.shared.counters.snapshot(scheduler)
    }
}

impl<N: Navigator, P: FreshnessProbe> Drop for PageInstance<N, P> {
    fn drop(&mut self) {
        self.unmount();
    }
}
