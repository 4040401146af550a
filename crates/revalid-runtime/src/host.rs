//! Host environment of page instances
//!
//! A `Host` owns the navigator, the freshness probe and the signal hubs that
//! every page instance it mounts shares.

use std::future::Future;
use std::sync::Arc;

use tokio::runtime::Handle;

use revalid_clock::FreshnessProbe;
use revalid_core::{FreshnessConfig, PageProps, RevalidError, RevalidResult, SignalHub, Timestamp};
use revalid_scheduler::{NavigationSignal, PrefetchOptions, ReplaceOptions};

use crate::{EpochClock, PageInstance, RuntimeConfig};

/// Client-side router the page refreshes through
pub trait Navigator: Send + Sync + 'static {
    /// Re-fetch page data and swap the rendered content in place
    fn replace(&self, path: &str, options: ReplaceOptions) -> impl Future<Output = RevalidResult<()>> + Send;

    /// Fetch page data in the background without rendering it
    fn prefetch(&self, path: &str, options: PrefetchOptions) -> impl Future<Output = RevalidResult<()>> + Send;
}

/// Window regained focus
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FocusSignal;

/// Page props delivered by a (re)load
#[derive(Clone, Debug, PartialEq)]
pub struct PageLoad {
    pub path: String,
    pub config: FreshnessConfig,
    pub props: PageProps,
    /// Server time the props were generated at; zero if unversioned
    pub generated_at: Timestamp,
}

impl PageLoad {
    pub fn new(path: impl Into<String>, config: FreshnessConfig) -> Self {
        PageLoad {
            path: path.into(),
            config,
            props: PageProps::Null,
            generated_at: Timestamp::ZERO,
        }
    }

    pub fn with_props(mut self, props: PageProps, generated_at: Timestamp) -> Self {
        self.props = props;
        self.generated_at = generated_at;
        self
    }
}

pub struct Host<N, P> {
    pub(crate) navigator: Arc<N>,
    pub(crate) probe: Arc<P>,
    pub(crate) navigation: SignalHub<NavigationSignal>,
    pub(crate) focus: SignalHub<FocusSignal>,
    pub(crate) config: RuntimeConfig,
    pub(crate) clock: EpochClock,
}

impl<N: Navigator, P: FreshnessProbe> Host<N, P> {
    pub fn new(navigator: N, probe: P, config: RuntimeConfig) -> Self {
        Host {
            navigator: Arc::new(navigator),
            probe: Arc::new(probe),
            navigation: SignalHub::new(),
            focus: SignalHub::new(),
            config,
            clock: EpochClock::new(),
        }
    }

    pub fn with_clock(mut self, clock: EpochClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn navigator(&self) -> &Arc<N> {
        &self.navigator
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn clock(&self) -> EpochClock {
        self.clock
    }

    pub fn navigation(&self) -> &SignalHub<NavigationSignal> {
        &self.navigation
    }

    pub fn focus(&self) -> &SignalHub<FocusSignal> {
        &self.focus
    }

    /// Publish a router transition to every mounted instance
    pub fn navigate(&self, signal: NavigationSignal) -> usize {
        self.navigation.emit(&signal)
    }

    /// Publish a focus regain to every mounted instance
    pub fn focus_gained(&self) -> usize {
        self.focus.emit(&FocusSignal)
    }

    /// Attach a page instance. Must be called from within a tokio runtime.
    pub fn mount(&self, load: PageLoad) -> RevalidResult<PageInstance<N, P>> {
        let runtime = Handle::try_current().map_err(|e| RevalidError::Runtime(e.to_string()))?;
        Ok(PageInstance::mount(self, load, runtime))
    }
}
