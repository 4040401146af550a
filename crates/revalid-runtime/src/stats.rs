//! Runtime statistics

use std::sync::atomic::{AtomicU64, Ordering};

use revalid_scheduler::SchedulerStats;

/// Snapshot of a page instance's counters
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    pub scheduler: SchedulerStats,
    pub probes_sent: u64,
    pub probe_failures: u64,
    pub prefetches: u64,
    pub replaces: u64,
    pub navigator_failures: u64,
    pub interval_ticks: u64,
    pub focus_events: u64,
}

#[derive(Debug, Default)]
pub(crate) struct RuntimeCounters {
    pub probes_sent: AtomicU64,
    pub probe_failures: AtomicU64,
    pub prefetches: AtomicU64,
    pub replaces: AtomicU64,
    pub navigator_failures: AtomicU64,
    pub interval_ticks: AtomicU64,
    pub focus_events: AtomicU64,
}

impl RuntimeCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, scheduler: SchedulerStats) -> RuntimeStats {
        let read = |c: &AtomicU64| c.load(Ordering::Relaxed);
        RuntimeStats {
            scheduler,
            probes_sent: read(&self.probes_sent),
            probe_failures: read(&self.probe_failures),
            prefetches: read(&self.prefetches),
            replaces: read(&self.replaces),
            navigator_failures: read(&self.navigator_failures),
            interval_ticks: read(&self.interval_ticks),
            focus_events: read(&self.focus_events),
        }
    }
}
