use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tracing::warn;

use crate::sim::TickReport;

static METRICS_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_metrics_lock_poison_once(operation: &'static str) {
    if METRICS_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "metrics lock poisoned; recovered inner value");
    }
}

/// Chain activity over the most recent metrics interval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChainMetricsSnapshot {
    pub ticks: u64,
    pub chains_built: u64,
    pub members_moved: u64,
    pub obstructed: u64,
    pub crushed: u64,
    pub failures: u64,
    pub max_chain_len: usize,
}

#[derive(Clone, Debug)]
pub struct MetricsHandle {
    snapshot: Arc<RwLock<ChainMetricsSnapshot>>,
}

impl Default for MetricsHandle {
    fn default() -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(ChainMetricsSnapshot::default())),
        }
    }
}

impl MetricsHandle {
    pub fn snapshot(&self) -> ChainMetricsSnapshot {
        match self.snapshot.read() {
            Ok(guard) => *guard,
            Err(poisoned) => {
                warn_metrics_lock_poison_once("read");
                *poisoned.into_inner()
            }
        }
    }

    pub(crate) fn publish(&self, snapshot: ChainMetricsSnapshot) {
        match self.snapshot.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => {
                warn_metrics_lock_poison_once("write");
                let mut guard = poisoned.into_inner();
                *guard = snapshot;
            }
        }
    }
}

#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    interval_ticks: u64,
    current: ChainMetricsSnapshot,
    totals: ChainMetricsSnapshot,
}

impl MetricsAccumulator {
    pub(crate) fn new(interval_ticks: u64) -> Self {
        Self {
            interval_ticks: interval_ticks.max(1),
            current: ChainMetricsSnapshot::default(),
            totals: ChainMetricsSnapshot::default(),
        }
    }

    pub(crate) fn record_tick(&mut self, report: &TickReport) {
        for metrics in [&mut self.current, &mut self.totals] {
            metrics.ticks = metrics.ticks.saturating_add(1);
            for outcome in &report.outcomes {
                let Ok(step) = &outcome.result else {
                    metrics.failures = metrics.failures.saturating_add(1);
                    continue;
                };
                if step.chain_len > 0 {
                    metrics.chains_built = metrics.chains_built.saturating_add(1);
                }
                metrics.members_moved = metrics.members_moved.saturating_add(step.moved as u64);
                metrics.crushed = metrics.crushed.saturating_add(step.crushed.len() as u64);
                if step.is_obstructed() {
                    metrics.obstructed = metrics.obstructed.saturating_add(1);
                }
                metrics.max_chain_len = metrics.max_chain_len.max(step.chain_len);
            }
        }
    }

    /// Returns and resets the interval counters once enough ticks have passed.
    pub(crate) fn maybe_snapshot(&mut self) -> Option<ChainMetricsSnapshot> {
        if self.current.ticks < self.interval_ticks {
            return None;
        }
        Some(std::mem::take(&mut self.current))
    }

    pub(crate) fn totals(&self) -> ChainMetricsSnapshot {
        self.totals
    }
}
