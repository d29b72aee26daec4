// ─────────────────────────────────────────────────────────────────────
// Connectome Kernel — Progress Reporting
// ─────────────────────────────────────────────────────────────────────

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

const REPORT_INTERVAL: Duration = Duration::from_millis(500);

/// Shared completion counter for (definition × threshold) units.
///
/// Thread-safe: the count is atomic; the last report is guarded by a
/// `parking_lot::Mutex` that workers only `try_lock`, so reporting never
/// blocks the compute path.
pub struct Progress {
    done: AtomicUsize,
    total: usize,
    enabled: bool,
    last_report: Mutex<(Instant, usize)>,
}

impl Progress {
    pub fn new(total: usize, enabled: bool) -> Self {
        Self {
            done: AtomicUsize::new(0),
            total,
            enabled,
            last_report: Mutex::new((Instant::now(), 0)),
        }
    }

    /// Record one finished unit; returns the new count.
    pub fn tick(&self) -> usize {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        if self.enabled {
            self.maybe_report(done);
        }
        done
    }

    pub fn done(&self) -> usize {
        self.done.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    fn maybe_report(&self, done: usize) {
        let Some(mut last) = self.last_report.try_lock() else {
            return;
        };
        let finished = done >= self.total;
        if done <= last.1 || (!finished && last.0.elapsed() < REPORT_INTERVAL) {
            return;
        }
        *last = (Instant::now(), done);
        let pct = if self.total > 0 {
            100.0 * done as f64 / self.total as f64
        } else {
            100.0
        };
        log::info!("progress: {done}/{} networks ({pct:.1}%)", self.total);
    }
}
