use crate::engine::snapshot::{StatSnapshot, SnapshotWindow, throughput};
use crate::types::{RequestOutcome, StatsReport};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::time::Instant;

const STATUS_SLOTS: usize = 1000;
const MIN_STATUS: u16 = 100;

/// Run-wide outcome counters shared by every worker.
///
/// Each counter is independently atomic. Recording an outcome never takes a lock;
/// the only mutex guards the snapshot window, which the reporter alone touches.
pub struct StatsAggregator {
    completed: AtomicU64,
    failed: AtomicU64,
    total: AtomicU64,
    status_codes: Box<[AtomicU64]>,
    window: Mutex<SnapshotWindow>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(start: Instant) -> Self {
        Self {
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            total: AtomicU64::new(0),
            status_codes: (0..STATUS_SLOTS).map(|_| AtomicU64::new(0)).collect(),
            window: Mutex::new(SnapshotWindow::new(StatSnapshot { time: start, total: 0 })),
        }
    }

    pub fn record(&self, outcome: &RequestOutcome) {
        match outcome {
            RequestOutcome::Success(status) => {
                self.completed.fetch_add(1, Ordering::Relaxed);
                match status_slot(*status) {
                    Some(slot) => {
                        self.status_codes[slot].fetch_add(1, Ordering::Relaxed);
                    }
                    None => tracing::debug!(status, "status code outside 100-999, not histogrammed"),
                }
            }
            RequestOutcome::Failure { .. } => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
        // Total last, so a reader seeing it also sees the outcome counter.
        self.total.fetch_add(1, Ordering::Release);
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Acquire)
    }

    /// Capture `(now, total)` and make it the latest snapshot.
    ///
    /// Totals returned by successive calls never decrease.
    pub fn snapshot(&self) -> StatSnapshot {
        self.snapshot_at(Instant::now())
    }

    pub fn snapshot_at(&self, now: Instant) -> StatSnapshot {
        let mut window = self.lock_window();
        let total = self.total().max(window.latest.total);
        let time = now.max(window.latest.time);
        let next = StatSnapshot { time, total };
        window.advance(next);
        next
    }

    #[cfg(test)]
    pub fn last_snapshot(&self) -> StatSnapshot {
        self.lock_window().latest
    }

    /// Counters, throughput between the last two snapshots, and the seen status codes.
    pub fn render(&self) -> StatsReport {
        let (previous, latest) = {
            let window = self.lock_window();
            (window.previous, window.latest)
        };

        StatsReport {
            completed: self.completed(),
            failed: self.failed(),
            total: self.total(),
            responses_per_second: throughput(&previous, &latest),
            status_codes: self.status_histogram(),
        }
    }

    pub fn status_histogram(&self) -> BTreeMap<u16, u64> {
        self.status_codes
            .iter()
            .enumerate()
            .skip(MIN_STATUS as usize)
            .filter_map(|(code, count)| {
                let count = count.load(Ordering::Relaxed);
                (count > 0).then_some((code as u16, count))
            })
            .collect()
    }

    fn lock_window(&self) -> std::sync::MutexGuard<'_, SnapshotWindow> {
        // A poisoned window still holds two valid snapshots.
        self.window.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

fn status_slot(status: u16) -> Option<usize> {
    let slot = status as usize;
    (status >= MIN_STATUS && slot < STATUS_SLOTS).then_some(slot)
}
