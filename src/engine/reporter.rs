use crate::engine::StatsAggregator;
use crate::types::StatsReport;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Periodically snapshots the aggregator and emits a `StatsReport`.
///
/// Emits once immediately, then every `interval`, then one final time when the
/// stop token fires. Never touches the dispatch path.
pub struct StatsReporter {
    stats: Arc<StatsAggregator>,
    report_tx: watch::Sender<StatsReport>,
    interval: Duration,
    stop_token: CancellationToken,
}

impl StatsReporter {
    pub fn new(
        stats: Arc<StatsAggregator>,
        report_tx: watch::Sender<StatsReport>,
        interval: Duration,
        stop_token: CancellationToken,
    ) -> Self {
        Self {
            stats,
            report_tx,
            interval,
            stop_token,
        }
    }

    /// Runs until stopped and returns the final report.
    pub async fn run(self) -> StatsReport {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = self.stop_token.cancelled() => break,

                _ = ticker.tick() => {
                    self.emit();
                }
            }
        }

        self.emit()
    }

    fn emit(&self) -> StatsReport {
        self.stats.snapshot();
        let report = self.stats.render();
        log_report(&report);
        self.report_tx.send_replace(report.clone());
        report
    }
}

/// One `stats` event with the counters, then one `status code` event per
/// observed code so the histogram stays numeric in JSON logs.
fn log_report(report: &StatsReport) {
    tracing::info!(
        completed = report.completed,
        failed = report.failed,
        total = report.total,
        responses_per_second = report.responses_per_second,
        status_codes = report.status_codes.len(),
        "stats"
    );
    for (&status_code, &count) in &report.status_codes {
        tracing::info!(status_code, count, "status code");
    }
}
