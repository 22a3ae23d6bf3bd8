use crate::engine::StatsAggregator;
use crate::engine::dispatcher::Dispatcher;
use crate::engine::reporter::StatsReporter;
use crate::error::AppError;
use crate::http::{RequestTemplate, Transport};
use crate::types::{LoadConfig, RunOutcome, RunState, StatsReport};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

pub const REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Slack on top of the request timeout before a drain gives up.
const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// What a finished run looked like.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub launched: u64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub report: StatsReport,
}

impl RunSummary {
    pub fn average_rps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.report.total as f64 / secs
        } else {
            0.0
        }
    }

    pub fn error_rate(&self) -> f64 {
        if self.report.total > 0 {
            self.report.failed as f64 / self.report.total as f64
        } else {
            0.0
        }
    }
}

/// Owns one run: starts the dispatcher and reporter, then walks
/// `Running -> Draining -> Terminal`.
///
/// Natural completion drains every in-flight request before the final report.
/// Cancellation (operator signal) skips the drain and abandons what is in flight.
pub struct Engine<T> {
    config: LoadConfig,
    transport: Arc<T>,
    template: Arc<RequestTemplate>,
    stats: Arc<StatsAggregator>,
    cancel_token: CancellationToken,
    state_tx: watch::Sender<RunState>,
    report_tx: watch::Sender<StatsReport>,
    report_interval: Duration,
}

impl<T: Transport> Engine<T> {
    pub fn new(config: LoadConfig, transport: Arc<T>, template: RequestTemplate) -> Self {
        let (state_tx, _) = watch::channel(RunState::Running);
        let (report_tx, _) = watch::channel(StatsReport::default());

        Self {
            config,
            transport,
            template: Arc::new(template),
            stats: Arc::new(StatsAggregator::new()),
            cancel_token: CancellationToken::new(),
            state_tx,
            report_tx,
            report_interval: REPORT_INTERVAL,
        }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    #[cfg(test)]
    pub fn state_rx(&self) -> watch::Receiver<RunState> {
        self.state_tx.subscribe()
    }

    #[cfg(test)]
    pub fn report_rx(&self) -> watch::Receiver<StatsReport> {
        self.report_tx.subscribe()
    }

    pub async fn run(self) -> Result<RunSummary, AppError> {
        let started_at = Utc::now();
        let start = Instant::now();
        let tracker = TaskTracker::new();

        let reporter_stop = CancellationToken::new();
        let reporter = StatsReporter::new(
            self.stats.clone(),
            self.report_tx.clone(),
            self.report_interval,
            reporter_stop.clone(),
        );
        let reporter_handle = tokio::spawn(reporter.run());

        let dispatcher = Dispatcher::new(
            &self.config,
            self.transport.clone(),
            self.template.clone(),
            self.stats.clone(),
            tracker.clone(),
            self.cancel_token.clone(),
        );
        let mut dispatcher_handle = tokio::spawn(dispatcher.run());
        self.set_state(RunState::Running);

        let finished = tokio::select! {
            biased;

            _ = self.cancel_token.cancelled() => None,

            joined = &mut dispatcher_handle => Some(
                joined.map_err(|source| AppError::Task { name: "Dispatcher", source })?
            ),
        };

        self.set_state(RunState::Draining);
        tracker.close();

        let outcome = match finished {
            Some(_) => self.drain(&tracker).await,
            None => {
                tracing::info!(
                    outstanding = tracker.len(),
                    "Interrupted, abandoning in-flight requests"
                );
                RunOutcome::Interrupted
            }
        };

        // On interrupt the dispatcher stops on the same token, so this returns promptly.
        let launched = match finished {
            Some(launched) => launched,
            None => dispatcher_handle
                .await
                .map_err(|source| AppError::Task { name: "Dispatcher", source })?,
        };

        reporter_stop.cancel();
        let report = reporter_handle
            .await
            .map_err(|source| AppError::Task { name: "Reporter", source })?;

        self.set_state(RunState::Terminal);
        if outcome == RunOutcome::Completed {
            tracing::info!("All done!");
        }

        Ok(RunSummary {
            outcome,
            launched,
            started_at,
            ended_at: Utc::now(),
            elapsed: start.elapsed(),
            report,
        })
    }

    async fn drain(&self, tracker: &TaskTracker) -> RunOutcome {
        let limit = self.config.timeout + DRAIN_GRACE;

        tokio::select! {
            biased;

            _ = self.cancel_token.cancelled() => {
                tracing::info!(
                    outstanding = tracker.len(),
                    "Interrupted while draining, abandoning in-flight requests"
                );
                RunOutcome::Interrupted
            }

            drained = tokio::time::timeout(limit, tracker.wait()) => {
                if drained.is_err() {
                    tracing::warn!(
                        outstanding = tracker.len(),
                        "Drain exceeded {:?}, not waiting any longer",
                        limit
                    );
                }
                RunOutcome::Completed
            }
        }
    }

    fn set_state(&self, state: RunState) {
        tracing::debug!(?state, "Run state changed");
        self.state_tx.send_replace(state);
    }
}
