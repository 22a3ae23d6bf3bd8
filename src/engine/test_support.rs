use crate::http::{RequestTemplate, Transport};
use crate::types::{DispatchMode, LoadConfig, RequestOutcome};
use reqwest::Method;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Transport that sleeps for a fixed delay and records when each request started.
pub(crate) struct MockTransport {
    delay: Duration,
    status: u16,
    pub(crate) in_flight: AtomicU64,
    pub(crate) peak: AtomicU64,
    started: Mutex<Vec<Instant>>,
}

impl MockTransport {
    pub(crate) fn new(delay: Duration) -> Arc<Self> {
        Self::with_status(delay, 200)
    }

    pub(crate) fn with_status(delay: Duration, status: u16) -> Arc<Self> {
        Arc::new(Self {
            delay,
            status,
            in_flight: AtomicU64::new(0),
            peak: AtomicU64::new(0),
            started: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn started(&self) -> Vec<Instant> {
        self.started.lock().unwrap().clone()
    }
}

impl Transport for MockTransport {
    fn execute(&self, _request: &RequestTemplate) -> impl Future<Output = RequestOutcome> + Send {
        async move {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.started.lock().unwrap().push(Instant::now());
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            RequestOutcome::Success(self.status)
        }
    }
}

pub(crate) fn load_config(mode: DispatchMode, concurrency: u32, total_requests: u64) -> LoadConfig {
    LoadConfig {
        url: "http://localhost/".to_string(),
        method: Method::GET,
        headers: Vec::new(),
        body: Vec::new(),
        concurrency,
        total_requests,
        mode,
        timeout: Duration::from_secs(5),
        disable_keepalive: false,
    }
}
