use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

// ============================================================================
// Dispatch
// ============================================================================

/// Policy governing when the next request is launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum DispatchMode {
    /// Keep at most `concurrency` requests outstanding; refill a slot as soon as one frees.
    #[default]
    #[serde(rename = "max-in-flight")]
    #[value(name = "max-in-flight")]
    MaxInFlight,
    /// Launch `concurrency` requests every second, regardless of outstanding ones.
    #[serde(rename = "as-rps", alias = "rate-strict")]
    #[value(name = "as-rps", alias = "rate-strict")]
    RateStrict,
}

impl DispatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchMode::MaxInFlight => "max-in-flight",
            DispatchMode::RateStrict => "as-rps",
        }
    }
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Run configuration
// ============================================================================

#[derive(Debug, Clone)]
pub struct LoadConfig {
    pub url: String,
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub concurrency: u32,
    /// Zero means unbounded.
    pub total_requests: u64,
    pub mode: DispatchMode,
    pub timeout: Duration,
    pub disable_keepalive: bool,
}

impl LoadConfig {
    pub fn is_unbounded(&self) -> bool {
        self.total_requests == 0
    }
}

// ============================================================================
// Request outcomes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Timeout,
    Connect,
    Request,
    Body,
    Other,
}

impl ErrorKind {
    pub fn from_reqwest_error(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            ErrorKind::Timeout
        } else if err.is_connect() {
            ErrorKind::Connect
        } else if err.is_request() {
            ErrorKind::Request
        } else if err.is_body() || err.is_decode() {
            ErrorKind::Body
        } else {
            ErrorKind::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::Connect => "connect",
            ErrorKind::Request => "request",
            ErrorKind::Body => "body",
            ErrorKind::Other => "other",
        }
    }
}

/// Classified result of one request attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    Success(u16),
    Failure { kind: ErrorKind, detail: String },
}

impl RequestOutcome {
    pub fn failure(kind: ErrorKind, detail: impl Into<String>) -> Self {
        RequestOutcome::Failure {
            kind,
            detail: detail.into(),
        }
    }
}

// ============================================================================
// Run lifecycle
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Draining,
    Terminal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every request was launched and finished.
    Completed,
    /// An operator signal stopped the run; outstanding requests were abandoned.
    Interrupted,
}

// ============================================================================
// Reports
// ============================================================================

/// Display-ready view of the aggregator at one reporting tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsReport {
    pub completed: u64,
    pub failed: u64,
    pub total: u64,
    pub responses_per_second: f64,
    /// Only codes that were seen at least once.
    pub status_codes: BTreeMap<u16, u64>,
}
