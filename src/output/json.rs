use crate::engine::RunSummary;
use crate::types::{LoadConfig, RunOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

#[derive(Serialize, Deserialize)]
pub struct JsonOutput {
    pub metadata: Metadata,
    pub summary: Summary,
    pub status_codes: BTreeMap<String, u64>,
}

#[derive(Serialize, Deserialize)]
pub struct Metadata {
    pub tool: String,
    pub version: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub outcome: RunOutcome,
    pub target: Target,
    pub load: Load,
    pub env: Environment,
}

#[derive(Serialize, Deserialize)]
pub struct Target {
    pub url: String,
    pub method: String,
    pub headers: Vec<String>,
}

#[derive(Serialize, Deserialize)]
pub struct Load {
    pub mode: String,
    pub concurrency: u32,
    pub num_requests: u64,
    pub timeout_ms: u64,
}

#[derive(Serialize, Deserialize)]
pub struct Environment {
    pub hostname: String,
    pub os: String,
    pub cpus: usize,
}

#[derive(Serialize, Deserialize)]
pub struct Summary {
    pub launched: u64,
    pub total_requests: u64,
    pub completed: u64,
    pub failed: u64,
    pub error_rate: f64,
    pub requests_per_sec: f64,
}

fn redact_header(name: &str, value: &str) -> String {
    let lower = name.to_lowercase();
    if lower == "authorization"
        || lower == "cookie"
        || lower == "x-api-key"
        || lower.contains("token")
        || lower.contains("secret")
        || lower.contains("password")
    {
        format!("{}: <redacted>", name)
    } else {
        format!("{}: {}", name, value)
    }
}

pub fn create_output(summary: &RunSummary, config: &LoadConfig) -> JsonOutput {
    let report = &summary.report;

    JsonOutput {
        metadata: Metadata {
            tool: "ravager".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: summary.started_at,
            ended_at: summary.ended_at,
            duration_secs: summary.elapsed.as_secs_f64(),
            outcome: summary.outcome,
            target: Target {
                url: config.url.clone(),
                method: config.method.to_string(),
                headers: config
                    .headers
                    .iter()
                    .map(|(k, v)| redact_header(k, v))
                    .collect(),
            },
            load: Load {
                mode: config.mode.to_string(),
                concurrency: config.concurrency,
                num_requests: config.total_requests,
                timeout_ms: config.timeout.as_millis() as u64,
            },
            env: Environment {
                hostname: hostname::get()
                    .map(|h| h.to_string_lossy().to_string())
                    .unwrap_or_else(|_| "unknown".to_string()),
                os: std::env::consts::OS.to_string(),
                cpus: num_cpus(),
            },
        },
        summary: Summary {
            launched: summary.launched,
            total_requests: report.total,
            completed: report.completed,
            failed: report.failed,
            error_rate: summary.error_rate(),
            requests_per_sec: summary.average_rps(),
        },
        status_codes: report
            .status_codes
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect(),
    }
}

pub fn write_json(summary: &RunSummary, config: &LoadConfig, path: &Path) -> io::Result<()> {
    let output = create_output(summary, config);
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &output)?;
    writer.write_all(b"\n")?;
    writer.flush()
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1)
}
