use crate::types::DispatchMode;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CONCURRENCY: u32 = 100;
pub const DEFAULT_NUM_REQUESTS: u64 = 1000;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_METHOD: &str = "GET";

fn parse_duration(s: &str) -> Result<Duration, humantime::DurationError> {
    humantime::parse_duration(s)
}

fn parse_number_with_suffix(s: &str) -> Result<u64, String> {
    let s = s.trim().to_lowercase();

    if s.is_empty() {
        return Err("empty value".to_string());
    }

    let (num_str, multiplier) = if let Some(prefix) = s.strip_suffix('k') {
        (prefix, 1_000u64)
    } else if let Some(prefix) = s.strip_suffix('m') {
        (prefix, 1_000_000u64)
    } else {
        (s.as_str(), 1u64)
    };

    let num: u64 = num_str
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    num.checked_mul(multiplier)
        .ok_or_else(|| format!("'{}' overflows u64", s))
}

#[derive(Parser, Debug)]
#[command(
    name = "ravager",
    author,
    version,
    about = "An HTTP load generator with bounded-concurrency and fixed-rate dispatch",
    long_about = "ravager fires a fixed number (or an endless stream) of HTTP requests at one \
                  endpoint and reports throughput and status codes every second."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a load test against a target URL
    #[command(name = "run")]
    Run(Box<RunArgs>),

    /// Generate a starter config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),

    /// Generate man page
    Man,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Target URL
    #[arg(required_unless_present = "config")]
    pub url: Option<String>,

    /// Concurrency limit (max-in-flight) or batch size per second (as-rps) [default: 100]
    #[arg(short = 'c', long, visible_alias = "parallelism", short_alias = 'p')]
    pub concurrency: Option<u32>,

    /// Requests to send (0 = unbounded). Supports k/m suffixes (e.g., 10k, 1m) [default: 1000]
    #[arg(
        short = 'n',
        long,
        visible_alias = "numrequests",
        value_parser = parse_number_with_suffix
    )]
    pub num_requests: Option<u64>,

    /// Dispatch mode. `as-rps` launches a full batch every second and does not cap in-flight requests [default: max-in-flight]
    #[arg(long, value_enum, visible_alias = "parallelism-mode")]
    pub mode: Option<DispatchMode>,

    /// HTTP method [default: GET]
    #[arg(short = 'm', long)]
    pub method: Option<String>,

    /// HTTP headers as Name:Value (can be specified multiple times)
    #[arg(short = 'H', long = "header", value_name = "HEADER")]
    pub headers: Vec<String>,

    /// Request body
    #[arg(short = 'b', long)]
    pub body: Option<String>,

    /// Request body from file
    #[arg(long, value_name = "FILE", conflicts_with = "body")]
    pub body_file: Option<PathBuf>,

    /// Per-request timeout (e.g., 5s, 2m) [default: 20s]
    #[arg(long, value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Disable HTTP keepalive (new connection per request)
    #[arg(long)]
    pub disable_keepalive: bool,

    /// Config file path (TOML)
    #[arg(short = 'f', long = "config")]
    pub config: Option<PathBuf>,

    /// Write the final summary as JSON to this file
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Validate config and exit without running
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Output file path (default: ravager.toml)
    #[arg(short, long, default_value = "ravager.toml")]
    pub output: PathBuf,

    /// Target URL to include in config
    #[arg(short, long)]
    pub url: Option<String>,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl Cli {
    /// Log format to install before anything else runs.
    pub fn log_format(&self) -> LogFormat {
        match &self.command {
            Commands::Run(args) => args.log_format,
            _ => LogFormat::Text,
        }
    }
}

pub fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "ravager", &mut std::io::stdout());
}

pub fn generate_man_page() -> Result<(), std::io::Error> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    man.render(&mut std::io::stdout())
}
