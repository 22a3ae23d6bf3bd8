mod cli;
mod config;
mod engine;
mod error;
mod http;
mod output;
mod signals;
mod types;

use clap::Parser;
use cli::{Cli, Commands, LogFormat, RunArgs};
use config::{load_config, merge_config};
use engine::{Engine, RunSummary};
use error::AppError;
use http::{HttpTransport, RequestTemplate, create_client};
use output::write_json;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use types::{DispatchMode, LoadConfig, RunOutcome};

/// Exit status after an operator interrupt (128 + SIGINT).
const EXIT_INTERRUPTED: i32 = 130;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_format());

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };

    std::process::exit(exit_code);
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(cli: Cli) -> Result<i32, AppError> {
    match cli.command {
        Commands::Run(args) => run_load_test(&args).await,
        Commands::Init(args) => run_init(&args),
        Commands::Completions(args) => {
            cli::generate_completions(args.shell);
            Ok(0)
        }
        Commands::Man => {
            cli::generate_man_page().map_err(|source| AppError::Output {
                path: "<stdout>".into(),
                source,
            })?;
            Ok(0)
        }
    }
}

fn run_init(args: &cli::InitArgs) -> Result<i32, AppError> {
    if args.output.exists() && !args.force {
        return Err(AppError::Exists(args.output.clone()));
    }

    let url = args.url.as_deref().unwrap_or("http://localhost:8080/health");

    let config = format!(
        r#"# Ravager Load Configuration

[target]
url = "{url}"
method = "GET"
timeout = "20s"
# disable_keepalive = false

# Headers (uncomment and modify as needed)
# [target.headers]
# Authorization = "Bearer ${{API_TOKEN:-changeme}}"
# Content-Type = "application/json"

# Request body (for POST/PUT/PATCH)
# body = '{{"key": "value"}}'

[load]
concurrency = 100
num_requests = 1000     # 0 = unbounded, stop with Ctrl+C
mode = "max-in-flight"  # or "as-rps": launch `concurrency` requests every second, uncapped in flight
"#,
        url = url
    );

    std::fs::write(&args.output, config).map_err(|source| AppError::Output {
        path: args.output.clone(),
        source,
    })?;

    eprintln!("Created config file: {}", args.output.display());
    eprintln!("\nRun with: ravager run -f {}", args.output.display());

    Ok(0)
}

async fn run_load_test(args: &RunArgs) -> Result<i32, AppError> {
    let toml_config = args.config.as_deref().map(load_config).transpose()?;
    let config = merge_config(args, toml_config)?;

    // Surfaces header/URL problems before anything is sent.
    let template = RequestTemplate::from_config(&config)?;

    if args.dry_run {
        print_plan(&config);
        return Ok(0);
    }

    let client = create_client(&config).map_err(AppError::Client)?;
    let engine = Engine::new(
        config.clone(),
        Arc::new(HttpTransport::new(client)),
        template,
    );
    signals::cancel_on_shutdown_signal(engine.cancel_token());

    let summary = engine.run().await?;
    log_summary(&summary);

    if let Some(path) = &args.output {
        write_json(&summary, &config, path).map_err(|source| AppError::Output {
            path: path.clone(),
            source,
        })?;
        eprintln!("Results written to: {}", path.display());
    }

    Ok(exit_code(&summary))
}

fn exit_code(summary: &RunSummary) -> i32 {
    match summary.outcome {
        RunOutcome::Interrupted => EXIT_INTERRUPTED,
        RunOutcome::Completed if summary.error_rate() > 0.5 => 1,
        RunOutcome::Completed => 0,
    }
}

fn log_summary(summary: &RunSummary) {
    tracing::info!(
        outcome = ?summary.outcome,
        launched = summary.launched,
        total = summary.report.total,
        failed = summary.report.failed,
        elapsed = ?summary.elapsed,
        average_rps = summary.average_rps(),
        "Run finished"
    );
}

fn print_plan(config: &LoadConfig) {
    eprintln!("Configuration validated successfully!\n");
    eprintln!("Target:      {}", config.url);
    eprintln!("Method:      {}", config.method);
    eprintln!("Mode:        {}", config.mode);
    match config.mode {
        DispatchMode::MaxInFlight => {
            eprintln!("Concurrency: {} in flight", config.concurrency);
        }
        DispatchMode::RateStrict => {
            eprintln!(
                "Batch:       {} requests every second (in-flight requests are not capped)",
                config.concurrency
            );
        }
    }
    if config.is_unbounded() {
        eprintln!("Requests:    unbounded (stop with Ctrl+C)");
    } else {
        eprintln!("Requests:    {}", config.total_requests);
    }
    eprintln!("Timeout:     {:?}", config.timeout);
    if !config.headers.is_empty() {
        eprintln!("Headers:     {} custom", config.headers.len());
    }
    if !config.body.is_empty() {
        eprintln!("Body:        {} bytes", config.body.len());
    }
    if config.disable_keepalive {
        eprintln!("Keepalive:   disabled");
    }
}
