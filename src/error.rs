use std::path::PathBuf;
use thiserror::Error;

/// Problems detected before the run starts. None of these ever reach the network.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("URL is required. Provide via argument or config file.")]
    MissingUrl,
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),
    #[error("Invalid header '{header}': {reason}")]
    InvalidHeader { header: String, reason: String },
    #[error("Invalid dispatch mode '{0}'. Expected 'max-in-flight' or 'as-rps'.")]
    InvalidMode(String),
    #[error("Concurrency must be >= 1")]
    ZeroConcurrency,
    #[error("Failed to read config '{path}': {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML config '{path}': {source}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Environment variable '{0}' not set")]
    MissingEnvVar(String),
    #[error("Failed to read body file '{path}': {source}")]
    ReadBody {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("{name} task failed: {source}")]
    Task {
        name: &'static str,
        #[source]
        source: tokio::task::JoinError,
    },
    #[error("File '{0}' already exists. Use --force to overwrite.")]
    Exists(PathBuf),
    #[error("Failed to write '{path}': {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
