use crate::cli::{DEFAULT_CONCURRENCY, DEFAULT_METHOD, DEFAULT_NUM_REQUESTS, DEFAULT_TIMEOUT, RunArgs};
use crate::error::ConfigError;
use crate::http::parse_header;
use crate::types::{DispatchMode, LoadConfig};
use clap::ValueEnum;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use regex_lite::Regex;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub load: LoadSettings,
}

#[derive(Debug, Deserialize, Default)]
pub struct TargetConfig {
    pub url: Option<String>,
    pub method: Option<String>,
    #[serde(default, with = "humantime_serde::option")]
    pub timeout: Option<Duration>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
    #[serde(default)]
    pub disable_keepalive: bool,
}

#[derive(Debug, Deserialize, Default)]
pub struct LoadSettings {
    pub concurrency: Option<u32>,
    pub num_requests: Option<u64>,
    pub mode: Option<String>,
}

pub fn load_config(path: &Path) -> Result<TomlConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadConfig {
        path: path.to_path_buf(),
        source,
    })?;

    let content = interpolate_env_vars(&content)?;

    toml::from_str(&content).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })
}

static ENV_VAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid interpolation pattern"));

/// Expand `${VAR}` and `${VAR:-default}`.
fn interpolate_env_vars(content: &str) -> Result<String, ConfigError> {
    let mut result = String::with_capacity(content.len());
    let mut last = 0;

    for cap in ENV_VAR_PATTERN.captures_iter(content) {
        let (Some(full), Some(expr)) = (cap.get(0), cap.get(1)) else {
            continue;
        };

        let (var_name, default) = match expr.as_str().split_once(":-") {
            Some((name, default)) => (name, Some(default)),
            None => (expr.as_str(), None),
        };

        let value = match std::env::var(var_name) {
            Ok(v) => v,
            Err(_) => match default {
                Some(d) => d.to_string(),
                None => return Err(ConfigError::MissingEnvVar(var_name.to_string())),
            },
        };

        result.push_str(&content[last..full.start()]);
        result.push_str(&value);
        last = full.end();
    }
    result.push_str(&content[last..]);

    Ok(result)
}

pub fn parse_mode(raw: &str) -> Result<DispatchMode, ConfigError> {
    DispatchMode::from_str(raw.trim(), true).map_err(|_| ConfigError::InvalidMode(raw.to_string()))
}

/// CLI values win over the file; the file wins over built-in defaults.
pub fn merge_config(cli: &RunArgs, toml: Option<TomlConfig>) -> Result<LoadConfig, ConfigError> {
    let toml = toml.unwrap_or_default();

    let url = cli
        .url
        .clone()
        .or(toml.target.url)
        .filter(|u| !u.trim().is_empty())
        .ok_or(ConfigError::MissingUrl)?;

    let method_str = cli
        .method
        .clone()
        .or(toml.target.method)
        .unwrap_or_else(|| DEFAULT_METHOD.to_string());

    let method: reqwest::Method = method_str
        .to_uppercase()
        .parse()
        .map_err(|_| ConfigError::InvalidMethod(method_str.clone()))?;

    let mut headers = cli
        .headers
        .iter()
        .map(|h| parse_header(h))
        .collect::<Result<Vec<_>, _>>()?;
    let mut file_headers: Vec<_> = toml.target.headers.into_iter().collect();
    file_headers.sort();
    for (k, v) in file_headers {
        if !headers.iter().any(|(hk, _)| hk.eq_ignore_ascii_case(&k)) {
            headers.push((k, v));
        }
    }

    let body = if let Some(path) = &cli.body_file {
        fs::read(path).map_err(|source| ConfigError::ReadBody {
            path: path.clone(),
            source,
        })?
    } else {
        cli.body
            .clone()
            .or(toml.target.body)
            .map(String::into_bytes)
            .unwrap_or_default()
    };

    let concurrency = cli
        .concurrency
        .or(toml.load.concurrency)
        .unwrap_or(DEFAULT_CONCURRENCY);
    if concurrency == 0 {
        return Err(ConfigError::ZeroConcurrency);
    }

    let total_requests = cli
        .num_requests
        .or(toml.load.num_requests)
        .unwrap_or(DEFAULT_NUM_REQUESTS);

    let mode = match (cli.mode, toml.load.mode.as_deref()) {
        (Some(mode), _) => mode,
        (None, Some(raw)) => parse_mode(raw)?,
        (None, None) => DispatchMode::default(),
    };

    let timeout = cli
        .timeout
        .or(toml.target.timeout)
        .unwrap_or(DEFAULT_TIMEOUT);

    let disable_keepalive = cli.disable_keepalive || toml.target.disable_keepalive;

    Ok(LoadConfig {
        url,
        method,
        headers,
        body,
        concurrency,
        total_requests,
        mode,
        timeout,
        disable_keepalive,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["run"];
        argv.extend_from_slice(extra);
        RunArgs::try_parse_from(argv).unwrap()
    }

    fn toml(content: &str) -> TomlConfig {
        toml::from_str(content).unwrap()
    }

    #[test]
    fn cli_only() {
        let config = merge_config(
            &args(&["http://localhost/api", "-c", "5", "-n", "50", "-m", "post", "-b", "hi"]),
            None,
        )
        .unwrap();

        assert_eq!(config.url, "http://localhost/api");
        assert_eq!(config.concurrency, 5);
        assert_eq!(config.total_requests, 50);
        assert_eq!(config.method, reqwest::Method::POST);
        assert_eq!(config.body, b"hi");
        assert_eq!(config.mode, DispatchMode::MaxInFlight);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn file_fills_in_defaults() {
        let file = toml(
            r#"
[target]
url = "https://example.com/health"
method = "PUT"
timeout = "3s"
body = "payload"

[target.headers]
X-Token = "abc"

[load]
concurrency = 12
num_requests = 0
mode = "as-rps"
"#,
        );
        let config = merge_config(&args(&["-f", "x.toml"]), Some(file)).unwrap();

        assert_eq!(config.url, "https://example.com/health");
        assert_eq!(config.method, reqwest::Method::PUT);
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.concurrency, 12);
        assert!(config.is_unbounded());
        assert_eq!(config.mode, DispatchMode::RateStrict);
        assert_eq!(config.body, b"payload");
        assert_eq!(config.headers, vec![("X-Token".to_string(), "abc".to_string())]);
    }

    #[test]
    fn cli_overrides_file() {
        let file = toml(
            r#"
[target]
url = "https://example.com/a"

[target.headers]
x-token = "from-file"

[load]
concurrency = 12
mode = "max-in-flight"
"#,
        );
        let config = merge_config(
            &args(&[
                "https://example.com/b",
                "-c",
                "3",
                "--mode",
                "as-rps",
                "-H",
                "X-Token: from-cli",
            ]),
            Some(file),
        )
        .unwrap();

        assert_eq!(config.url, "https://example.com/b");
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.mode, DispatchMode::RateStrict);
        assert_eq!(config.headers, vec![("X-Token".to_string(), "from-cli".to_string())]);
    }

    #[test]
    fn explicit_cli_defaults_still_override_file() {
        let file = toml(
            r#"
[target]
url = "https://example.com/a"
method = "POST"
timeout = "3s"

[load]
concurrency = 12
num_requests = 50
mode = "as-rps"
"#,
        );
        let config = merge_config(
            &args(&[
                "-f",
                "x.toml",
                "--mode",
                "max-in-flight",
                "-c",
                "100",
                "-n",
                "1000",
                "-m",
                "GET",
                "--timeout",
                "20s",
            ]),
            Some(file),
        )
        .unwrap();

        assert_eq!(config.mode, DispatchMode::MaxInFlight);
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(config.total_requests, DEFAULT_NUM_REQUESTS);
        assert_eq!(config.method, reqwest::Method::GET);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn built_in_defaults_without_file() {
        let config = merge_config(&args(&["http://localhost"]), None).unwrap();

        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(config.total_requests, DEFAULT_NUM_REQUESTS);
        assert_eq!(config.mode, DispatchMode::MaxInFlight);
        assert_eq!(config.method, reqwest::Method::GET);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn malformed_header_is_a_config_error() {
        let err = merge_config(&args(&["http://localhost", "-H", "X-Broken"]), None).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidHeader { .. }));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let err = merge_config(&args(&["http://localhost", "-c", "0"]), None).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroConcurrency));
    }

    #[test]
    fn missing_url_is_rejected() {
        let err = merge_config(&args(&["-f", "x.toml"]), Some(TomlConfig::default())).unwrap_err();
        assert!(matches!(err, ConfigError::MissingUrl));
    }

    #[test]
    fn invalid_method_is_rejected() {
        let err = merge_config(&args(&["http://localhost", "-m", "GE T"]), None).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMethod(_)));
    }

    #[test]
    fn invalid_mode_in_file_is_rejected() {
        let file = toml("[load]\nmode = \"sometimes\"\n");
        let err = merge_config(&args(&["http://localhost"]), Some(file)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMode(_)));
    }

    #[test]
    fn mode_names() {
        assert_eq!(parse_mode("max-in-flight").unwrap(), DispatchMode::MaxInFlight);
        assert_eq!(parse_mode("as-rps").unwrap(), DispatchMode::RateStrict);
        assert_eq!(parse_mode("rate-strict").unwrap(), DispatchMode::RateStrict);
        assert!(parse_mode("fast").is_err());
    }

    #[test]
    fn interpolation_uses_default_when_unset() {
        let out = interpolate_env_vars("url = \"${RAVAGER_SURELY_UNSET_VAR:-http://fallback}\"")
            .unwrap();
        assert_eq!(out, "url = \"http://fallback\"");
    }

    #[test]
    fn interpolation_fails_on_unset_without_default() {
        let err = interpolate_env_vars("token = \"${RAVAGER_SURELY_UNSET_VAR}\"").unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(name) if name == "RAVAGER_SURELY_UNSET_VAR"));
    }

    #[test]
    fn interpolation_leaves_plain_text_alone() {
        let text = "[target]\nurl = \"http://localhost\"\n";
        assert_eq!(interpolate_env_vars(text).unwrap(), text);
    }
}
