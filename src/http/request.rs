use crate::error::ConfigError;
use crate::types::{ErrorKind, LoadConfig, RequestOutcome};
use bytes::Bytes;
use reqwest::header::{CONNECTION, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Url};

/// The request every worker sends. Built once, shared read-only.
#[derive(Debug, Clone)]
pub struct RequestTemplate {
    pub url: Url,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RequestTemplate {
    pub fn from_config(config: &LoadConfig) -> Result<Self, ConfigError> {
        let url = Url::parse(&config.url).map_err(|e| ConfigError::InvalidUrl {
            url: config.url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl {
                url: config.url.clone(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        let mut headers = HeaderMap::with_capacity(config.headers.len() + 1);
        for (name, value) in &config.headers {
            let raw = format!("{}:{}", name, value);
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                ConfigError::InvalidHeader {
                    header: raw.clone(),
                    reason: e.to_string(),
                }
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| ConfigError::InvalidHeader {
                header: raw.clone(),
                reason: e.to_string(),
            })?;
            headers.append(name, value);
        }

        if config.disable_keepalive {
            headers.insert(CONNECTION, HeaderValue::from_static("close"));
        }

        Ok(Self {
            url,
            method: config.method.clone(),
            headers,
            body: Bytes::from(config.body.clone()),
        })
    }
}

/// Split a `Name:Value` header string on its first colon.
pub fn parse_header(raw: &str) -> Result<(String, String), ConfigError> {
    let Some((name, value)) = raw.split_once(':') else {
        return Err(ConfigError::InvalidHeader {
            header: raw.to_string(),
            reason: "expected 'Name:Value'".to_string(),
        });
    };

    let name = name.trim();
    if name.is_empty() {
        return Err(ConfigError::InvalidHeader {
            header: raw.to_string(),
            reason: "header name is empty".to_string(),
        });
    }

    Ok((name.to_string(), value.trim().to_string()))
}

pub async fn execute_request(client: &Client, template: &RequestTemplate) -> RequestOutcome {
    let mut request = client
        .request(template.method.clone(), template.url.clone())
        .headers(template.headers.clone());

    if !template.body.is_empty() {
        request = request.body(template.body.clone());
    }

    match request.send().await {
        Ok(response) => {
            let status = response.status().as_u16();
            // Consume body to allow connection reuse
            match response.bytes().await {
                Ok(_) => RequestOutcome::Success(status),
                Err(err) => {
                    RequestOutcome::failure(ErrorKind::from_reqwest_error(&err), err.to_string())
                }
            }
        }
        Err(err) => RequestOutcome::failure(ErrorKind::from_reqwest_error(&err), err.to_string()),
    }
}
