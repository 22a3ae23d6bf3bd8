mod client;
mod request;

pub use client::create_client;
pub use request::{RequestTemplate, execute_request, parse_header};

use crate::types::RequestOutcome;
use reqwest::Client;
use std::future::Future;

/// Performs one request and classifies what came back.
pub trait Transport: Send + Sync + 'static {
    fn execute(&self, request: &RequestTemplate) -> impl Future<Output = RequestOutcome> + Send;
}

/// `Transport` backed by a shared reqwest connection pool.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    fn execute(&self, request: &RequestTemplate) -> impl Future<Output = RequestOutcome> + Send {
        execute_request(&self.client, request)
    }
}
