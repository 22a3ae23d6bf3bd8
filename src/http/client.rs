use crate::types::{DispatchMode, LoadConfig};
use reqwest::Client;
use std::time::Duration;

pub fn create_client(config: &LoadConfig) -> Result<Client, reqwest::Error> {
    let builder = Client::builder()
        .connect_timeout(config.timeout)
        .timeout(config.timeout)
        .tcp_nodelay(true)
        .user_agent(format!(
            "ravager/{} (load-generator)",
            env!("CARGO_PKG_VERSION")
        ));

    let builder = if config.disable_keepalive {
        builder
            .pool_max_idle_per_host(0)
            .pool_idle_timeout(Duration::ZERO)
    } else {
        // Rate-paced batches are not bounded by concurrency, so neither is the pool.
        let idle_per_host = match config.mode {
            DispatchMode::MaxInFlight => config.concurrency as usize,
            DispatchMode::RateStrict => usize::MAX,
        };
        builder
            .pool_max_idle_per_host(idle_per_host)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(60))
    };

    builder.build()
}
