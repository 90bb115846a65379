use anyhow::{Context, anyhow};
use async_trait::async_trait;
use reqwest::Url;
use std::time::Duration;
use tokio::net::lookup_host;

use crate::config::REACHABILITY_TIMEOUT;

/// Answers whether any network transport is usable before a fetch is attempted.
#[async_trait]
pub trait Reachability: Send + Sync {
    async fn is_network_available(&self) -> bool;
}

/// Considers the network available when the API host resolves in time.
#[derive(Debug, Clone)]
pub struct DnsReachability {
    host: String,
    port: u16,
    timeout: Duration,
}

impl DnsReachability {
    pub fn for_url(url: &str) -> anyhow::Result<Self> {
        let parsed = Url::parse(url).with_context(|| format!("Invalid URL: {url}"))?;
        let host = parsed.host_str().ok_or_else(|| anyhow!("URL has no host: {url}"))?;
        let port = parsed.port_or_known_default().unwrap_or(443);

        Ok(Self { host: host.to_string(), port, timeout: REACHABILITY_TIMEOUT })
    }
}

#[async_trait]
impl Reachability for DnsReachability {
    async fn is_network_available(&self) -> bool {
        let target = (self.host.as_str(), self.port);
        match tokio::time::timeout(self.timeout, lookup_host(target)).await {
            Ok(Ok(mut addrs)) => addrs.next().is_some(),
            Ok(Err(err)) => {
                tracing::debug!(host = %self.host, error = %err, "host lookup failed");
                false
            }
            Err(_) => {
                tracing::debug!(host = %self.host, "host lookup timed out");
                false
            }
        }
    }
}
