//! Identity probing through a candidate proxy.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ProbeError;
use crate::proxy::ProxyEndpoint;

/// Probes a proxy by requesting an identity endpoint through it.
#[async_trait]
pub trait ProxyProber: Send + Sync {
    /// Returns the identity (usually the egress IP) the endpoint
    /// reported, or an error if the proxy could not complete the probe.
    async fn probe(&self, endpoint: &ProxyEndpoint, probe_url: &str) -> Result<String, ProbeError>;
}

/// Default prober: an HTTP GET through the proxy, expecting a JSON body
/// with an `origin` or `ip` field.
pub struct HttpProber {
    timeout: Duration,
    connect_timeout: Duration,
}

impl HttpProber {
    pub fn new(timeout: Duration, connect_timeout: Duration) -> Self {
        Self {
            timeout,
            connect_timeout,
        }
    }
}

#[async_trait]
impl ProxyProber for HttpProber {
    async fn probe(&self, endpoint: &ProxyEndpoint, probe_url: &str) -> Result<String, ProbeError> {
        let proxy = reqwest::Proxy::all(endpoint.server_url())
            .map_err(|e| ProbeError::Transport(e.to_string()))?
            .basic_auth(&endpoint.username, &endpoint.password);

        let client = reqwest::Client::builder()
            .proxy(proxy)
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .build()
            .map_err(|e| ProbeError::Transport(e.to_string()))?;

        let response = client
            .get(probe_url)
            .send()
            .await
            .map_err(|e| ProbeError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Status(status.as_u16()));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ProbeError::Transport(e.to_string()))?;

        // httpbin reports "origin"; ipinfo and ipify report "ip".
        payload
            .get("origin")
            .or_else(|| payload.get("ip"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(ProbeError::Payload)
    }
}
