//! HTTP reachability probe

use crate::client::normalize_base_url;
use crate::error::Result;
use async_trait::async_trait;
use patrol_core::{NetworkState, ReachabilityProbe};
use reqwest::Client;
use std::time::Duration;
use tracing::trace;

/// Probes `GET {base}/api/health`.
///
/// Any HTTP answer means the link is up; only a success status means the
/// service is reachable. A refused connection means no link at all, while a
/// timeout is treated as a link without internet (captive portal, dead uplink).
#[derive(Debug, Clone)]
pub struct HttpReachability {
    http: Client,
    url: String,
}

impl HttpReachability {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let url = format!("{}/api/health", normalize_base_url(base_url)?);
        let http = Client::builder().timeout(timeout).connect_timeout(timeout).build()?;
        Ok(Self { http, url })
    }
}

#[async_trait]
impl ReachabilityProbe for HttpReachability {
    async fn probe(&self) -> NetworkState {
        let state = match self.http.get(&self.url).send().await {
            Ok(response) => NetworkState::new(true, response.status().is_success()),
            Err(e) if e.is_timeout() => NetworkState::new(true, false),
            Err(_) => NetworkState::OFFLINE,
        };
        trace!(url = %self.url, ?state, "Probed reachability");
        state
    }
}
