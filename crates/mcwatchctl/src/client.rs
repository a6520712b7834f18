//! HTTP client for communicating with mcwatchd.

use anyhow::{anyhow, Context, Result};
use mcwatch_shared::api::{AckResponse, ServerOverview, StatusResponse, TrackRequest};
use mcwatch_shared::ChannelId;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;

/// Client for communicating with mcwatchd
pub struct DaemonClient {
    http: Client,
    base: String,
}

impl DaemonClient {
    pub fn new(base: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn decode<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("mcwatchd returned {}: {}", status, body));
        }
        response
            .json()
            .await
            .context("mcwatchd sent an unexpected response")
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.http.get(self.url(path)).send().await.map_err(|e| {
            anyhow!(
                "Cannot reach mcwatchd at {}: {}\n\nIs the daemon running?",
                self.base,
                e
            )
        })?;
        self.decode(response).await
    }

    /// Live status of a server
    pub async fn status(&self, server: &str) -> Result<StatusResponse> {
        self.get(&format!("/status/{}", server)).await
    }

    pub async fn servers(&self) -> Result<Vec<ServerOverview>> {
        self.get("/v1/servers").await
    }

    pub async fn tracking(&self) -> Result<BTreeMap<String, u64>> {
        self.get("/v1/tracking").await
    }

    pub async fn track_on(&self, server: &str, channel: ChannelId) -> Result<String> {
        let request = TrackRequest {
            server: server.to_string(),
            channel,
        };
        let response = self
            .http
            .post(self.url("/v1/tracking"))
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Cannot reach mcwatchd at {}", self.base))?;
        let ack: AckResponse = self.decode(response).await?;
        Ok(ack.message)
    }

    pub async fn track_off(&self, server: &str) -> Result<String> {
        let response = self
            .http
            .delete(self.url(&format!("/v1/tracking/{}", server)))
            .send()
            .await
            .with_context(|| format!("Cannot reach mcwatchd at {}", self.base))?;
        let ack: AckResponse = self.decode(response).await?;
        Ok(ack.message)
    }
}
