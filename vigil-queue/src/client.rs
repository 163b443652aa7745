use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vigil_types::{ClaimedItem, QueueCompleter, QueueWorker};

use crate::error::QueueClientError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const QUEUE_NAME: &str = "validator";

#[derive(Debug, Deserialize)]
struct ClaimResponse {
    success: bool,
    #[serde(default)]
    items: Vec<ClaimedItem>,
}

#[derive(Debug, Deserialize)]
struct AckResponse {
    success: bool,
}

#[derive(Debug, Deserialize)]
struct ReleaseInstanceResponse {
    success: bool,
    #[serde(default)]
    released_count: u64,
}

#[derive(Debug, Deserialize)]
struct StatsResponse {
    success: bool,
    #[serde(default)]
    stats: serde_json::Value,
}

#[derive(Serialize)]
struct ClaimRequest<'a> {
    instance_id: &'a str,
    count: u32,
}

#[derive(Serialize)]
struct ItemsRequest<'a> {
    instance_id: &'a str,
    items: &'a [String],
}

#[derive(Serialize)]
struct InstanceRequest<'a> {
    instance_id: &'a str,
}

/// Thin client for the shared claim/complete/release/stats protocol. Every
/// method absorbs its own errors and returns a safe default rather than
/// propagating — claiming new work is never allowed to wedge the driver
/// loop on a flaky queue service.
pub struct QueueClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    instance_id: String,
}

impl QueueClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, instance_id: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client with a fixed timeout always builds");
        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            instance_id: instance_id.into(),
        }
    }

    fn url(&self, suffix: &str) -> String {
        format!("{}/queue/{}/{}", self.base_url.trim_end_matches('/'), QUEUE_NAME, suffix)
    }

    async fn post_json<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, QueueClientError> {
        let url = self.url(path);
        let response = self
            .http
            .post(&url)
            .header("X-API-Key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| QueueClientError::Request {
                path: url.clone(),
                source: e,
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| QueueClientError::Request {
            path: url.clone(),
            source: e,
        })?;

        if status.as_u16() != 200 {
            return Err(QueueClientError::UnexpectedStatus {
                path: url,
                status: status.as_u16(),
            });
        }

        serde_json::from_str(&text).map_err(|e| QueueClientError::Parse { path: url, source: e })
    }

    async fn get_json<R: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<R, QueueClientError> {
        let url = self.url(path);
        let response = self
            .http
            .get(&url)
            .header("X-API-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| QueueClientError::Request {
                path: url.clone(),
                source: e,
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| QueueClientError::Request {
            path: url.clone(),
            source: e,
        })?;

        if status.as_u16() != 200 {
            return Err(QueueClientError::UnexpectedStatus {
                path: url,
                status: status.as_u16(),
            });
        }

        serde_json::from_str(&text).map_err(|e| QueueClientError::Parse { path: url, source: e })
    }

    /// Acknowledges the given ids as fully processed. Returns `false` on
    /// any error, logged.
    async fn complete_items_inner(&self, steam_ids: &[String]) -> bool {
        let body = ItemsRequest {
            instance_id: &self.instance_id,
            items: steam_ids,
        };
        match self.post_json::<_, AckResponse>("complete", &body).await {
            Ok(resp) => resp.success,
            Err(e) => {
                tracing::warn!(error = %e, "complete failed");
                false
            }
        }
    }

    /// Returns `None` on any error, logged.
    pub async fn stats(&self) -> Option<serde_json::Value> {
        match self.get_json::<StatsResponse>("stats").await {
            Ok(resp) if resp.success => Some(resp.stats),
            Ok(_) => {
                tracing::warn!("stats reported success=false");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "stats failed");
                None
            }
        }
    }
}

#[async_trait]
impl QueueCompleter for QueueClient {
    async fn complete_items(&self, steam_ids: &[String]) -> bool {
        self.complete_items_inner(steam_ids).await
    }
}

#[async_trait]
impl QueueWorker for QueueClient {
    /// Claims up to `count` items. Returns an empty list on any error, logged.
    async fn claim_items(&self, count: u32) -> Vec<ClaimedItem> {
        let body = ClaimRequest {
            instance_id: &self.instance_id,
            count,
        };
        match self.post_json::<_, ClaimResponse>("claim", &body).await {
            Ok(resp) if resp.success => resp.items,
            Ok(_) => {
                tracing::warn!("claim reported success=false");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(error = %e, "claim failed");
                Vec::new()
            }
        }
    }

    /// Returns previously-claimed ids to the shared queue without marking
    /// success. Returns `false` on any error, logged.
    async fn release_items(&self, steam_ids: &[String]) -> bool {
        let body = ItemsRequest {
            instance_id: &self.instance_id,
            items: steam_ids,
        };
        match self.post_json::<_, AckResponse>("release", &body).await {
            Ok(resp) => resp.success,
            Err(e) => {
                tracing::warn!(error = %e, "release failed");
                false
            }
        }
    }

    /// Releases every item claimed by this instance, typically called once
    /// at startup to recover claims orphaned by a prior crash. Returns 0 on
    /// any error, logged — the one method with a non-empty/non-false default.
    async fn release_instance(&self) -> u64 {
        let body = InstanceRequest {
            instance_id: &self.instance_id,
        };
        match self.post_json::<_, ReleaseInstanceResponse>("release-instance", &body).await {
            Ok(resp) if resp.success => resp.released_count,
            Ok(_) => {
                tracing::warn!("release-instance reported success=false");
                0
            }
            Err(e) => {
                tracing::warn!(error = %e, "release-instance failed");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_queue_name_and_suffix() {
        let client = QueueClient::new("https://queue.example.com/", "key", "instance-1");
        assert_eq!(client.url("claim"), "https://queue.example.com/queue/validator/claim");
    }
}
