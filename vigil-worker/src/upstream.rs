use std::time::Duration;

use async_trait::async_trait;
use vigil_types::{CheckName, EndpointName};

/// A non-cooldown-worthy or cooldown-worthy failure from one check
/// execution. `transient` is the check's own judgment (not this core's) of
/// whether a failure is worth retrying when it isn't classified as a
/// cooldown condition.
#[derive(Debug, Clone)]
pub struct UpstreamError {
    pub status_code: Option<u16>,
    pub message: String,
    pub transient: bool,
}

/// External collaborator: executes one check against the upstream service
/// and reports pass/fail, or an error for the cooldown controller to
/// classify. `Ok(true)` is a pass, `Ok(false)` a deterministic fail.
#[async_trait]
pub trait UpstreamExecutor: Send + Sync {
    async fn execute(&self, check: CheckName, steam_id: &str) -> Result<bool, UpstreamError>;
}

/// Maps a check to the endpoint name the cooldown controller tracks it
/// under — the same substring markers `EndpointName::from_url` extracts
/// from the request URL below.
pub fn endpoint_for_check(check: CheckName) -> EndpointName {
    match check {
        CheckName::AnimatedAvatar => EndpointName::AnimatedAvatar,
        CheckName::AvatarFrame => EndpointName::AvatarFrame,
        CheckName::MiniProfileBackground => EndpointName::MiniProfileBackground,
        CheckName::ProfileBackground => EndpointName::ProfileBackground,
        CheckName::SteamLevel => EndpointName::SteamLevel,
        CheckName::Friends => EndpointName::Friends,
        CheckName::CsgoInventory => EndpointName::Inventory,
    }
}

fn path_for_check(check: CheckName) -> &'static str {
    match check {
        CheckName::AnimatedAvatar => "GetAnimatedAvatar",
        CheckName::AvatarFrame => "GetAvatarFrame",
        CheckName::MiniProfileBackground => "GetMiniProfileBackground",
        CheckName::ProfileBackground => "GetProfileBackground",
        CheckName::SteamLevel => "GetSteamLevel",
        CheckName::Friends => "GetFriendList",
        CheckName::CsgoInventory => "inventory",
    }
}

/// The one shipped `UpstreamExecutor`: a plain reqwest GET against the
/// Steam Community API, interpreting a JSON `{"success": bool}` body.
pub struct SteamApiExecutor {
    http: reqwest::Client,
    base_url: String,
}

impl SteamApiExecutor {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn url_for(&self, check: CheckName, steam_id: &str) -> String {
        format!(
            "{}/{}/?steamid={}",
            self.base_url.trim_end_matches('/'),
            path_for_check(check),
            steam_id
        )
    }
}

#[async_trait]
impl UpstreamExecutor for SteamApiExecutor {
    async fn execute(&self, check: CheckName, steam_id: &str) -> Result<bool, UpstreamError> {
        let url = self.url_for(check, steam_id);
        let endpoint = endpoint_for_check(check);
        let timeout = Duration::from_millis(endpoint.request_timeout_ms());

        let response = self
            .http
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(UpstreamError {
                status_code: Some(429),
                message: "429 Too Many Requests".to_string(),
                transient: true,
            });
        }
        if !status.is_success() {
            return Err(UpstreamError {
                status_code: Some(status.as_u16()),
                message: format!("unexpected status {status}"),
                transient: false,
            });
        }

        let body: serde_json::Value = response.json().await.map_err(|e| UpstreamError {
            status_code: Some(status.as_u16()),
            message: format!("failed to parse response body: {e}"),
            transient: false,
        })?;
        Ok(body.get("success").and_then(|v| v.as_bool()).unwrap_or(false))
    }
}

fn classify_transport_error(e: &reqwest::Error) -> UpstreamError {
    let message = if e.is_timeout() {
        format!("timeout: {e}")
    } else if e.is_connect() {
        format!("ECONNREFUSED: {e}")
    } else {
        e.to_string()
    };
    UpstreamError {
        status_code: None,
        message,
        transient: true,
    }
}
