use serde::{Deserialize, Serialize};

/// Why an endpoint is currently in cooldown. Internally tagged on `reason`
/// so the on-disk shape is a single flat object per endpoint, matching the
/// external interface: `{"cooldown_until": ..., "reason": "429", ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum CooldownReason {
    #[serde(rename = "429")]
    RateLimit {
        backoff_level: u32,
        duration_minutes: u64,
        applied_at: u64,
        error_message: String,
    },
    ConnectionError {
        duration_used: u64,
        applied_at: u64,
        error_message: String,
    },
    Timeout {
        duration_used: u64,
        applied_at: u64,
        error_message: String,
    },
    DnsFailure {
        duration_used: u64,
        applied_at: u64,
        error_message: String,
    },
}

impl CooldownReason {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, CooldownReason::RateLimit { .. })
    }

    pub fn applied_at(&self) -> u64 {
        match self {
            CooldownReason::RateLimit { applied_at, .. }
            | CooldownReason::ConnectionError { applied_at, .. }
            | CooldownReason::Timeout { applied_at, .. }
            | CooldownReason::DnsFailure { applied_at, .. } => *applied_at,
        }
    }
}

/// One active cooldown record for a named endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointCooldown {
    pub cooldown_until: u64,
    #[serde(flatten)]
    pub reason: CooldownReason,
}

/// The non-cooldown-specific error classes an upstream error can fall into,
/// classified from the error message by substring match. Anything that
/// doesn't match is a passthrough — not cooldown-worthy, left to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    #[serde(rename = "429")]
    RateLimit,
    ConnectionError,
    Timeout,
    DnsFailure,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::RateLimit => "429",
            ErrorKind::ConnectionError => "connection_error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::DnsFailure => "dns_failure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_round_trips_through_json() {
        let cooldown = EndpointCooldown {
            cooldown_until: 1_000_000,
            reason: CooldownReason::RateLimit {
                backoff_level: 2,
                duration_minutes: 4,
                applied_at: 900_000,
                error_message: "429 Too Many Requests".into(),
            },
        };
        let json = serde_json::to_value(&cooldown).unwrap();
        assert_eq!(json["reason"], "429");
        assert_eq!(json["backoff_level"], 2);
        let back: EndpointCooldown = serde_json::from_value(json).unwrap();
        assert_eq!(back, cooldown);
    }

    #[test]
    fn connection_error_round_trips_through_json() {
        let cooldown = EndpointCooldown {
            cooldown_until: 500,
            reason: CooldownReason::ConnectionError {
                duration_used: 30_000,
                applied_at: 0,
                error_message: "ECONNRESET".into(),
            },
        };
        let json = serde_json::to_value(&cooldown).unwrap();
        assert_eq!(json["reason"], "connection_error");
        let back: EndpointCooldown = serde_json::from_value(json).unwrap();
        assert_eq!(back, cooldown);
    }
}
