use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use serde::Serialize;
use vigil_types::time::epoch_ms;
use vigil_types::{CooldownReason, EndpointCooldown, EndpointName, ErrorKind, ALL_ENDPOINT_NAMES};

use crate::backoff::BackoffSequence;
use crate::persistence;

/// Fixed-duration cooldowns for non-429 connectivity errors, in milliseconds.
#[derive(Debug, Clone, Copy)]
pub struct CooldownDurations {
    pub connection_reset: u64,
    pub timeout: u64,
    pub dns_failure: u64,
}

impl Default for CooldownDurations {
    fn default() -> Self {
        Self {
            connection_reset: 60_000,
            timeout: 60_000,
            dns_failure: 60_000,
        }
    }
}

impl CooldownDurations {
    fn for_kind(&self, kind: ErrorKind) -> u64 {
        match kind {
            ErrorKind::ConnectionError => self.connection_reset,
            ErrorKind::Timeout => self.timeout,
            ErrorKind::DnsFailure => self.dns_failure,
            // mark_cooldown never reaches this branch for a rate limit; its
            // duration comes from the backoff sequence instead.
            ErrorKind::RateLimit => 60_000,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EndpointStatus {
    Available,
    Cooldown {
        remaining_ms: u64,
        reason: CooldownReason,
        until: u64,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionsSummary {
    pub available_connections: usize,
    pub total_connections: usize,
    pub next_available_in: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionStatus {
    pub connections: HashMap<EndpointName, EndpointStatus>,
    pub endpoint_summary: ConnectionsSummary,
}

struct State {
    cooldowns: HashMap<EndpointName, EndpointCooldown>,
    backoff_levels: HashMap<EndpointName, u32>,
}

/// Tracks, per named upstream endpoint, whether requests are currently
/// allowed. Applies exponential backoff to rate-limit signals and fixed
/// cooldowns to connectivity errors. The 429 backoff index survives a
/// cooldown's own expiry — it is only cleared by an observed success
/// (`reset_on_success`) — which is the one invariant this component exists
/// to protect.
///
/// A failed write-through to disk is logged and otherwise ignored: the
/// in-memory state (which is what every other method reads from) is always
/// correct for the life of the process, and cooldown bookkeeping is not on
/// this core's one escalation path (that's `CheckStore::add_profile` only).
pub struct CooldownController {
    state: RwLock<State>,
    path: PathBuf,
    durations: CooldownDurations,
    backoff_sequence: BackoffSequence,
}

impl CooldownController {
    /// Loads persisted cooldowns from `path`, tolerating an absent or
    /// malformed file by starting empty, and rehydrates the backoff-level
    /// table from every persisted 429 entry.
    pub fn new(path: PathBuf, durations: CooldownDurations, backoff_minutes: Vec<u64>) -> Self {
        let cooldowns = match persistence::load(&path) {
            Ok(cooldowns) => cooldowns,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load cooldown file, starting empty");
                HashMap::new()
            }
        };
        let mut backoff_levels = HashMap::new();
        for (name, cooldown) in &cooldowns {
            if let CooldownReason::RateLimit { backoff_level, .. } = &cooldown.reason {
                backoff_levels.insert(*name, *backoff_level);
            }
        }
        Self {
            state: RwLock::new(State {
                cooldowns,
                backoff_levels,
            }),
            path,
            durations,
            backoff_sequence: BackoffSequence::new(backoff_minutes),
        }
    }

    fn persist_locked(&self, state: &State) {
        if let Err(e) = persistence::save(&self.path, &state.cooldowns) {
            tracing::error!(error = %e, "failed to persist cooldown file; continuing with in-memory state");
        }
    }

    pub fn is_endpoint_available(&self, name: EndpointName) -> bool {
        let state = self.state.read().unwrap();
        match state.cooldowns.get(&name) {
            None => true,
            Some(cooldown) => epoch_ms() >= cooldown.cooldown_until,
        }
    }

    /// True iff at least one tracked endpoint (including `other`) can
    /// currently accept requests. Used by the claim health gate.
    pub fn any_endpoint_available(&self) -> bool {
        ALL_ENDPOINT_NAMES
            .into_iter()
            .any(|name| self.is_endpoint_available(name))
    }

    pub fn mark_cooldown(&self, name: EndpointName, kind: ErrorKind, error_message: &str) {
        let now = epoch_ms();
        let mut state = self.state.write().unwrap();

        let cooldown = if kind == ErrorKind::RateLimit {
            let previous = state.backoff_levels.get(&name).copied();
            let new_level = self.backoff_sequence.escalate(previous);
            let duration_minutes = self.backoff_sequence.minutes_at(new_level);
            state.backoff_levels.insert(name, new_level);
            EndpointCooldown {
                cooldown_until: now + duration_minutes * 60_000,
                reason: CooldownReason::RateLimit {
                    backoff_level: new_level,
                    duration_minutes,
                    applied_at: now,
                    error_message: error_message.to_string(),
                },
            }
        } else {
            let duration_used = self.durations.for_kind(kind);
            let reason = match kind {
                ErrorKind::ConnectionError => CooldownReason::ConnectionError {
                    duration_used,
                    applied_at: now,
                    error_message: error_message.to_string(),
                },
                ErrorKind::Timeout => CooldownReason::Timeout {
                    duration_used,
                    applied_at: now,
                    error_message: error_message.to_string(),
                },
                ErrorKind::DnsFailure => CooldownReason::DnsFailure {
                    duration_used,
                    applied_at: now,
                    error_message: error_message.to_string(),
                },
                ErrorKind::RateLimit => unreachable!("handled above"),
            };
            EndpointCooldown {
                cooldown_until: now + duration_used,
                reason,
            }
        };

        state.cooldowns.insert(name, cooldown);
        self.persist_locked(&state);
        tracing::warn!(endpoint = ?name, kind = kind.as_str(), "endpoint entered cooldown");
    }

    /// Clears the backoff level for `name` and, if its active cooldown was
    /// a 429, clears that too. Non-429 cooldowns are left in place — they
    /// are only cleared by deadline expiry.
    pub fn reset_on_success(&self, name: EndpointName) {
        let mut state = self.state.write().unwrap();
        state.backoff_levels.remove(&name);
        let had_rate_limit_cooldown = matches!(
            state.cooldowns.get(&name),
            Some(EndpointCooldown {
                reason: CooldownReason::RateLimit { .. },
                ..
            })
        );
        if had_rate_limit_cooldown {
            state.cooldowns.remove(&name);
            self.persist_locked(&state);
        }
    }

    /// Classifies an upstream error message by substring match, first match
    /// wins. Returns `None` when the error is not cooldown-worthy.
    pub fn classify_error(message: &str) -> Option<ErrorKind> {
        if message.contains("ENOTFOUND") || message.contains("EHOSTUNREACH") {
            return Some(ErrorKind::DnsFailure);
        }
        if message.contains("timeout") || message.contains("ETIMEDOUT") {
            return Some(ErrorKind::Timeout);
        }
        const CONNECTION_MARKERS: [&str; 7] = [
            "socket disconnected",
            "socket hang up",
            "ECONNRESET",
            "ECONNREFUSED",
            "certificate",
            "SSL",
            "TLS",
        ];
        if CONNECTION_MARKERS.iter().any(|m| message.contains(m)) {
            return Some(ErrorKind::ConnectionError);
        }
        None
    }

    /// Classifies `error_message` for `endpoint` and, if it is cooldown
    /// worthy (429/connection/timeout/dns), marks the cooldown and returns
    /// the classified kind. A non-cooldown-worthy error returns `None` and
    /// is left for the caller to handle.
    pub fn handle_request_error(
        &self,
        endpoint: EndpointName,
        status_code: Option<u16>,
        error_message: &str,
    ) -> Option<ErrorKind> {
        let kind = if status_code == Some(429) {
            Some(ErrorKind::RateLimit)
        } else {
            Self::classify_error(error_message)
        };
        if let Some(kind) = kind {
            self.mark_cooldown(endpoint, kind, error_message);
        }
        kind
    }

    /// Deletes every cooldown whose deadline has passed. Backoff levels are
    /// untouched — the single most important invariant in this component is
    /// that a fresh 429 after expiry escalates from the previous level
    /// rather than restarting at zero.
    pub fn cleanup_expired(&self) -> usize {
        let now = epoch_ms();
        let mut state = self.state.write().unwrap();
        let expired: Vec<EndpointName> = state
            .cooldowns
            .iter()
            .filter(|(_, c)| c.cooldown_until <= now)
            .map(|(name, _)| *name)
            .collect();
        if expired.is_empty() {
            return 0;
        }
        for name in &expired {
            state.cooldowns.remove(name);
        }
        self.persist_locked(&state);
        expired.len()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.cleanup_expired();
        let now = epoch_ms();
        let state = self.state.read().unwrap();

        let mut connections = HashMap::new();
        let mut available_connections = 0;
        let mut next_available_in: Option<u64> = None;

        for name in ALL_ENDPOINT_NAMES {
            match state.cooldowns.get(&name) {
                None => {
                    available_connections += 1;
                    connections.insert(name, EndpointStatus::Available);
                }
                Some(cooldown) => {
                    let remaining_ms = cooldown.cooldown_until.saturating_sub(now);
                    next_available_in = Some(match next_available_in {
                        Some(existing) => existing.min(remaining_ms),
                        None => remaining_ms,
                    });
                    connections.insert(
                        name,
                        EndpointStatus::Cooldown {
                            remaining_ms,
                            reason: cooldown.reason.clone(),
                            until: cooldown.cooldown_until,
                        },
                    );
                }
            }
        }

        ConnectionStatus {
            connections,
            endpoint_summary: ConnectionsSummary {
                available_connections,
                total_connections: ALL_ENDPOINT_NAMES.len(),
                next_available_in,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(backoff: Vec<u64>) -> (CooldownController, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cooldowns.json");
        let c = CooldownController::new(path, CooldownDurations::default(), backoff);
        (c, dir)
    }

    #[test]
    fn classify_error_matches_substring_table() {
        assert_eq!(
            CooldownController::classify_error("getaddrinfo ENOTFOUND host"),
            Some(ErrorKind::DnsFailure)
        );
        assert_eq!(
            CooldownController::classify_error("request timeout after 15s"),
            Some(ErrorKind::Timeout)
        );
        assert_eq!(
            CooldownController::classify_error("read ECONNRESET"),
            Some(ErrorKind::ConnectionError)
        );
        assert_eq!(
            CooldownController::classify_error("Bad Request: invalid steam id"),
            None
        );
    }

    #[test]
    fn fresh_endpoint_is_available() {
        let (c, _dir) = controller(vec![1, 2, 4]);
        assert!(c.is_endpoint_available(EndpointName::Friends));
    }

    #[test]
    fn rate_limit_escalates_and_clamps() {
        let (c, _dir) = controller(vec![1, 2, 4]);
        c.mark_cooldown(EndpointName::Friends, ErrorKind::RateLimit, "429");
        assert!(!c.is_endpoint_available(EndpointName::Friends));

        c.mark_cooldown(EndpointName::Friends, ErrorKind::RateLimit, "429");
        c.mark_cooldown(EndpointName::Friends, ErrorKind::RateLimit, "429");
        // Fourth call: stays clamped at the last index (2).
        c.mark_cooldown(EndpointName::Friends, ErrorKind::RateLimit, "429");

        let status = c.connection_status();
        match &status.connections[&EndpointName::Friends] {
            EndpointStatus::Cooldown { reason, .. } => match reason {
                CooldownReason::RateLimit {
                    backoff_level,
                    duration_minutes,
                    ..
                } => {
                    assert_eq!(*backoff_level, 2);
                    assert_eq!(*duration_minutes, 4);
                }
                _ => panic!("expected a rate limit cooldown"),
            },
            EndpointStatus::Available => panic!("expected endpoint in cooldown"),
        }
    }

    #[test]
    fn escalation_survives_expiry() {
        let (c, _dir) = controller(vec![1, 2, 4]);
        c.mark_cooldown(EndpointName::Friends, ErrorKind::RateLimit, "429");

        // Simulate expiry by forcing the cooldown deadline into the past,
        // then clean up — the backoff level table must survive this.
        {
            let mut state = c.state.write().unwrap();
            state
                .cooldowns
                .get_mut(&EndpointName::Friends)
                .unwrap()
                .cooldown_until = 0;
        }
        let removed = c.cleanup_expired();
        assert_eq!(removed, 1);
        assert!(c.is_endpoint_available(EndpointName::Friends));

        c.mark_cooldown(EndpointName::Friends, ErrorKind::RateLimit, "429");
        let status = c.connection_status();
        match &status.connections[&EndpointName::Friends] {
            EndpointStatus::Cooldown { reason, .. } => match reason {
                CooldownReason::RateLimit { backoff_level, .. } => assert_eq!(*backoff_level, 1),
                _ => panic!("expected rate limit"),
            },
            EndpointStatus::Available => panic!("expected cooldown"),
        }
    }

    #[test]
    fn reset_on_success_clears_rate_limit_but_not_connection_error() {
        let (c, _dir) = controller(vec![1, 2, 4]);
        c.mark_cooldown(EndpointName::Friends, ErrorKind::RateLimit, "429");
        c.reset_on_success(EndpointName::Friends);
        assert!(c.is_endpoint_available(EndpointName::Friends));

        c.mark_cooldown(
            EndpointName::Inventory,
            ErrorKind::ConnectionError,
            "ECONNRESET",
        );
        c.reset_on_success(EndpointName::Inventory);
        assert!(!c.is_endpoint_available(EndpointName::Inventory));
    }

    #[test]
    fn rehydrates_backoff_level_from_persisted_cooldowns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cooldowns.json");
        {
            let c = CooldownController::new(path.clone(), CooldownDurations::default(), vec![1, 2, 4]);
            c.mark_cooldown(EndpointName::Friends, ErrorKind::RateLimit, "429");
            c.mark_cooldown(EndpointName::Friends, ErrorKind::RateLimit, "429");
        }
        // Fresh controller instance over the same file: backoff level 1
        // must be rehydrated even though the process "restarted".
        let c = CooldownController::new(path, CooldownDurations::default(), vec![1, 2, 4]);
        c.mark_cooldown(EndpointName::Friends, ErrorKind::RateLimit, "429");
        let status = c.connection_status();
        match &status.connections[&EndpointName::Friends] {
            EndpointStatus::Cooldown { reason, .. } => match reason {
                CooldownReason::RateLimit { backoff_level, .. } => assert_eq!(*backoff_level, 2),
                _ => panic!("expected rate limit"),
            },
            EndpointStatus::Available => panic!("expected cooldown"),
        }
    }

    #[test]
    fn handle_request_error_passthrough_for_unrelated_errors() {
        let (c, _dir) = controller(vec![1, 2, 4]);
        let kind = c.handle_request_error(EndpointName::Friends, Some(400), "bad request");
        assert_eq!(kind, None);
        assert!(c.is_endpoint_available(EndpointName::Friends));
    }

    #[test]
    fn handle_request_error_429_status_marks_cooldown() {
        let (c, _dir) = controller(vec![1, 2, 4]);
        let kind = c.handle_request_error(EndpointName::Friends, Some(429), "Too Many Requests");
        assert_eq!(kind, Some(ErrorKind::RateLimit));
        assert!(!c.is_endpoint_available(EndpointName::Friends));
    }

    #[test]
    fn cleanup_expired_is_idempotent() {
        let (c, _dir) = controller(vec![1, 2, 4]);
        c.mark_cooldown(
            EndpointName::Inventory,
            ErrorKind::ConnectionError,
            "ECONNRESET",
        );
        {
            let mut state = c.state.write().unwrap();
            state
                .cooldowns
                .get_mut(&EndpointName::Inventory)
                .unwrap()
                .cooldown_until = 0;
        }
        assert_eq!(c.cleanup_expired(), 1);
        assert_eq!(c.cleanup_expired(), 0);
    }
}
