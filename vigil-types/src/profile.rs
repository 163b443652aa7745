use serde::{Deserialize, Serialize};

use crate::check::CheckSet;

/// Literal substituted for a missing or blank username on insertion.
pub const DEFAULT_USERNAME: &str = "Professor";

/// The unit of tracked work: one claimed identifier plus the status of
/// every check in the fixed battery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub steam_id: String,
    pub username: String,
    pub timestamp: u64,
    pub checks: CheckSet,
}

impl Profile {
    /// Builds a freshly-claimed profile: blank usernames are rewritten to
    /// `Professor`, the timestamp is set now, every check starts `to_check`.
    pub fn new(steam_id: impl Into<String>, username: impl Into<String>, timestamp: u64) -> Self {
        let username = username.into();
        let username = if username.trim().is_empty() {
            DEFAULT_USERNAME.to_string()
        } else {
            username
        };
        Self {
            steam_id: steam_id.into(),
            username,
            timestamp,
            checks: CheckSet::new_all_to_check(),
        }
    }

    pub fn all_complete(&self) -> bool {
        self.checks.all_terminal()
    }

    pub fn all_passed(&self) -> bool {
        self.checks.all_passed()
    }
}
