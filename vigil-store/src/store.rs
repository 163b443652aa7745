use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use vigil_cooldown::CooldownController;
use vigil_types::time::epoch_ms;
use vigil_types::{CheckName, CheckStatus, ExistenceProbe, Profile, QueueCompleter};

use crate::error::StoreError;
use crate::persistence;

/// Result of `add_profile`.
#[derive(Debug, Clone, PartialEq)]
pub enum AddProfileOutcome {
    /// Freshly inserted.
    Inserted(Profile),
    /// Already tracked locally; returned unchanged.
    AlreadyPresent(Profile),
    /// Not inserted: the existence probe reported it already exists downstream.
    SuppressedByProbe,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ConversionResult {
    pub conversions: usize,
    pub profiles_affected: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusCounts {
    pub to_check: usize,
    pub passed: usize,
    pub failed: usize,
    pub deferred: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Stats {
    pub total_profiles: usize,
    pub by_username: HashMap<String, usize>,
    pub by_status: StatusCounts,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DeferredStats {
    pub total_deferred: usize,
    pub profiles_with_deferred: usize,
    pub total_profiles: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeferredCheck {
    pub steam_id: String,
    pub check_name: CheckName,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Completion {
    pub all_complete: bool,
    pub all_passed: bool,
}

/// The persistent local queue of claimed profiles and their check status —
/// the single source of truth for in-flight work on this host.
///
/// `CheckStore` holds a one-way reference to a `QueueCompleter` (injected at
/// construction) to acknowledge completion on remove; it never refers back
/// to whatever concrete client implements it.
pub struct CheckStore {
    profiles: RwLock<Vec<Profile>>,
    path: PathBuf,
    queue_completer: Option<Arc<dyn QueueCompleter>>,
}

impl CheckStore {
    pub fn new(path: PathBuf, queue_completer: Option<Arc<dyn QueueCompleter>>) -> Self {
        let profiles = persistence::load(&path);
        Self {
            profiles: RwLock::new(profiles),
            path,
            queue_completer,
        }
    }

    fn persist_locked(&self, profiles: &[Profile]) -> Result<(), StoreError> {
        persistence::save(&self.path, profiles).map_err(|e| StoreError::Persist {
            path: self.path.display().to_string(),
            source: e,
        })
    }

    /// Inserts a newly-claimed identifier, unless it is already tracked
    /// locally or an existence probe reports it as already processed
    /// downstream. The only call in this store that can raise: a failed
    /// persistence write during insertion propagates so the caller can
    /// release the claim back to the queue.
    pub async fn add_profile(
        &self,
        steam_id: &str,
        username: &str,
        probe: Option<&dyn ExistenceProbe>,
    ) -> Result<AddProfileOutcome, StoreError> {
        {
            let profiles = self.profiles.read().unwrap();
            if let Some(existing) = profiles.iter().find(|p| p.steam_id == steam_id) {
                return Ok(AddProfileOutcome::AlreadyPresent(existing.clone()));
            }
        }

        if let Some(probe) = probe {
            let result = probe.check(steam_id).await;
            if !result.success {
                tracing::warn!(steam_id, error = ?result.error, "existence probe failed, inserting anyway");
            } else if result.exists {
                return Ok(AddProfileOutcome::SuppressedByProbe);
            }
        }

        let profile = Profile::new(steam_id, username, epoch_ms());
        let mut profiles = self.profiles.write().unwrap();
        profiles.push(profile.clone());
        if let Err(e) = self.persist_locked(&profiles) {
            profiles.pop();
            return Err(e);
        }
        Ok(AddProfileOutcome::Inserted(profile))
    }

    /// Writes a new status for one check on one profile. Never fails the
    /// process: a missing profile or a persistence failure both surface
    /// `false` rather than raising.
    pub fn update_check(&self, steam_id: &str, check_name: CheckName, status: CheckStatus) -> bool {
        let mut profiles = self.profiles.write().unwrap();
        let Some(profile) = profiles.iter_mut().find(|p| p.steam_id == steam_id) else {
            tracing::warn!(steam_id, "update_check: profile not found");
            return false;
        };
        profile.checks.set(check_name, status);
        match self.persist_locked(&profiles) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, steam_id, "failed to persist check update");
                false
            }
        }
    }

    /// Removes a profile if present, persists, and best-effort acknowledges
    /// completion to the queue service if one is installed. Queue failures
    /// are logged but never fail the remove itself.
    pub async fn remove_profile(&self, steam_id: &str) -> bool {
        let removed = {
            let mut profiles = self.profiles.write().unwrap();
            let Some(index) = profiles.iter().position(|p| p.steam_id == steam_id) else {
                return false;
            };
            profiles.remove(index);
            if let Err(e) = self.persist_locked(&profiles) {
                tracing::error!(error = %e, steam_id, "failed to persist profile removal");
            }
            true
        };

        if removed {
            if let Some(completer) = &self.queue_completer {
                let ids = [steam_id.to_string()];
                if !completer.complete_items(&ids).await {
                    tracing::warn!(steam_id, "queue service did not acknowledge completion");
                }
            }
        }
        removed
    }

    /// Two-pass selection: any profile with outstanding `to_check` work, else
    /// any fully-terminal profile (so the coordinator can detect and remove
    /// it), else, on a second pass, any profile with only `deferred` work
    /// left. Insertion order throughout.
    pub fn next_processable(&self) -> Option<Profile> {
        let profiles = self.profiles.read().unwrap();
        for profile in profiles.iter() {
            if profile.checks.any_to_check() || profile.checks.all_terminal() {
                return Some(profile.clone());
            }
        }
        for profile in profiles.iter() {
            if profile.checks.any_deferred() {
                return Some(profile.clone());
            }
        }
        None
    }

    pub fn profile(&self, steam_id: &str) -> Option<Profile> {
        self.profiles
            .read()
            .unwrap()
            .iter()
            .find(|p| p.steam_id == steam_id)
            .cloned()
    }

    pub fn all(&self) -> Vec<Profile> {
        self.profiles.read().unwrap().clone()
    }

    /// Rewrites every `deferred` check in the store to `to_check`, persisting
    /// once if anything changed.
    pub fn convert_deferred_to_to_check(&self) -> ConversionResult {
        let mut profiles = self.profiles.write().unwrap();
        let mut result = ConversionResult::default();
        for profile in profiles.iter_mut() {
            let changed = profile.checks.convert_deferred_to_to_check();
            if changed > 0 {
                result.conversions += changed;
                result.profiles_affected += 1;
            }
        }
        if result.conversions > 0 {
            if let Err(e) = self.persist_locked(&profiles) {
                tracing::error!(error = %e, "failed to persist deferred sweep");
            }
        }
        result
    }

    pub fn stats(&self) -> Stats {
        let profiles = self.profiles.read().unwrap();
        let mut stats = Stats {
            total_profiles: profiles.len(),
            ..Default::default()
        };
        for profile in profiles.iter() {
            *stats.by_username.entry(profile.username.clone()).or_insert(0) += 1;
            for (_, status) in profile.checks.iter() {
                match status {
                    CheckStatus::ToCheck => stats.by_status.to_check += 1,
                    CheckStatus::Passed => stats.by_status.passed += 1,
                    CheckStatus::Failed => stats.by_status.failed += 1,
                    CheckStatus::Deferred => stats.by_status.deferred += 1,
                }
            }
        }
        stats
    }

    pub fn deferred_stats(&self) -> DeferredStats {
        let profiles = self.profiles.read().unwrap();
        let mut result = DeferredStats {
            total_profiles: profiles.len(),
            ..Default::default()
        };
        for profile in profiles.iter() {
            let deferred_here = profile.checks.iter().filter(|(_, s)| *s == CheckStatus::Deferred).count();
            if deferred_here > 0 {
                result.total_deferred += deferred_here;
                result.profiles_with_deferred += 1;
            }
        }
        result
    }

    pub fn deferred_checks(&self) -> Vec<DeferredCheck> {
        let profiles = self.profiles.read().unwrap();
        profiles
            .iter()
            .flat_map(|profile| {
                profile
                    .checks
                    .iter()
                    .filter(|(_, status)| *status == CheckStatus::Deferred)
                    .map(|(name, _)| DeferredCheck {
                        steam_id: profile.steam_id.clone(),
                        check_name: name,
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// `{all_complete, all_passed}` for one profile; a missing profile
    /// reports the neutral all-false shape rather than an error.
    pub fn completion(&self, steam_id: &str) -> Completion {
        match self.profile(steam_id) {
            Some(profile) => Completion {
                all_complete: profile.all_complete(),
                all_passed: profile.all_passed(),
            },
            None => {
                tracing::warn!(steam_id, "completion: profile not found");
                Completion::default()
            }
        }
    }

    /// True iff no profile has any `deferred` check and, when a cooldown
    /// controller is wired, at least one endpoint is currently available.
    /// Gates claim admission.
    pub fn is_healthy(&self, cooldowns: Option<&CooldownController>) -> bool {
        let no_deferred = !self
            .profiles
            .read()
            .unwrap()
            .iter()
            .any(|p| p.checks.any_deferred());
        if !no_deferred {
            return false;
        }
        match cooldowns {
            Some(c) => c.any_endpoint_available(),
            None => true,
        }
    }
}
