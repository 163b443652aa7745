use std::sync::Arc;
use std::time::Duration;

use vigil_cooldown::CooldownController;
use vigil_store::{AddProfileOutcome, CheckStore};
use vigil_types::{CheckStatus, ExistenceProbe, Profile, QueueWorker};

use crate::sleeper::Sleeper;
use crate::upstream::{endpoint_for_check, UpstreamExecutor};

/// Default claim size when refilling from an empty store.
pub const DEFAULT_CLAIM_COUNT: u32 = 5;

/// What one driver cycle accomplished, surfaced for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A profile's checks were all terminal; it was removed and acknowledged.
    ProfileCompleted(String),
    /// A profile had outstanding checks driven, but is not yet complete.
    ProfileProgressed(String),
    /// No local work; refilled from the queue, inserting this many new profiles.
    Claimed(usize),
    /// No local work, and either no queue is configured or the health gate
    /// blocked claiming this cycle.
    Idle,
}

/// Drives the loop: select the next processable profile, run its
/// outstanding checks, write back transitions, and refill from the shared
/// queue when idle and healthy. Owns no persistent state itself — that
/// lives in `CheckStore` and `CooldownController` — it only orchestrates.
pub struct Coordinator {
    store: Arc<CheckStore>,
    cooldowns: Arc<CooldownController>,
    queue: Option<Arc<dyn QueueWorker>>,
    executor: Arc<dyn UpstreamExecutor>,
    probe: Option<Arc<dyn ExistenceProbe>>,
    sleeper: Arc<dyn Sleeper>,
    claim_batch_size: u32,
}

impl Coordinator {
    pub fn new(
        store: Arc<CheckStore>,
        cooldowns: Arc<CooldownController>,
        queue: Option<Arc<dyn QueueWorker>>,
        executor: Arc<dyn UpstreamExecutor>,
        probe: Option<Arc<dyn ExistenceProbe>>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self::with_claim_batch_size(store, cooldowns, queue, executor, probe, sleeper, DEFAULT_CLAIM_COUNT)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_claim_batch_size(
        store: Arc<CheckStore>,
        cooldowns: Arc<CooldownController>,
        queue: Option<Arc<dyn QueueWorker>>,
        executor: Arc<dyn UpstreamExecutor>,
        probe: Option<Arc<dyn ExistenceProbe>>,
        sleeper: Arc<dyn Sleeper>,
        claim_batch_size: u32,
    ) -> Self {
        Self {
            store,
            cooldowns,
            queue,
            executor,
            probe,
            sleeper,
            claim_batch_size,
        }
    }

    /// Releases any claims orphaned by a prior crash of this instance.
    pub async fn startup(&self) {
        if let Some(queue) = &self.queue {
            let released = queue.release_instance().await;
            tracing::info!(released, "released orphaned claims at startup");
        }
    }

    /// One full cycle of the driver loop.
    pub async fn run_cycle(&self) -> CycleOutcome {
        match self.store.next_processable() {
            Some(profile) => self.process(profile).await,
            None => self.try_refill().await,
        }
    }

    async fn process(&self, profile: Profile) -> CycleOutcome {
        if profile.checks.all_terminal() {
            self.store.remove_profile(&profile.steam_id).await;
            return CycleOutcome::ProfileCompleted(profile.steam_id);
        }

        let executed = self.drive_checks(&profile).await;

        if self.store.completion(&profile.steam_id).all_complete {
            self.store.remove_profile(&profile.steam_id).await;
            CycleOutcome::ProfileCompleted(profile.steam_id)
        } else if executed {
            CycleOutcome::ProfileProgressed(profile.steam_id)
        } else {
            // Every outstanding check is deferred and waiting on a cooldown;
            // nothing was actually driven this cycle. Report idle so `run`
            // sleeps instead of spinning on this profile until the next sweep.
            CycleOutcome::Idle
        }
    }

    /// Drives every `to_check` entry, returning whether any check was
    /// actually attempted (vs. all outstanding checks already deferred).
    async fn drive_checks(&self, profile: &Profile) -> bool {
        let mut executed = false;
        for (check_name, status) in profile.checks.iter() {
            if status != CheckStatus::ToCheck {
                continue;
            }
            executed = true;
            let endpoint = endpoint_for_check(check_name);
            if !self.cooldowns.is_endpoint_available(endpoint) {
                self.store.update_check(&profile.steam_id, check_name, CheckStatus::Deferred);
                continue;
            }

            match self.executor.execute(check_name, &profile.steam_id).await {
                Ok(true) => {
                    self.cooldowns.reset_on_success(endpoint);
                    self.store.update_check(&profile.steam_id, check_name, CheckStatus::Passed);
                }
                Ok(false) => {
                    self.store.update_check(&profile.steam_id, check_name, CheckStatus::Failed);
                }
                Err(e) => {
                    let kind = self
                        .cooldowns
                        .handle_request_error(endpoint, e.status_code, &e.message);
                    let next_status = match kind {
                        Some(_) => CheckStatus::Deferred,
                        None if e.transient => CheckStatus::Deferred,
                        None => CheckStatus::Failed,
                    };
                    self.store.update_check(&profile.steam_id, check_name, next_status);
                }
            }
        }
        executed
    }

    /// Gated refill: only claims when no profile has deferred work and at
    /// least one endpoint is available. A failed insert (duplicate,
    /// suppressed, or a persistence error) releases just that item.
    async fn try_refill(&self) -> CycleOutcome {
        let Some(queue) = &self.queue else {
            return CycleOutcome::Idle;
        };
        if !self.store.is_healthy(Some(&self.cooldowns)) {
            return CycleOutcome::Idle;
        }

        let claimed = queue.claim_items(self.claim_batch_size).await;
        let mut inserted = 0;
        for item in &claimed {
            let probe = self.probe.as_deref();
            match self.store.add_profile(&item.id, &item.username, probe).await {
                Ok(AddProfileOutcome::Inserted(_)) => inserted += 1,
                Ok(AddProfileOutcome::AlreadyPresent(_) | AddProfileOutcome::SuppressedByProbe) => {
                    queue.release_items(std::slice::from_ref(&item.id)).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, steam_id = %item.id, "add_profile failed, releasing claim");
                    queue.release_items(std::slice::from_ref(&item.id)).await;
                }
            }
        }
        CycleOutcome::Claimed(inserted)
    }

    /// Retries deferred work after endpoint cooldowns expire. Intended to be
    /// called on a cadence separate from the main cycle.
    pub fn sweep_deferred(&self) -> vigil_store::ConversionResult {
        self.store.convert_deferred_to_to_check()
    }

    /// Runs the driver forever: startup release, then alternating cycles and
    /// deferred sweeps, sleeping between idle cycles via the injected
    /// sleeper. Exits when `shutdown` is signalled.
    pub async fn run(
        self: Arc<Self>,
        poll_interval: Duration,
        sweep_interval: Duration,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) {
        self.startup().await;
        let mut last_sweep = std::time::Instant::now();

        loop {
            if *shutdown.borrow() {
                return;
            }

            let outcome = self.run_cycle().await;
            if matches!(outcome, CycleOutcome::Idle) {
                tokio::select! {
                    _ = self.sleeper.sleep(poll_interval) => {}
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            return;
                        }
                    }
                }
            }

            // Measured on the wall clock, independent of `outcome`, so a
            // backlog of real work (never Idle) still gets swept on cadence.
            if last_sweep.elapsed() >= sweep_interval {
                let result = self.sweep_deferred();
                if result.conversions > 0 {
                    tracing::info!(
                        conversions = result.conversions,
                        profiles_affected = result.profiles_affected,
                        "swept deferred checks back to to_check"
                    );
                }
                last_sweep = std::time::Instant::now();
            }
        }
    }
}
