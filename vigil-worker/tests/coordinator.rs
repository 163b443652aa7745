use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use vigil_cooldown::{CooldownController, CooldownDurations};
use vigil_store::{AddProfileOutcome, CheckStore};
use vigil_types::{CheckName, CheckStatus, ClaimedItem, ExistenceProbe, ExistenceProbeResult, QueueWorker};
use vigil_worker::{Coordinator, CycleOutcome, UpstreamError, UpstreamExecutor};

struct FakeQueue {
    claim_queue: Mutex<Vec<Vec<ClaimedItem>>>,
    released: Mutex<Vec<String>>,
    release_instance_calls: AtomicU32,
    claim_calls: AtomicU32,
}

impl FakeQueue {
    fn new(claims: Vec<Vec<ClaimedItem>>) -> Self {
        Self {
            claim_queue: Mutex::new(claims),
            released: Mutex::new(Vec::new()),
            release_instance_calls: AtomicU32::new(0),
            claim_calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl QueueWorker for FakeQueue {
    async fn claim_items(&self, _count: u32) -> Vec<ClaimedItem> {
        self.claim_calls.fetch_add(1, Ordering::SeqCst);
        let mut queue = self.claim_queue.lock().unwrap();
        if queue.is_empty() {
            Vec::new()
        } else {
            queue.remove(0)
        }
    }

    async fn release_items(&self, steam_ids: &[String]) -> bool {
        self.released.lock().unwrap().extend_from_slice(steam_ids);
        true
    }

    async fn release_instance(&self) -> u64 {
        self.release_instance_calls.fetch_add(1, Ordering::SeqCst);
        0
    }
}

struct AlwaysPassExecutor;
#[async_trait]
impl UpstreamExecutor for AlwaysPassExecutor {
    async fn execute(&self, _check: CheckName, _steam_id: &str) -> Result<bool, UpstreamError> {
        Ok(true)
    }
}

struct RateLimitedExecutor;
#[async_trait]
impl UpstreamExecutor for RateLimitedExecutor {
    async fn execute(&self, _check: CheckName, _steam_id: &str) -> Result<bool, UpstreamError> {
        Err(UpstreamError {
            status_code: Some(429),
            message: "429 Too Many Requests".to_string(),
            transient: true,
        })
    }
}

struct SuppressingProbe;
#[async_trait]
impl ExistenceProbe for SuppressingProbe {
    async fn check(&self, _steam_id: &str) -> ExistenceProbeResult {
        ExistenceProbeResult {
            success: true,
            exists: true,
            error: None,
        }
    }
}

fn cooldowns() -> (Arc<CooldownController>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cooldowns.json");
    (
        Arc::new(CooldownController::new(path, CooldownDurations::default(), vec![1, 2, 4])),
        dir,
    )
}

fn store() -> (Arc<CheckStore>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("profiles.json");
    (Arc::new(CheckStore::new(path, None)), dir)
}

#[tokio::test]
async fn fresh_claim_runs_every_check_to_completion() {
    let (store, _store_dir) = store();
    let (cooldowns, _cooldown_dir) = cooldowns();
    let claim = vec![vec![ClaimedItem {
        id: "A".to_string(),
        username: "alice".to_string(),
        data: None,
    }]];
    let queue: Arc<dyn QueueWorker> = Arc::new(FakeQueue::new(claim));

    let coordinator = Coordinator::new(
        store.clone(),
        cooldowns,
        Some(queue),
        Arc::new(AlwaysPassExecutor),
        None,
        Arc::new(vigil_worker::TokioSleeper),
    );

    // Cycle 1: empty store, refills from the queue.
    let outcome = coordinator.run_cycle().await;
    assert_eq!(outcome, CycleOutcome::Claimed(1));
    assert!(store.profile("A").is_some());

    // Cycle 2: drives every check to passed and removes the profile.
    let outcome = coordinator.run_cycle().await;
    assert_eq!(outcome, CycleOutcome::ProfileCompleted("A".to_string()));
    assert!(store.profile("A").is_none());
}

#[tokio::test]
async fn duplicate_suppressed_by_probe_is_released() {
    let (store, _store_dir) = store();
    let (cooldowns, _cooldown_dir) = cooldowns();
    let claim = vec![vec![ClaimedItem {
        id: "B".to_string(),
        username: String::new(),
        data: None,
    }]];
    let queue = Arc::new(FakeQueue::new(claim));
    let queue_handle = queue.clone();
    let queue_dyn: Arc<dyn QueueWorker> = queue;

    let coordinator = Coordinator::new(
        store.clone(),
        cooldowns,
        Some(queue_dyn),
        Arc::new(AlwaysPassExecutor),
        Some(Arc::new(SuppressingProbe)),
        Arc::new(vigil_worker::TokioSleeper),
    );

    let outcome = coordinator.run_cycle().await;
    assert_eq!(outcome, CycleOutcome::Claimed(0));
    assert!(store.profile("B").is_none());
    assert_eq!(queue_handle.released.lock().unwrap().as_slice(), ["B".to_string()]);
}

#[tokio::test]
async fn health_gate_blocks_claim_when_any_profile_is_deferred() {
    let (store, _store_dir) = store();
    let (cooldowns, _cooldown_dir) = cooldowns();

    match store.add_profile("existing", "x", None).await.unwrap() {
        AddProfileOutcome::Inserted(_) => {}
        other => panic!("expected Inserted, got {other:?}"),
    }
    for name in vigil_types::CHECK_NAMES {
        store.update_check("existing", name, CheckStatus::Passed);
    }
    store.update_check("existing", CheckName::Friends, CheckStatus::Deferred);
    assert!(!store.is_healthy(None));

    let claim = vec![vec![ClaimedItem {
        id: "never-claimed".to_string(),
        username: "nobody".to_string(),
        data: None,
    }]];
    let queue = Arc::new(FakeQueue::new(claim));
    let queue_handle = queue.clone();
    let queue_dyn: Arc<dyn QueueWorker> = queue;

    let coordinator = Coordinator::new(
        store.clone(),
        cooldowns,
        Some(queue_dyn),
        Arc::new(AlwaysPassExecutor),
        None,
        Arc::new(vigil_worker::TokioSleeper),
    );

    // next_processable returns "existing" itself (second pass: deferred-only
    // profile), so the cycle processes it directly. The claim path must
    // never run while any profile carries deferred work.
    coordinator.run_cycle().await;
    assert_eq!(queue_handle.claim_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn rate_limited_check_is_deferred_not_failed() {
    let (store, _store_dir) = store();
    let (cooldowns, _cooldown_dir) = cooldowns();
    store.add_profile("A", "alice", None).await.unwrap();

    let coordinator = Coordinator::new(
        store.clone(),
        cooldowns.clone(),
        None,
        Arc::new(RateLimitedExecutor),
        None,
        Arc::new(vigil_worker::TokioSleeper),
    );

    coordinator.run_cycle().await;
    let profile = store.profile("A").unwrap();
    for (_, status) in profile.checks.iter() {
        assert_eq!(status, CheckStatus::Deferred);
    }
}

#[tokio::test]
async fn deferred_sweep_makes_profile_processable_again() {
    let (store, _store_dir) = store();
    let (cooldowns, _cooldown_dir) = cooldowns();
    store.add_profile("A", "alice", None).await.unwrap();
    for name in vigil_types::CHECK_NAMES {
        store.update_check("A", name, CheckStatus::Passed);
    }
    store.update_check("A", CheckName::Friends, CheckStatus::Deferred);

    let coordinator = Coordinator::new(
        store.clone(),
        cooldowns,
        None,
        Arc::new(AlwaysPassExecutor),
        None,
        Arc::new(vigil_worker::TokioSleeper),
    );

    let result = coordinator.sweep_deferred();
    assert_eq!(result.conversions, 1);
    assert_eq!(
        store.profile("A").unwrap().checks.get(CheckName::Friends),
        CheckStatus::ToCheck
    );
}

#[tokio::test]
async fn startup_releases_orphaned_claims() {
    let (store, _store_dir) = store();
    let (cooldowns, _cooldown_dir) = cooldowns();
    let queue = Arc::new(FakeQueue::new(vec![]));
    let queue_handle = queue.clone();
    let queue_dyn: Arc<dyn QueueWorker> = queue;

    let coordinator = Coordinator::new(
        store,
        cooldowns,
        Some(queue_dyn),
        Arc::new(AlwaysPassExecutor),
        None,
        Arc::new(vigil_worker::TokioSleeper),
    );

    coordinator.startup().await;
    assert_eq!(queue_handle.release_instance_calls.load(Ordering::SeqCst), 1);
}
