use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One item returned by a successful claim against the shared queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimedItem {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// The claim/release/release-instance surface the coordinator needs from
/// the remote queue service. Expressed as a narrow trait, like
/// `ExistenceProbe` and `QueueCompleter`, so the worker crate never has to
/// depend on the concrete HTTP client to be testable.
#[async_trait]
pub trait QueueWorker: Send + Sync {
    /// Claims up to `count` items. Empty on any error.
    async fn claim_items(&self, count: u32) -> Vec<ClaimedItem>;
    /// Returns previously-claimed ids without marking success. `false` on error.
    async fn release_items(&self, steam_ids: &[String]) -> bool;
    /// Releases every item claimed by this instance. `0` on error.
    async fn release_instance(&self) -> u64;
}

/// Outcome of probing whether an identifier already exists downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistenceProbeResult {
    pub success: bool,
    pub exists: bool,
    pub error: Option<String>,
}

/// External collaborator, out of scope for this core: tests whether an
/// identifier is already present in a downstream database. `CheckStore`
/// consults it to suppress redundant inserts.
#[async_trait]
pub trait ExistenceProbe: Send + Sync {
    async fn check(&self, steam_id: &str) -> ExistenceProbeResult;
}

/// The one operation `CheckStore::remove_profile` needs from the queue
/// client: acknowledge completion. Expressed as a narrow trait rather than
/// a dependency on the concrete queue client so the store crate does not
/// need to know how claims are acknowledged over the network — just that
/// they are, best-effort.
#[async_trait]
pub trait QueueCompleter: Send + Sync {
    /// Acknowledges the given ids as fully processed. Returns whether the
    /// queue service accepted the acknowledgement; callers treat failure as
    /// best-effort (logged, does not fail the caller's own operation).
    async fn complete_items(&self, steam_ids: &[String]) -> bool;
}
