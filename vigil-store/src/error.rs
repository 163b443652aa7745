use thiserror::Error;

/// Surfaced only from `CheckStore::add_profile`: the one escalation path in
/// this core, raised when the insert's persistence write fails so the
/// caller can release the claim rather than silently lose it.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to persist check store at {path}: {source}")]
    Persist {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
