use thiserror::Error;

/// Errors from the on-disk side of cooldown persistence. Internal to this
/// crate: `CooldownController` catches every variant at the call site, logs
/// it, and keeps running on its in-memory state rather than propagating it.
#[derive(Debug, Error)]
pub enum CooldownError {
    #[error("failed to read cooldown file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse cooldown file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to persist cooldown file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
