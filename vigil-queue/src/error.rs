use thiserror::Error;

/// Errors talking to the remote queue service. Every public `QueueClient`
/// method absorbs these internally and returns a safe default — nothing in
/// this crate escalates to its caller.
#[derive(Debug, Error)]
pub enum QueueClientError {
    #[error("request to {path} failed: {source}")]
    Request {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{path} returned unexpected status {status}")]
    UnexpectedStatus { path: String, status: u16 },

    #[error("failed to parse response body from {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
