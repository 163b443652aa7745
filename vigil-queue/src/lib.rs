//! HTTP client for the shared claim/complete/release/stats work queue
//! protocol: JSON over HTTP, an `X-API-Key` header, and a fixed queue name.

mod client;
mod error;

pub use client::QueueClient;
pub use error::QueueClientError;
