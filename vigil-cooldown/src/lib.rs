//! Per-endpoint cooldown controller: exponential backoff for rate-limit
//! signals, fixed cooldowns for connectivity errors, with the 429 backoff
//! index surviving cooldown expiry.

mod backoff;
mod controller;
mod error;
mod persistence;

pub use backoff::{BackoffSequence, DEFAULT_BACKOFF_SEQUENCE};
pub use controller::{
    ConnectionStatus, ConnectionsSummary, CooldownController, CooldownDurations, EndpointStatus,
};
pub use error::CooldownError;
