//! The coordinator driver loop: selects the next processable profile, runs
//! its outstanding checks, writes back transitions, and refills from the
//! shared queue when idle and healthy.

mod coordinator;
mod sleeper;
mod upstream;

pub use coordinator::{Coordinator, CycleOutcome, DEFAULT_CLAIM_COUNT};
pub use sleeper::{Sleeper, TokioSleeper};
pub use upstream::{endpoint_for_check, SteamApiExecutor, UpstreamError, UpstreamExecutor};
