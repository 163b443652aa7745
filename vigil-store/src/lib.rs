//! The persistent local queue of claimed profiles and their check status —
//! the single source of truth for in-flight work on this host.

mod error;
mod persistence;
mod store;

pub use error::StoreError;
pub use store::{
    AddProfileOutcome, CheckStore, Completion, ConversionResult, DeferredCheck, DeferredStats,
    Stats, StatusCounts,
};
