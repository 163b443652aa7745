use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch, matching the unit used throughout
/// the persisted data model (`timestamp`, `cooldown_until`, `applied_at`).
pub fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the Unix epoch")
        .as_millis() as u64
}
