use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use vigil_types::{EndpointCooldown, EndpointName};

use crate::error::CooldownError;

#[derive(Debug, Default, Serialize, Deserialize)]
struct CooldownDocument {
    endpoint_cooldowns: HashMap<EndpointName, EndpointCooldown>,
}

/// Loads the cooldown document, tolerating an absent file by returning an
/// empty map. A malformed file is a hard parse error — unlike the check
/// store, there is no sensible silent-recovery shape for corrupted cooldown
/// state, so callers decide whether to start fresh or fail startup.
pub fn load(path: &Path) -> Result<HashMap<EndpointName, EndpointCooldown>, CooldownError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(e) => {
            return Err(CooldownError::Read {
                path: path.display().to_string(),
                source: e,
            })
        }
    };
    let doc: CooldownDocument =
        serde_json::from_str(&contents).map_err(|e| CooldownError::Parse {
            path: path.display().to_string(),
            source: e,
        })?;
    Ok(doc.endpoint_cooldowns)
}

/// Writes the cooldown document atomically: serialize, write to a sibling
/// `.tmp` path, then rename over the target so a crash mid-write never
/// leaves a half-written file observable at `path`.
pub fn save(
    path: &Path,
    cooldowns: &HashMap<EndpointName, EndpointCooldown>,
) -> Result<(), CooldownError> {
    let doc = CooldownDocument {
        endpoint_cooldowns: cooldowns.clone(),
    };
    let serialized = serde_json::to_string_pretty(&doc).map_err(|e| CooldownError::Parse {
        path: path.display().to_string(),
        source: e,
    })?;
    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, serialized).map_err(|e| CooldownError::Write {
        path: tmp_path.display().to_string(),
        source: e,
    })?;
    std::fs::rename(&tmp_path, path).map_err(|e| CooldownError::Write {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_types::CooldownReason;

    #[test]
    fn missing_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cooldowns.json");
        let loaded = load(&path).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cooldowns.json");
        let mut cooldowns = HashMap::new();
        cooldowns.insert(
            EndpointName::Friends,
            EndpointCooldown {
                cooldown_until: 123,
                reason: CooldownReason::RateLimit {
                    backoff_level: 0,
                    duration_minutes: 1,
                    applied_at: 0,
                    error_message: "429".into(),
                },
            },
        );
        save(&path, &cooldowns).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded, cooldowns);

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("endpoint_cooldowns"));
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cooldowns.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(load(&path), Err(CooldownError::Parse { .. })));
    }
}
