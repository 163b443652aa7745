use std::path::Path;

use vigil_types::Profile;

/// Loads the profile document, tolerating an absent or malformed file by
/// returning an empty list (and logging) rather than failing — only the
/// write side of this store can escalate.
pub fn load(path: &Path) -> Vec<Profile> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            tracing::warn!(error = %e, path = %path.display(), "failed to read check store file, starting empty");
            return Vec::new();
        }
    };
    match serde_json::from_str(&contents) {
        Ok(profiles) => profiles,
        Err(e) => {
            tracing::warn!(error = %e, path = %path.display(), "malformed check store file, starting empty");
            Vec::new()
        }
    }
}

/// Writes the profile document atomically: serialize pretty-printed with
/// two-space indentation, write to a sibling `.tmp` path, then rename over
/// the target.
pub fn save(path: &Path, profiles: &[Profile]) -> std::io::Result<()> {
    let serialized = serde_json::to_string_pretty(profiles)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, serialized)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}
