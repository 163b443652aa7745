use serde::{Deserialize, Serialize};

/// Closed set of upstream endpoints the cooldown controller tracks. Same
/// cardinality as the check-name set but a distinct vocabulary — endpoint
/// names are extracted from request URLs, not from check identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointName {
    Friends,
    Inventory,
    SteamLevel,
    AnimatedAvatar,
    AvatarFrame,
    MiniProfileBackground,
    ProfileBackground,
    Other,
}

/// The named endpoints enumerated in the cooldown controller's own
/// vocabulary (excludes the `other` fallback bucket).
pub const ENDPOINT_NAMES: [EndpointName; 7] = [
    EndpointName::Friends,
    EndpointName::Inventory,
    EndpointName::SteamLevel,
    EndpointName::AnimatedAvatar,
    EndpointName::AvatarFrame,
    EndpointName::MiniProfileBackground,
    EndpointName::ProfileBackground,
];

/// All endpoint names including `other`, for reports that should account
/// for every bucket a cooldown could land in.
pub const ALL_ENDPOINT_NAMES: [EndpointName; 8] = [
    EndpointName::Friends,
    EndpointName::Inventory,
    EndpointName::SteamLevel,
    EndpointName::AnimatedAvatar,
    EndpointName::AvatarFrame,
    EndpointName::MiniProfileBackground,
    EndpointName::ProfileBackground,
    EndpointName::Other,
];

/// Substring precedence table from the upstream endpoint-name extraction
/// rule: first match wins, `other` is the fallback.
const EXTRACTION_TABLE: [(&str, EndpointName); 7] = [
    ("GetFriendList", EndpointName::Friends),
    ("inventory", EndpointName::Inventory),
    ("GetSteamLevel", EndpointName::SteamLevel),
    ("GetAnimatedAvatar", EndpointName::AnimatedAvatar),
    ("GetAvatarFrame", EndpointName::AvatarFrame),
    ("GetMiniProfileBackground", EndpointName::MiniProfileBackground),
    ("GetProfileBackground", EndpointName::ProfileBackground),
];

impl EndpointName {
    /// Classifies a request URL by substring match, in the fixed precedence
    /// order named in the external interface contract. Falls back to `Other`.
    pub fn from_url(url: &str) -> EndpointName {
        for (needle, name) in EXTRACTION_TABLE {
            if url.contains(needle) {
                return name;
            }
        }
        EndpointName::Other
    }

    /// Per-endpoint upstream request timeout: 25s for `inventory`, 15s elsewhere.
    pub fn request_timeout_ms(self) -> u64 {
        match self {
            EndpointName::Inventory => 25_000,
            _ => 15_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_precedence_matches_table() {
        assert_eq!(
            EndpointName::from_url("https://steamcommunity.com/actions/GetFriendList"),
            EndpointName::Friends
        );
        assert_eq!(
            EndpointName::from_url("https://api.steamcommunity.com/inventory/76561"),
            EndpointName::Inventory
        );
        assert_eq!(
            EndpointName::from_url("https://steamcommunity.com/GetSteamLevel"),
            EndpointName::SteamLevel
        );
        assert_eq!(
            EndpointName::from_url("https://steamcommunity.com/unknown/path"),
            EndpointName::Other
        );
    }

    #[test]
    fn inventory_gets_longer_timeout() {
        assert_eq!(EndpointName::Inventory.request_timeout_ms(), 25_000);
        assert_eq!(EndpointName::Friends.request_timeout_ms(), 15_000);
    }

    #[test]
    fn serde_uses_spec_tokens() {
        assert_eq!(
            serde_json::to_value(EndpointName::Inventory).unwrap(),
            serde_json::json!("inventory")
        );
        assert_eq!(
            serde_json::to_value(EndpointName::Other).unwrap(),
            serde_json::json!("other")
        );
    }
}
