use serde::{Deserialize, Serialize};

/// The fixed, ordered battery of checks run against every claimed profile.
///
/// The set is closed: nothing constructs a profile with any other key, and
/// deserializing an unknown check name is a hard error rather than a
/// silently-dropped field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckName {
    AnimatedAvatar,
    AvatarFrame,
    MiniProfileBackground,
    ProfileBackground,
    SteamLevel,
    Friends,
    CsgoInventory,
}

/// Display order for the check battery; also the order `CheckSet::iter` walks.
pub const CHECK_NAMES: [CheckName; 7] = [
    CheckName::AnimatedAvatar,
    CheckName::AvatarFrame,
    CheckName::MiniProfileBackground,
    CheckName::ProfileBackground,
    CheckName::SteamLevel,
    CheckName::Friends,
    CheckName::CsgoInventory,
];

/// One of exactly four states a check can be in. Closed set: writers must
/// reject anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    /// Initial state; work outstanding.
    ToCheck,
    /// Terminal success.
    Passed,
    /// Terminal failure.
    Failed,
    /// Temporarily suspended, usually due to an endpoint cooldown.
    /// Behaves like `ToCheck` for selection purposes except it is
    /// deprioritized and swept separately.
    Deferred,
}

impl CheckStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, CheckStatus::Passed | CheckStatus::Failed)
    }
}

/// The status of every check for one profile. Modeled as a struct with one
/// field per check, rather than an open map, so "every profile's checks
/// mapping contains exactly the closed check-name set" is a property of the
/// type rather than something validated at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckSet {
    pub animated_avatar: CheckStatus,
    pub avatar_frame: CheckStatus,
    pub mini_profile_background: CheckStatus,
    pub profile_background: CheckStatus,
    pub steam_level: CheckStatus,
    pub friends: CheckStatus,
    pub csgo_inventory: CheckStatus,
}

impl CheckSet {
    /// Every check initialized to `to_check`, as required on profile insertion.
    pub fn new_all_to_check() -> Self {
        Self {
            animated_avatar: CheckStatus::ToCheck,
            avatar_frame: CheckStatus::ToCheck,
            mini_profile_background: CheckStatus::ToCheck,
            profile_background: CheckStatus::ToCheck,
            steam_level: CheckStatus::ToCheck,
            friends: CheckStatus::ToCheck,
            csgo_inventory: CheckStatus::ToCheck,
        }
    }

    pub fn get(&self, name: CheckName) -> CheckStatus {
        match name {
            CheckName::AnimatedAvatar => self.animated_avatar,
            CheckName::AvatarFrame => self.avatar_frame,
            CheckName::MiniProfileBackground => self.mini_profile_background,
            CheckName::ProfileBackground => self.profile_background,
            CheckName::SteamLevel => self.steam_level,
            CheckName::Friends => self.friends,
            CheckName::CsgoInventory => self.csgo_inventory,
        }
    }

    pub fn set(&mut self, name: CheckName, status: CheckStatus) {
        let slot = match name {
            CheckName::AnimatedAvatar => &mut self.animated_avatar,
            CheckName::AvatarFrame => &mut self.avatar_frame,
            CheckName::MiniProfileBackground => &mut self.mini_profile_background,
            CheckName::ProfileBackground => &mut self.profile_background,
            CheckName::SteamLevel => &mut self.steam_level,
            CheckName::Friends => &mut self.friends,
            CheckName::CsgoInventory => &mut self.csgo_inventory,
        };
        *slot = status;
    }

    pub fn iter(&self) -> impl Iterator<Item = (CheckName, CheckStatus)> + '_ {
        CHECK_NAMES.iter().map(move |&name| (name, self.get(name)))
    }

    pub fn any_to_check(&self) -> bool {
        self.iter().any(|(_, s)| s == CheckStatus::ToCheck)
    }

    pub fn any_deferred(&self) -> bool {
        self.iter().any(|(_, s)| s == CheckStatus::Deferred)
    }

    pub fn all_terminal(&self) -> bool {
        self.iter().all(|(_, s)| s.is_terminal())
    }

    pub fn all_passed(&self) -> bool {
        self.iter().all(|(_, s)| s == CheckStatus::Passed)
    }

    /// Rewrites every `deferred` check to `to_check`. Returns how many
    /// checks changed.
    pub fn convert_deferred_to_to_check(&mut self) -> usize {
        let mut changed = 0;
        for name in CHECK_NAMES {
            if self.get(name) == CheckStatus::Deferred {
                self.set(name, CheckStatus::ToCheck);
                changed += 1;
            }
        }
        changed
    }
}
