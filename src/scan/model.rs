use std::fmt;

use serde::{Deserialize, Serialize};

/// Host reachability as reported by the driver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostStatus {
    Up,
    Down,
    #[default]
    #[serde(other)]
    Unknown,
}

impl HostStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Unknown => "unknown",
        }
    }
}

/// Transport state of a port, following nmap conventions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortState {
    Open,
    Closed,
    Filtered,
    Unfiltered,
    #[serde(rename = "open|filtered")]
    OpenFiltered,
    #[serde(rename = "closed|filtered")]
    ClosedFiltered,
    #[default]
    #[serde(other)]
    Unknown,
}

impl PortState {
    pub fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for PortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Filtered => "filtered",
            Self::Unfiltered => "unfiltered",
            Self::OpenFiltered => "open|filtered",
            Self::ClosedFiltered => "closed|filtered",
            Self::Unknown => "unknown",
        };
        f.write_str(text)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OsGuess {
    pub name: String,
    #[serde(default)]
    pub accuracy: f32,
}

/// Detection depth the driver used for a vulnerability record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VulnerabilityTier {
    Basic,
    Advanced,
    #[default]
    #[serde(other)]
    Unspecified,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Vulnerability {
    pub tier: VulnerabilityTier,
    pub description: String,
    pub recommendations: Vec<String>,
}

/// One port entry carried inside a `host_data` event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostPort {
    pub port: u16,
    pub state: PortState,
    pub service: String,
    pub version: Option<String>,
    pub vulnerability: Option<Vulnerability>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AccessTier {
    Restricted,
    Full,
}

impl AccessTier {
    pub fn from_pro_flag(is_pro: bool) -> Self {
        if is_pro { Self::Full } else { Self::Restricted }
    }
}

/// Decides which access tier a stored record is rendered with.
///
/// Applied at render time only so a tier change shows up on the next
/// projection without touching stored annotations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TierPolicy {
    /// Trust the `is_pro` flag the driver attached to each record.
    #[default]
    FromDriver,
    Fixed(AccessTier),
}

impl TierPolicy {
    pub fn effective(self, record_tier: AccessTier) -> AccessTier {
        match self {
            Self::FromDriver => record_tier,
            Self::Fixed(tier) => tier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_wire_strings_fall_back() {
        let status: HostStatus = serde_json::from_str("\"sleeping\"").unwrap();
        assert_eq!(status, HostStatus::Unknown);

        let state: PortState = serde_json::from_str("\"open|filtered\"").unwrap();
        assert_eq!(state, PortState::OpenFiltered);
        let state: PortState = serde_json::from_str("\"weird\"").unwrap();
        assert_eq!(state, PortState::Unknown);
    }

    #[test]
    fn fixed_policy_overrides_record_flag() {
        assert_eq!(
            TierPolicy::FromDriver.effective(AccessTier::Restricted),
            AccessTier::Restricted
        );
        assert_eq!(
            TierPolicy::Fixed(AccessTier::Full).effective(AccessTier::Restricted),
            AccessTier::Full
        );
        assert_eq!(
            TierPolicy::Fixed(AccessTier::Restricted).effective(AccessTier::Full),
            AccessTier::Restricted
        );
    }
}
