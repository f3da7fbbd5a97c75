//! Compute sizes and the provider-neutral tiers they map to.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The four configurable build-environment sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComputeSize {
    /// Smallest environment.
    Small,
    /// Medium environment.
    Medium,
    /// Large environment.
    Large,
    /// Twice the large environment.
    #[serde(rename = "2xLarge", alias = "X2Large")]
    X2Large,
}

impl ComputeSize {
    /// Parses a configuration tag. Unknown tags yield `None`.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "Small" => Some(Self::Small),
            "Medium" => Some(Self::Medium),
            "Large" => Some(Self::Large),
            "2xLarge" | "X2Large" => Some(Self::X2Large),
            _ => None,
        }
    }
}

impl fmt::Display for ComputeSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Small => write!(f, "Small"),
            Self::Medium => write!(f, "Medium"),
            Self::Large => write!(f, "Large"),
            Self::X2Large => write!(f, "2xLarge"),
        }
    }
}

/// A provider-neutral compute tier token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputeTier {
    /// Let the build-environment provider pick.
    #[default]
    ProviderDefault,
    /// Small tier.
    Small,
    /// Medium tier.
    Medium,
    /// Large tier.
    Large,
    /// Double-large tier.
    X2Large,
}

impl fmt::Display for ComputeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProviderDefault => write!(f, "provider_default"),
            Self::Small => write!(f, "small"),
            Self::Medium => write!(f, "medium"),
            Self::Large => write!(f, "large"),
            Self::X2Large => write!(f, "x2_large"),
        }
    }
}

/// Maps a configured size to a tier. Absent input is the provider default.
#[must_use]
pub const fn map_compute(size: Option<ComputeSize>) -> ComputeTier {
    match size {
        Some(ComputeSize::Small) => ComputeTier::Small,
        Some(ComputeSize::Medium) => ComputeTier::Medium,
        Some(ComputeSize::Large) => ComputeTier::Large,
        Some(ComputeSize::X2Large) => ComputeTier::X2Large,
        None => ComputeTier::ProviderDefault,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_compute_is_total() {
        assert_eq!(map_compute(Some(ComputeSize::Small)), ComputeTier::Small);
        assert_eq!(map_compute(Some(ComputeSize::Medium)), ComputeTier::Medium);
        assert_eq!(map_compute(Some(ComputeSize::Large)), ComputeTier::Large);
        assert_eq!(map_compute(Some(ComputeSize::X2Large)), ComputeTier::X2Large);
        assert_eq!(map_compute(None), ComputeTier::ProviderDefault);
    }

    #[test]
    fn test_from_tag_accepts_alias() {
        assert_eq!(ComputeSize::from_tag("2xLarge"), Some(ComputeSize::X2Large));
        assert_eq!(ComputeSize::from_tag("X2Large"), Some(ComputeSize::X2Large));
        assert_eq!(ComputeSize::from_tag("Huge"), None);
    }

    #[test]
    fn test_compute_size_serde_tag() {
        let json = serde_json::to_value(ComputeSize::X2Large).unwrap();
        assert_eq!(json, serde_json::json!("2xLarge"));
    }
}
