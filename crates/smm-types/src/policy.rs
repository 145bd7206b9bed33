//! Visibility policies: which part of the kitchen an observer can perceive.
//!
//! A policy is a [`VisibilityKind`] plus an integer radius, written
//! compactly as the kind letter followed by the radius: `O20` (see
//! everything within 20 tiles), `D2` (half-plane in front, radius 2),
//! `V4` (90 degree cone, radius 4).

use serde::{Deserialize, Serialize};

use crate::enums::VisibilityKind;
use crate::error::ParseError;

/// A `(kind, radius)` pair determining what an observer can currently see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VisibilityPolicy {
    /// Field-of-view shape.
    pub kind: VisibilityKind,
    /// Maximum Euclidean distance, in tiles.
    pub radius: u32,
}

impl VisibilityPolicy {
    /// Create a policy.
    pub const fn new(kind: VisibilityKind, radius: u32) -> Self {
        Self { kind, radius }
    }

    /// Omnidirectional policy with the given radius.
    pub const fn omni(radius: u32) -> Self {
        Self::new(VisibilityKind::Omni, radius)
    }

    /// Directional (half-plane) policy with the given radius.
    pub const fn directional(radius: u32) -> Self {
        Self::new(VisibilityKind::Directional, radius)
    }

    /// Cone policy with the given radius.
    pub const fn cone(radius: u32) -> Self {
        Self::new(VisibilityKind::Cone, radius)
    }

    /// The radius squared, for comparison against squared distances.
    pub fn squared_radius(self) -> i64 {
        let radius = i64::from(self.radius);
        radius.saturating_mul(radius)
    }
}

impl core::fmt::Display for VisibilityPolicy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}{}", self.kind.letter(), self.radius)
    }
}

impl core::str::FromStr for VisibilityPolicy {
    type Err = ParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::InvalidPolicy {
            text: text.to_owned(),
        };
        let mut chars = text.chars();
        let kind = chars
            .next()
            .and_then(VisibilityKind::from_letter)
            .ok_or_else(invalid)?;
        let digits = chars.as_str();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let radius = digits.parse::<u32>().map_err(|e| ParseError::InvalidPolicy {
            text: format!("{text} ({e})"),
        })?;
        Ok(Self { kind, radius })
    }
}

impl TryFrom<String> for VisibilityPolicy {
    type Error = ParseError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        text.parse()
    }
}

impl From<VisibilityPolicy> for String {
    fn from(policy: VisibilityPolicy) -> Self {
        policy.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_kinds() {
        assert_eq!("O20".parse::<VisibilityPolicy>().ok(), Some(VisibilityPolicy::omni(20)));
        assert_eq!("D2".parse::<VisibilityPolicy>().ok(), Some(VisibilityPolicy::directional(2)));
        assert_eq!("V5".parse::<VisibilityPolicy>().ok(), Some(VisibilityPolicy::cone(5)));
    }

    #[test]
    fn rejects_malformed_policies() {
        for text in ["", "X4", "V", "V-1", "D4.5", "o4", "4"] {
            assert!(text.parse::<VisibilityPolicy>().is_err(), "accepted {text:?}");
        }
    }

    #[test]
    fn display_round_trips() {
        let policy = VisibilityPolicy::cone(4);
        assert_eq!(policy.to_string(), "V4");
        assert_eq!(policy.to_string().parse::<VisibilityPolicy>().ok(), Some(policy));
    }

    #[test]
    fn serde_uses_textual_form() {
        let json = serde_json::to_string(&VisibilityPolicy::directional(2)).ok();
        assert_eq!(json.as_deref(), Some("\"D2\""));
        let parsed: Result<VisibilityPolicy, _> = serde_json::from_str("\"Q3\"");
        assert!(parsed.is_err());
    }
}
