//! Type-safe identifier wrappers around a sequential [`u32`].
//!
//! Every entity the belief tracker reasons about has a strongly-typed ID to
//! prevent accidental mixing of identifiers at compile time. Identifiers are
//! sequential rather than random so that replaying the same input always
//! produces the same identity assignment.
//!
//! The textual form carries a one-letter prefix (`O3`, `A0`, `T12`), which is
//! also accepted when parsing, alongside the bare number.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ParseError;

/// Generates a newtype wrapper around [`u32`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident, $prefix:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[serde(transparent)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub u32);

        impl $name {
            /// Prefix letter used by the textual form.
            pub const PREFIX: char = $prefix;

            /// Create an identifier from its numeric index.
            pub const fn new(index: u32) -> Self {
                Self(index)
            }

            /// Return the numeric index.
            pub const fn index(self) -> u32 {
                self.0
            }

            /// The identifier following this one, or `None` once the id
            /// space is exhausted.
            pub const fn next(self) -> Option<Self> {
                match self.0.checked_add(1) {
                    Some(index) => Some(Self(index)),
                    None => None,
                }
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}{}", Self::PREFIX, self.0)
            }
        }

        impl core::str::FromStr for $name {
            type Err = ParseError;

            fn from_str(text: &str) -> Result<Self, Self::Err> {
                let digits = text.trim();
                let digits = digits.strip_prefix(Self::PREFIX).unwrap_or(digits);
                digits
                    .parse::<u32>()
                    .map(Self)
                    .map_err(|e| ParseError::InvalidId {
                        text: text.to_owned(),
                        reason: e.to_string(),
                    })
            }
        }

        impl From<u32> for $name {
            fn from(index: u32) -> Self {
                Self(index)
            }
        }

        impl From<$name> for u32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Stable identifier of an object in a belief store.
    ///
    /// Allocated monotonically and never reused, even after the object has
    /// been retired (made invisible).
    ObjectId, 'O'
}

define_id! {
    /// Identifier of a player in the kitchen (`A0` is the robot, `A1` the
    /// human in the study setup).
    AgentId, 'A'
}

define_id! {
    /// Ephemeral identifier of an observed object, scoped to one snapshot.
    TempId, 'T'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_prefix() {
        assert_eq!(ObjectId::new(3).to_string(), "O3");
        assert_eq!(AgentId::new(0).to_string(), "A0");
        assert_eq!(TempId::new(12).to_string(), "T12");
    }

    #[test]
    fn parse_accepts_prefixed_and_bare() {
        assert_eq!("A1".parse::<AgentId>().ok(), Some(AgentId::new(1)));
        assert_eq!("7".parse::<ObjectId>().ok(), Some(ObjectId::new(7)));
        assert!("B1".parse::<AgentId>().is_err());
        assert!("A".parse::<AgentId>().is_err());
    }

    #[test]
    fn next_stops_at_exhaustion() {
        assert_eq!(ObjectId::new(1).next(), Some(ObjectId::new(2)));
        assert_eq!(ObjectId::new(u32::MAX).next(), None);
    }

    #[test]
    fn id_serializes_as_bare_number() {
        let json = serde_json::to_string(&ObjectId::new(4)).ok();
        assert_eq!(json.as_deref(), Some("4"));
        let restored: Result<ObjectId, _> = serde_json::from_str("4");
        assert_eq!(restored.ok(), Some(ObjectId::new(4)));
    }
}
