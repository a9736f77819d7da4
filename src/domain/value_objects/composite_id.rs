//! Composite entity ids.
//!
//! Every cross-entity reference on the wire is a string `"<kind>:<raw>"`,
//! e.g. `"category:1234"`. Parsing happens once, here, into a typed
//! [`CompositeId`]; handlers then ask for the kind they expect.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Entity kinds that may appear as the prefix of a composite id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Category,
    Channel,
    Message,
    Role,
    Room,
    User,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Channel => "channel",
            Self::Message => "message",
            Self::Role => "role",
            Self::Room => "room",
            Self::User => "user",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "category" => Some(Self::Category),
            "channel" => Some(Self::Channel),
            "message" => Some(Self::Message),
            "role" => Some(Self::Role),
            "room" => Some(Self::Room),
            "user" => Some(Self::User),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons a composite id is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("Malformed id: {0}")]
    Malformed(String),

    #[error("Unknown id type: {0}")]
    UnknownKind(String),

    #[error("Invalid {expected} id: got a {found} id")]
    WrongKind { expected: EntityKind, found: EntityKind },
}

/// A typed `"<kind>:<raw>"` reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompositeId {
    kind: EntityKind,
    raw: i64,
}

impl CompositeId {
    pub const fn new(kind: EntityKind, raw: i64) -> Self {
        Self { kind, raw }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn raw(&self) -> i64 {
        self.raw
    }

    /// Parse `s` and require it to be of `expected` kind, returning the raw id.
    pub fn expect(s: &str, expected: EntityKind) -> Result<i64, IdError> {
        let id: CompositeId = s.parse()?;
        if id.kind != expected {
            return Err(IdError::WrongKind {
                expected,
                found: id.kind,
            });
        }
        Ok(id.raw)
    }

    /// Format a raw id of the given kind without building the struct.
    pub fn format(kind: EntityKind, raw: i64) -> String {
        Self::new(kind, raw).to_string()
    }
}

impl FromStr for CompositeId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, raw) = s
            .split_once(':')
            .ok_or_else(|| IdError::Malformed(s.to_string()))?;
        let kind = EntityKind::parse(kind).ok_or_else(|| IdError::UnknownKind(kind.to_string()))?;
        let raw = raw
            .parse::<i64>()
            .map_err(|_| IdError::Malformed(s.to_string()))?;
        Ok(Self { kind, raw })
    }
}

impl fmt::Display for CompositeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.raw)
    }
}

impl Serialize for CompositeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CompositeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("category:42", EntityKind::Category, 42 ; "category")]
    #[test_case("channel:7", EntityKind::Channel, 7 ; "channel")]
    #[test_case("message:1", EntityKind::Message, 1 ; "message")]
    #[test_case("user:99", EntityKind::User, 99 ; "user")]
    fn test_parse_valid(input: &str, kind: EntityKind, raw: i64) {
        let id: CompositeId = input.parse().unwrap();
        assert_eq!(id.kind(), kind);
        assert_eq!(id.raw(), raw);
        assert_eq!(id.to_string(), input);
    }

    #[test_case("category" ; "no separator")]
    #[test_case("category:" ; "empty raw")]
    #[test_case("category:abc" ; "non numeric raw")]
    #[test_case(":12" ; "empty kind")]
    fn test_parse_rejects(input: &str) {
        assert!(input.parse::<CompositeId>().is_err());
    }

    #[test]
    fn test_expect_wrong_kind() {
        let err = CompositeId::expect("channel:5", EntityKind::Category).unwrap_err();
        assert_eq!(
            err,
            IdError::WrongKind {
                expected: EntityKind::Category,
                found: EntityKind::Channel
            }
        );
    }

    #[test]
    fn test_serde_as_string() {
        let id = CompositeId::new(EntityKind::Channel, 10);
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"channel:10\"");
        let back: CompositeId = serde_json::from_str("\"channel:10\"").unwrap();
        assert_eq!(back, id);
    }
}
