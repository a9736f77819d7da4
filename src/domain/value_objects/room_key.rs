//! Room keys.
//!
//! A room is a broadcast scope named `"<domain-type>:<domain-id>"`. Only the
//! channel domain type is currently accepted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::composite_id::{CompositeId, EntityKind, IdError};

/// Domain types a room may be scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomKind {
    Channel,
}

impl RoomKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Channel => "channel",
        }
    }

    pub fn parse(s: &str) -> Result<Self, IdError> {
        match s {
            "channel" => Ok(Self::Channel),
            other => Err(IdError::UnknownKind(other.to_string())),
        }
    }
}

/// Key identifying a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoomKey {
    kind: RoomKind,
    id: i64,
}

impl RoomKey {
    pub const fn channel(id: i64) -> Self {
        Self {
            kind: RoomKind::Channel,
            id,
        }
    }

    /// Build a key from the separate `room_type`/`room_id` pair used by the
    /// join and leave commands.
    pub fn from_parts(room_type: &str, room_id: &str) -> Result<Self, IdError> {
        let kind = RoomKind::parse(room_type)?;
        let id = room_id
            .parse::<i64>()
            .map_err(|_| IdError::Malformed(room_id.to_string()))?;
        Ok(Self { kind, id })
    }

    pub fn kind(&self) -> RoomKind {
        self.kind
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    /// The entity the room is scoped to.
    pub fn entity(&self) -> CompositeId {
        match self.kind {
            RoomKind::Channel => CompositeId::new(EntityKind::Channel, self.id),
        }
    }
}

impl FromStr for RoomKey {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| IdError::Malformed(s.to_string()))?;
        Self::from_parts(kind, id)
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.id)
    }
}

impl Serialize for RoomKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RoomKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
