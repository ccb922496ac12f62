// ── Record identity ──
//
// Every persisted record carries a server-assigned id. Hosted projects
// hand out UUIDs; seeded or imported rows may use arbitrary text keys.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Canonical identifier for any stored record.
///
/// UUID-shaped strings are parsed (and so compare case-insensitively);
/// anything else is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Uuid(Uuid),
    Text(String),
}

impl EntityId {
    pub fn as_uuid(&self) -> Option<&Uuid> {
        match self {
            Self::Uuid(u) => Some(u),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uuid(u) => write!(f, "{u}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl FromStr for EntityId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_owned()))
    }
}

impl From<Uuid> for EntityId {
    fn from(u: Uuid) -> Self {
        Self::Uuid(u)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        match Uuid::parse_str(&s) {
            Ok(u) => Self::Uuid(u),
            Err(_) => Self::Text(s),
        }
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self::from(s.to_owned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_from_uuid_string() {
        let id = EntityId::from("550e8400-e29b-41d4-a716-446655440000".to_owned());
        assert!(id.as_uuid().is_some());
    }

    #[test]
    fn uuid_ids_compare_case_insensitively() {
        let lower = EntityId::from("550e8400-e29b-41d4-a716-446655440000");
        let upper = EntityId::from("550E8400-E29B-41D4-A716-446655440000");
        assert_eq!(lower, upper);
        assert_eq!(upper.to_string(), "550e8400-e29b-41d4-a716-446655440000");
    }

    #[test]
    fn text_ids_are_kept_verbatim() {
        let id: EntityId = "c1".parse().unwrap();
        assert_eq!(id, EntityId::Text("c1".into()));
        assert_eq!(id.to_string(), "c1");
    }

    #[test]
    fn deserializes_from_plain_json_string() {
        let id: EntityId = serde_json::from_str("\"x1\"").unwrap();
        assert_eq!(id, EntityId::from("x1"));
        let id: EntityId =
            serde_json::from_str("\"550e8400-e29b-41d4-a716-446655440000\"").unwrap();
        assert!(id.as_uuid().is_some());
    }
}
