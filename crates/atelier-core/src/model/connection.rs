// ── Connection domain types ──
//
// A connection relates one client to one instrument. It references both
// by id and owns neither; either side may be missing (orphaned row).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity_id::EntityId;
use super::validate::Validate;
use crate::convert::lenient;
use crate::error::CoreError;

/// How a client relates to an instrument.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RelationshipType {
    #[default]
    Interested,
    Booked,
    Sold,
    Owned,
    Other(String),
}

impl RelationshipType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Interested => "Interested",
            Self::Booked => "Booked",
            Self::Sold => "Sold",
            Self::Owned => "Owned",
            Self::Other(s) => s,
        }
    }

    /// `Owned` and `Sold` both mean the client holds the instrument.
    pub fn is_ownership(&self) -> bool {
        matches!(self, Self::Owned | Self::Sold)
    }
}

impl From<String> for RelationshipType {
    fn from(raw: String) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "interested" => Self::Interested,
            "booked" => Self::Booked,
            "sold" => Self::Sold,
            "owned" => Self::Owned,
            _ => Self::Other(raw),
        }
    }
}

impl From<RelationshipType> for String {
    fn from(kind: RelationshipType) -> Self {
        match kind {
            RelationshipType::Other(s) => s,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Join record between a client and an instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: EntityId,
    #[serde(default)]
    pub client_id: Option<EntityId>,
    #[serde(default)]
    pub instrument_id: Option<EntityId>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub relationship_type: RelationshipType,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub display_order: i64,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Connection {
    pub fn links_client(&self, id: &EntityId) -> bool {
        self.client_id.as_ref() == Some(id)
    }

    pub fn links_instrument(&self, id: &EntityId) -> bool {
        self.instrument_id.as_ref() == Some(id)
    }
}

// ── Payloads ────────────────────────────────────────────────────────

/// Fields for a new connection row.
///
/// When `display_order` is `None` the connection is placed after the
/// client's existing connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewConnection {
    pub client_id: EntityId,
    pub instrument_id: EntityId,
    pub relationship_type: RelationshipType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i64>,
}

/// Partial update for a connection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instrument_id: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship_type: Option<RelationshipType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i64>,
}

fn check_reference(field: &str, id: &EntityId) -> Result<(), CoreError> {
    match id {
        EntityId::Text(s) if s.trim().is_empty() => {
            Err(CoreError::validation(format!("a connection needs a {field}")))
        }
        _ => Ok(()),
    }
}

impl Validate for NewConnection {
    fn validate(&self) -> Result<(), CoreError> {
        check_reference("client_id", &self.client_id)?;
        check_reference("instrument_id", &self.instrument_id)
    }
}

impl Validate for ConnectionPatch {
    fn validate(&self) -> Result<(), CoreError> {
        if let Some(id) = &self.client_id {
            check_reference("client_id", id)?;
        }
        if let Some(id) = &self.instrument_id {
            check_reference("instrument_id", id)?;
        }
        Ok(())
    }
}
