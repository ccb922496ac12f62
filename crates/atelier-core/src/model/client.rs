// ── Client domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity_id::EntityId;
use super::validate::{Validate, check_email, check_text};
use crate::convert::lenient;
use crate::error::CoreError;

/// A customer of the workshop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: EntityId,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub contact_number: Option<String>,
    #[serde(default, deserialize_with = "lenient::tags")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub interest: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub client_number: Option<String>,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Client {
    /// "First Last", falling back to whichever half is present.
    pub fn full_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => format!("{first} {last}").trim().to_owned(),
            (Some(name), None) | (None, Some(name)) => name.trim().to_owned(),
            (None, None) => String::new(),
        }
    }
}

// ── Payloads ────────────────────────────────────────────────────────

/// Fields for a new client row. The store assigns `id` and `created_at`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewClient {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_number: Option<String>,
}

/// Partial update for a client. Only `Some` fields are sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_number: Option<String>,
}

impl Validate for NewClient {
    fn validate(&self) -> Result<(), CoreError> {
        let has_name = [&self.first_name, &self.last_name]
            .into_iter()
            .flatten()
            .any(|n| !n.trim().is_empty());
        if !has_name {
            return Err(CoreError::validation(
                "a client needs a first or last name",
            ));
        }
        check_email(self.email.as_deref())
    }
}

impl Validate for ClientPatch {
    fn validate(&self) -> Result<(), CoreError> {
        check_email(self.email.as_deref())?;
        check_text("first_name", self.first_name.as_deref())?;
        check_text("last_name", self.last_name.as_deref())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_sparse_row() {
        let client: Client = serde_json::from_value(json!({
            "id": "c1",
            "first_name": "Jane",
            "tags": "Violinist, Collector",
            "created_at": "2024-05-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(client.full_name(), "Jane");
        assert_eq!(client.tags, vec!["Violinist", "Collector"]);
        assert!(client.email.is_none());
        assert!(client.created_at.is_some());
    }

    #[test]
    fn new_client_requires_a_name() {
        let err = NewClient::default().validate().unwrap_err();
        assert!(matches!(err, CoreError::ValidationFailed { .. }));

        let ok = NewClient {
            last_name: Some("Doe".into()),
            ..NewClient::default()
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn rejects_malformed_email() {
        let input = NewClient {
            first_name: Some("Jane".into()),
            email: Some("jane.example.com".into()),
            ..NewClient::default()
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn patch_serializes_only_set_fields() {
        let patch = ClientPatch {
            email: Some("jane@example.com".into()),
            ..ClientPatch::default()
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({ "email": "jane@example.com" })
        );
    }
}
