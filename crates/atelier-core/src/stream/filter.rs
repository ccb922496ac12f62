// ── Filter predicates for entity snapshots ──
//
// Used by consumers to narrow cached snapshots without re-querying
// the store.

use crate::model::{Client, Connection, EntityId, Instrument, InstrumentStatus, RelationshipType};

/// Filter predicate for instrument collections.
pub enum InstrumentFilter {
    All,
    ByStatus(InstrumentStatus),
    ByMaker(String),
    ByType(String),
    Certified,
    Custom(Box<dyn Fn(&Instrument) -> bool + Send + Sync>),
}

impl InstrumentFilter {
    pub fn matches(&self, instrument: &Instrument) -> bool {
        match self {
            Self::All => true,
            Self::ByStatus(status) => instrument.status == *status,
            Self::ByMaker(maker) => eq_ignore_case(instrument.maker.as_deref(), maker),
            Self::ByType(kind) => eq_ignore_case(instrument.type_.as_deref(), kind),
            Self::Certified => instrument.certificate,
            Self::Custom(f) => f(instrument),
        }
    }
}

/// Filter predicate for client collections.
pub enum ClientFilter {
    All,
    /// Clients carrying this tag (case-insensitive).
    Tagged(String),
    WithEmail,
    Custom(Box<dyn Fn(&Client) -> bool + Send + Sync>),
}

impl ClientFilter {
    pub fn matches(&self, client: &Client) -> bool {
        match self {
            Self::All => true,
            Self::Tagged(tag) => client.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)),
            Self::WithEmail => client.email.as_deref().is_some_and(|e| !e.is_empty()),
            Self::Custom(f) => f(client),
        }
    }
}

/// Filter predicate for connection collections.
pub enum ConnectionFilter {
    All,
    ByClient(EntityId),
    ByInstrument(EntityId),
    ByRelationship(RelationshipType),
    /// Missing either reference.
    Orphaned,
    Custom(Box<dyn Fn(&Connection) -> bool + Send + Sync>),
}

impl ConnectionFilter {
    pub fn matches(&self, connection: &Connection) -> bool {
        match self {
            Self::All => true,
            Self::ByClient(id) => connection.links_client(id),
            Self::ByInstrument(id) => connection.links_instrument(id),
            Self::ByRelationship(kind) => connection.relationship_type == *kind,
            Self::Orphaned => connection.client_id.is_none() || connection.instrument_id.is_none(),
            Self::Custom(f) => f(connection),
        }
    }
}

fn eq_ignore_case(field: Option<&str>, wanted: &str) -> bool {
    field.is_some_and(|f| f.trim().eq_ignore_ascii_case(wanted.trim()))
}
