// ── Domain model ──
//
// Canonical record types, their create/update payloads, and the
// `Entity` trait that lets the store, repositories, and facade treat
// the three kinds uniformly.

pub mod client;
pub mod connection;
pub mod entity_id;
pub mod instrument;
pub mod relationship;
pub mod validate;

use std::fmt::Debug;

use atelier_api::Sort;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::store::{DataStore, EntityCollection};

pub use client::{Client, ClientPatch, NewClient};
pub use connection::{Connection, ConnectionPatch, NewConnection, RelationshipType};
pub use entity_id::EntityId;
pub use instrument::{Instrument, InstrumentPatch, InstrumentStatus, NewInstrument};
pub use relationship::RelationshipView;
pub use validate::Validate;

// ── EntityKind ──────────────────────────────────────────────────────

/// The three persisted record kinds.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum EntityKind {
    Clients,
    Instruments,
    Connections,
}

impl EntityKind {
    pub const ALL: [Self; 3] = [Self::Clients, Self::Instruments, Self::Connections];

    /// Backing table in the row store.
    pub fn table(self) -> &'static str {
        match self {
            Self::Clients => "clients",
            Self::Instruments => "instruments",
            Self::Connections => "client_instruments",
        }
    }
}

// ── Entity ──────────────────────────────────────────────────────────

/// A record kind the data layer can fetch, cache, and mutate.
pub trait Entity: Debug + Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    const KIND: EntityKind;

    /// Payload for creating a record.
    type New: Serialize + Validate + Send + Sync;
    /// Payload for a partial update.
    type Patch: Serialize + Validate + Send + Sync;

    fn id(&self) -> &EntityId;

    /// Ordering applied when a fetch does not ask for one.
    fn default_order() -> Vec<Sort>;

    /// The collection holding this kind inside a `DataStore`.
    #[doc(hidden)]
    fn collection(store: &DataStore) -> &EntityCollection<Self>;
}

impl Entity for Client {
    const KIND: EntityKind = EntityKind::Clients;
    type New = NewClient;
    type Patch = ClientPatch;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn default_order() -> Vec<Sort> {
        vec![Sort::desc("created_at")]
    }

    fn collection(store: &DataStore) -> &EntityCollection<Self> {
        &store.clients
    }
}

impl Entity for Instrument {
    const KIND: EntityKind = EntityKind::Instruments;
    type New = NewInstrument;
    type Patch = InstrumentPatch;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn default_order() -> Vec<Sort> {
        vec![Sort::desc("created_at")]
    }

    fn collection(store: &DataStore) -> &EntityCollection<Self> {
        &store.instruments
    }
}

impl Entity for Connection {
    const KIND: EntityKind = EntityKind::Connections;
    type New = NewConnection;
    type Patch = ConnectionPatch;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn default_order() -> Vec<Sort> {
        vec![Sort::asc("display_order"), Sort::desc("created_at")]
    }

    fn collection(store: &DataStore) -> &EntityCollection<Self> {
        &store.connections
    }
}
