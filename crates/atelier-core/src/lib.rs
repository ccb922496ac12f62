//! Unified data layer between `atelier-api` and its consumers.
//!
//! This crate owns the domain model, the client-side cache, and the
//! relationship logic for the atelier workspace:
//!
//! - **[`Hub`]**: central facade. Cached reads, fetch deduplication
//!   ([`ensure_loaded`](Hub::ensure_loaded)) with a per-kind stale-response
//!   guard, derived [`RelationshipView`]s memoized on snapshot identity,
//!   unified [`search_all`](Hub::search_all), cache invalidation, and
//!   mutations that update the cache only after the remote confirms them.
//!
//! - **[`DataStore`]**: single holder of the client, instrument, and
//!   connection collections plus per-kind [`CacheMeta`]. Mutations are
//!   pushed to `watch` subscribers ([`EntityStream`]) and to callback
//!   listeners ([`DataStore::subscribe`]).
//!
//! - **[`Repository`]**: typed CRUD for one kind over any
//!   [`atelier_api::RemoteStore`].
//!
//! - **Domain model** ([`model`]): `Client`, `Instrument`, `Connection`,
//!   their create/update payloads, and [`EntityId`].

pub mod config;
mod convert;
pub mod error;
pub mod hub;
pub mod model;
pub mod relationships;
pub mod repository;
pub mod search;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{StoreConfig, TlsVerification};
pub use error::CoreError;
pub use hub::{FetchOutcome, Hub};
pub use relationships::derive_relationships;
pub use repository::{
    ClientRepository, ConnectionRepository, FetchOptions, InstrumentRepository, Page, Repository,
};
pub use search::{SearchResults, Searchable};
pub use store::{
    CacheMeta, CachePhase, CacheState, DataStore, StateSnapshot, StoreChange, Subscription,
};
pub use stream::{ClientFilter, ConnectionFilter, EntityStream, InstrumentFilter};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Client, ClientPatch, Connection, ConnectionPatch, Entity, EntityId, EntityKind, Instrument,
    InstrumentPatch, InstrumentStatus, NewClient, NewConnection, NewInstrument, RelationshipType,
    RelationshipView, Validate,
};
