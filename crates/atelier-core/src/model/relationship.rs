// ── Derived relationship views ──

use std::sync::Arc;

use serde::Serialize;

use super::{Client, Connection, Instrument};

/// A connection joined to the client and instrument it references.
///
/// Only built when both referenced records are present in the store.
#[derive(Debug, Clone, Serialize)]
pub struct RelationshipView {
    pub connection: Arc<Connection>,
    pub client: Arc<Client>,
    pub instrument: Arc<Instrument>,
}
