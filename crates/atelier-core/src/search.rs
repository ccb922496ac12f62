// ── Unified search ──
//
// Case-insensitive substring search over a fixed set of text fields
// per kind. Each kind is matched independently.

use std::sync::Arc;

use serde::Serialize;

use crate::model::{Client, Connection, Instrument};
use crate::store::StateSnapshot;

/// Text fields a record exposes to search.
pub trait Searchable {
    fn search_fields(&self) -> Vec<&str>;

    /// `needle` must already be lowercase. An empty needle matches.
    fn matches_needle(&self, needle: &str) -> bool {
        needle.is_empty()
            || self
                .search_fields()
                .iter()
                .any(|field| field.to_lowercase().contains(needle))
    }
}

impl Searchable for Client {
    fn search_fields(&self) -> Vec<&str> {
        [
            self.first_name.as_deref(),
            self.last_name.as_deref(),
            self.email.as_deref(),
            self.client_number.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

impl Searchable for Instrument {
    fn search_fields(&self) -> Vec<&str> {
        [
            self.maker.as_deref(),
            self.type_.as_deref(),
            self.serial_number.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

impl Searchable for Connection {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.relationship_type.as_str()];
        fields.extend(self.notes.as_deref());
        fields
    }
}

/// Matching records of each kind plus the combined count.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    pub clients: Vec<Arc<Client>>,
    pub instruments: Vec<Arc<Instrument>>,
    pub connections: Vec<Arc<Connection>>,
    pub total: usize,
}

fn filter_matching<T: Searchable>(records: &[Arc<T>], needle: &str) -> Vec<Arc<T>> {
    records
        .iter()
        .filter(|r| r.matches_needle(needle))
        .cloned()
        .collect()
}

/// Search a snapshot. The empty query returns every record.
pub fn search_snapshot(state: &StateSnapshot, query: &str) -> SearchResults {
    let needle = query.to_lowercase();
    let clients = filter_matching(&state.clients, &needle);
    let instruments = filter_matching(&state.instruments, &needle);
    let connections = filter_matching(&state.connections, &needle);
    let total = clients.len() + instruments.len() + connections.len();
    SearchResults {
        clients,
        instruments,
        connections,
        total,
    }
}
