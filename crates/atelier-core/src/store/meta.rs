// ── Per-kind cache metadata ──

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::EntityKind;

/// Loading state and freshness of one entity kind.
///
/// `last_updated` is set only by a successful fetch and cleared by
/// invalidation, so `None` always means "refetch on next access".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheMeta {
    pub loading: bool,
    pub submitting: bool,
    pub last_updated: Option<DateTime<Utc>>,
    pub error: Option<String>,
    /// Id of the most recently issued fetch for this kind.
    #[serde(skip)]
    pub(crate) latest_request: u64,
    #[serde(skip)]
    pub(crate) pending_mutations: u32,
}

/// Where a kind sits in its fetch lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CachePhase {
    /// Nothing fetched yet (or the last fetch failed with nothing cached).
    Empty,
    /// A fetch is in flight; cached records stay readable.
    Loading,
    /// Fetched successfully and not invalidated since.
    Populated,
    /// Records are visible but stale; the next access refetches.
    Invalidated,
}

impl CacheMeta {
    /// True when an access should start a fetch: nothing is in flight
    /// and the kind is either empty or not known to be fresh.
    pub fn needs_fetch(&self, is_empty: bool) -> bool {
        !self.loading && (is_empty || self.last_updated.is_none())
    }

    pub fn phase(&self, is_empty: bool) -> CachePhase {
        if self.loading {
            CachePhase::Loading
        } else if self.last_updated.is_some() {
            CachePhase::Populated
        } else if is_empty {
            CachePhase::Empty
        } else {
            CachePhase::Invalidated
        }
    }

    /// Back to the initial state, keeping the request counter moving so
    /// fetches issued before the reset are treated as stale.
    pub(crate) fn reset(&mut self) {
        *self = Self {
            latest_request: self.latest_request + 1,
            pending_mutations: self.pending_mutations,
            ..Self::default()
        };
    }
}

/// Metadata for all three kinds, published as one `watch` value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheState {
    pub clients: CacheMeta,
    pub instruments: CacheMeta,
    pub connections: CacheMeta,
}

impl CacheState {
    pub fn get(&self, kind: EntityKind) -> &CacheMeta {
        match kind {
            EntityKind::Clients => &self.clients,
            EntityKind::Instruments => &self.instruments,
            EntityKind::Connections => &self.connections,
        }
    }

    pub(crate) fn get_mut(&mut self, kind: EntityKind) -> &mut CacheMeta {
        match kind {
            EntityKind::Clients => &mut self.clients,
            EntityKind::Instruments => &mut self.instruments,
            EntityKind::Connections => &mut self.connections,
        }
    }
}
