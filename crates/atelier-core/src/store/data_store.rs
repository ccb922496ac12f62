// ── Unified state store ──
//
// Single authoritative holder of the three collections and their cache
// metadata. No method performs I/O; repositories fetch and the facade
// feeds results in. Every mutation is broadcast to `watch` subscribers
// and to registered listeners.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::debug;

use super::collection::{EntityCollection, Overlay};
use super::meta::{CacheMeta, CachePhase, CacheState};
use super::observer::{ListenerRegistry, StoreChange, Subscription};
use crate::model::{Client, Connection, Entity, EntityId, EntityKind, Instrument};
use crate::stream::EntityStream;

/// Point-in-time view of the whole store.
///
/// Collections are shared snapshots; holding one never blocks writers.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    pub clients: Arc<Vec<Arc<Client>>>,
    pub instruments: Arc<Vec<Arc<Instrument>>>,
    pub connections: Arc<Vec<Arc<Connection>>>,
    pub meta: CacheState,
}

/// Central reactive store for clients, instruments, and connections.
///
/// Collections sit behind short-lived `RwLock`s; cache metadata lives in
/// one `watch` channel whose lock also serializes the fetch bookkeeping
/// (dedup check, request ids, stale-response guard).
pub struct DataStore {
    pub(crate) clients: EntityCollection<Client>,
    pub(crate) instruments: EntityCollection<Instrument>,
    pub(crate) connections: EntityCollection<Connection>,
    meta: watch::Sender<CacheState>,
    listeners: Arc<ListenerRegistry>,
    /// Bumped by `reset()`; mutations started in an older epoch are not applied.
    epoch: AtomicU64,
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DataStore {
    pub fn new() -> Self {
        let (meta, _) = watch::channel(CacheState::default());

        Self {
            clients: EntityCollection::new(),
            instruments: EntityCollection::new(),
            connections: EntityCollection::new(),
            meta,
            listeners: Arc::new(ListenerRegistry::default()),
            epoch: AtomicU64::new(0),
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Current snapshot of every collection plus metadata.
    pub fn state(&self) -> StateSnapshot {
        StateSnapshot {
            clients: self.clients.snapshot(),
            instruments: self.instruments.snapshot(),
            connections: self.connections.snapshot(),
            meta: self.meta.borrow().clone(),
        }
    }

    pub fn snapshot<T: Entity>(&self) -> Arc<Vec<Arc<T>>> {
        T::collection(self).snapshot()
    }

    pub fn get<T: Entity>(&self, id: &EntityId) -> Option<Arc<T>> {
        T::collection(self).get(id)
    }

    pub fn clients_snapshot(&self) -> Arc<Vec<Arc<Client>>> {
        self.clients.snapshot()
    }

    pub fn instruments_snapshot(&self) -> Arc<Vec<Arc<Instrument>>> {
        self.instruments.snapshot()
    }

    pub fn connections_snapshot(&self) -> Arc<Vec<Arc<Connection>>> {
        self.connections.snapshot()
    }

    pub fn meta(&self, kind: EntityKind) -> CacheMeta {
        self.meta.borrow().get(kind).clone()
    }

    pub fn phase(&self, kind: EntityKind) -> CachePhase {
        let empty = self.is_kind_empty(kind);
        self.meta.borrow().get(kind).phase(empty)
    }

    pub fn len(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Clients => self.clients.len(),
            EntityKind::Instruments => self.instruments.len(),
            EntityKind::Connections => self.connections.len(),
        }
    }

    fn is_kind_empty(&self, kind: EntityKind) -> bool {
        self.len(kind) == 0
    }

    // ── Entity mutations ─────────────────────────────────────────────

    /// Replace the full collection for `T`, mark it fresh, and clear its
    /// loading flag and error.
    pub fn set_entities<T: Entity>(&self, records: Vec<T>) {
        let count = records.len();
        let collection = T::collection(self);
        collection.replace_all(records.into_iter().map(|r| (r.id().clone(), r)));
        collection.clear_overlay();
        self.meta.send_modify(|state| {
            let meta = state.get_mut(T::KIND);
            meta.loading = false;
            meta.error = None;
            meta.last_updated = Some(Utc::now());
        });
        self.listeners.notify(&StoreChange::Replaced {
            kind: T::KIND,
            count,
        });
    }

    /// Replace the record with the same id, or insert it at the front.
    /// Returns `true` when the id was new.
    pub fn upsert_entity<T: Entity>(&self, record: T) -> bool {
        self.upsert_shared(record).1
    }

    pub(crate) fn upsert_shared<T: Entity>(&self, record: T) -> (Arc<T>, bool) {
        let id = record.id().clone();
        let collection = T::collection(self);
        // Holding the meta read lock keeps a landing fetch from slipping
        // between the write and its overlay entry.
        let state = self.meta.borrow();
        let meta = state.get(T::KIND);
        let (stored, created) = collection.upsert(id.clone(), record);
        if meta.loading {
            collection.record_overlay(
                meta.latest_request,
                Overlay::Upsert(id.clone(), Arc::clone(&stored)),
            );
        }
        drop(state);
        self.listeners.notify(&StoreChange::Upserted {
            kind: T::KIND,
            id,
            created,
        });
        (stored, created)
    }

    /// Remove the record with `id`, returning it if it was present.
    pub fn remove_entity<T: Entity>(&self, id: &EntityId) -> Option<Arc<T>> {
        let collection = T::collection(self);
        let state = self.meta.borrow();
        let meta = state.get(T::KIND);
        let removed = collection.remove(id);
        if meta.loading {
            collection.record_overlay(meta.latest_request, Overlay::Remove(id.clone()));
        }
        drop(state);
        if removed.is_some() {
            self.listeners.notify(&StoreChange::Removed {
                kind: T::KIND,
                id: id.clone(),
            });
        }
        removed
    }

    // ── Flag setters ─────────────────────────────────────────────────

    pub fn set_loading(&self, kind: EntityKind, loading: bool) {
        self.update_meta(kind, |meta| meta.loading = loading);
    }

    pub fn set_submitting(&self, kind: EntityKind, submitting: bool) {
        self.update_meta(kind, |meta| meta.submitting = submitting);
    }

    pub fn set_error(&self, kind: EntityKind, error: Option<String>) {
        self.update_meta(kind, |meta| meta.error = error);
    }

    fn update_meta(&self, kind: EntityKind, apply: impl FnOnce(&mut CacheMeta)) {
        let changed = self.meta.send_if_modified(|state| {
            let meta = state.get_mut(kind);
            let before = meta.clone();
            apply(meta);
            *meta != before
        });
        if changed {
            self.listeners.notify(&StoreChange::Meta { kind });
        }
    }

    // ── Cache control ────────────────────────────────────────────────

    /// Mark `kind` stale without touching its records. Idempotent.
    pub fn invalidate(&self, kind: EntityKind) {
        let changed = self.meta.send_if_modified(|state| {
            state.get_mut(kind).last_updated.take().is_some()
        });
        if changed {
            debug!(%kind, "cache invalidated");
            self.listeners.notify(&StoreChange::Invalidated { kind });
        }
    }

    /// Clear every collection, flag, timestamp, and error.
    ///
    /// Fetches and mutations still in flight are discarded when they
    /// complete.
    pub fn reset(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.meta.send_modify(|state| {
            for kind in EntityKind::ALL {
                state.get_mut(kind).reset();
            }
        });
        self.clients.clear();
        self.instruments.clear();
        self.connections.clear();
        debug!("store reset");
        self.listeners.notify(&StoreChange::Reset);
    }

    // ── Subscriptions ────────────────────────────────────────────────

    /// Register a callback invoked after every mutation. Dropping the
    /// returned handle unsubscribes.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&StoreChange) + Send + Sync + 'static,
    {
        self.listeners.register(Arc::new(listener))
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn stream<T: Entity>(&self) -> EntityStream<T> {
        EntityStream::new(T::collection(self).subscribe())
    }

    pub fn subscribe_clients(&self) -> EntityStream<Client> {
        self.stream()
    }

    pub fn subscribe_instruments(&self) -> EntityStream<Instrument> {
        self.stream()
    }

    pub fn subscribe_connections(&self) -> EntityStream<Connection> {
        self.stream()
    }

    /// Watch cache metadata for all kinds.
    pub fn watch_meta(&self) -> watch::Receiver<CacheState> {
        self.meta.subscribe()
    }

    // ── Fetch bookkeeping (facade only) ──────────────────────────────

    /// Claim a fetch for `kind`. Without `force`, succeeds only when the
    /// kind needs one. The check, the new request id, and `loading = true`
    /// happen under one lock, so concurrent callers cannot both win.
    pub(crate) fn begin_fetch(&self, kind: EntityKind, force: bool) -> Option<u64> {
        let mut ticket = None;
        self.meta.send_if_modified(|state| {
            let meta = state.get_mut(kind);
            if !force && !meta.needs_fetch(self.is_kind_empty(kind)) {
                return false;
            }
            meta.latest_request += 1;
            meta.loading = true;
            ticket = Some(meta.latest_request);
            true
        });
        if ticket.is_some() {
            self.listeners.notify(&StoreChange::Meta { kind });
        }
        ticket
    }

    /// [`begin_fetch`](Self::begin_fetch) wrapped in a guard that
    /// abandons the request if it is dropped unsettled.
    pub(crate) fn claim_fetch(&self, kind: EntityKind, force: bool) -> Option<FetchClaim<'_>> {
        self.begin_fetch(kind, force).map(|ticket| FetchClaim {
            store: self,
            kind,
            ticket,
            settled: false,
        })
    }

    /// Apply a successful fetch if `ticket` is still the latest request
    /// for `T`. Returns `false` (and changes nothing) for a stale ticket.
    pub(crate) fn complete_fetch<T: Entity>(&self, ticket: u64, records: Vec<T>) -> bool {
        let count = records.len();
        let applied = self.meta.send_if_modified(|state| {
            let meta = state.get_mut(T::KIND);
            if meta.latest_request != ticket {
                return false;
            }
            let replayed = T::collection(self)
                .replace_with_overlay(records.into_iter().map(|r| (r.id().clone(), r)), ticket);
            if replayed > 0 {
                debug!(kind = %T::KIND, replayed, "kept writes confirmed during fetch");
            }
            meta.loading = false;
            meta.error = None;
            meta.last_updated = Some(Utc::now());
            true
        });
        if applied {
            self.listeners.notify(&StoreChange::Replaced {
                kind: T::KIND,
                count,
            });
        }
        applied
    }

    /// Record a failed fetch if `ticket` is still the latest. Records and
    /// `last_updated` are left as they were.
    pub(crate) fn fail_fetch(&self, kind: EntityKind, ticket: u64, error: String) -> bool {
        let applied = self.meta.send_if_modified(|state| {
            let meta = state.get_mut(kind);
            if meta.latest_request != ticket {
                return false;
            }
            meta.loading = false;
            meta.error = Some(error);
            self.clear_overlay(kind);
            true
        });
        if applied {
            self.listeners.notify(&StoreChange::Meta { kind });
        }
        applied
    }

    /// Settle a fetch whose future was dropped before it finished. Only
    /// the latest unsettled request clears `loading`; the cancellation is
    /// recorded as the kind's error.
    pub(crate) fn abandon_fetch(&self, kind: EntityKind, ticket: u64) -> bool {
        let applied = self.meta.send_if_modified(|state| {
            let meta = state.get_mut(kind);
            if meta.latest_request != ticket || !meta.loading {
                return false;
            }
            meta.loading = false;
            meta.error = Some(FETCH_CANCELLED.to_owned());
            self.clear_overlay(kind);
            true
        });
        if applied {
            debug!(%kind, ticket, "fetch dropped before completion");
            self.listeners.notify(&StoreChange::Meta { kind });
        }
        applied
    }

    fn clear_overlay(&self, kind: EntityKind) {
        match kind {
            EntityKind::Clients => self.clients.clear_overlay(),
            EntityKind::Instruments => self.instruments.clear_overlay(),
            EntityKind::Connections => self.connections.clear_overlay(),
        }
    }

    // ── Mutation bookkeeping (facade only) ───────────────────────────

    /// Raise `submitting` for `kind` until the guard drops.
    pub(crate) fn begin_mutation(&self, kind: EntityKind) -> MutationGuard<'_> {
        self.update_meta(kind, |meta| {
            meta.pending_mutations += 1;
            meta.submitting = true;
        });
        MutationGuard {
            store: self,
            kind,
            epoch: self.epoch.load(Ordering::Acquire),
        }
    }

    pub(crate) fn last_updated(&self, kind: EntityKind) -> Option<DateTime<Utc>> {
        self.meta.borrow().get(kind).last_updated
    }
}

/// Error recorded when a fetch future is dropped mid-flight.
pub(crate) const FETCH_CANCELLED: &str = "fetch cancelled before completion";

/// One claimed fetch. Dropping it before [`settle`](Self::settle) clears
/// `loading` so the kind is fetched again on next access.
pub(crate) struct FetchClaim<'a> {
    store: &'a DataStore,
    kind: EntityKind,
    ticket: u64,
    settled: bool,
}

impl FetchClaim<'_> {
    pub(crate) fn ticket(&self) -> u64 {
        self.ticket
    }

    /// The response arrived; completion is now up to the caller.
    pub(crate) fn settle(&mut self) {
        self.settled = true;
    }
}

impl Drop for FetchClaim<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.store.abandon_fetch(self.kind, self.ticket);
        }
    }
}

/// Holds `submitting` up for one in-flight mutation.
pub(crate) struct MutationGuard<'a> {
    store: &'a DataStore,
    kind: EntityKind,
    epoch: u64,
}

impl MutationGuard<'_> {
    /// False once the store has been reset since the mutation started.
    pub(crate) fn is_current(&self) -> bool {
        self.store.epoch.load(Ordering::Acquire) == self.epoch
    }
}

impl Drop for MutationGuard<'_> {
    fn drop(&mut self) {
        self.store.update_meta(self.kind, |meta| {
            meta.pending_mutations = meta.pending_mutations.saturating_sub(1);
            meta.submitting = meta.pending_mutations > 0;
        });
    }
}
