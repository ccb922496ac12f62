// ── Generic reactive entity collection ──
//
// Ordered storage with O(1) id lookups and push-based change
// notification via `watch` channels.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;
use tokio::sync::watch;

use crate::model::EntityId;

type Snapshot<T> = Arc<Vec<Arc<T>>>;

/// A confirmed write made while a fetch was in flight.
#[derive(Debug)]
pub(crate) enum Overlay<T> {
    Upsert(EntityId, Arc<T>),
    Remove(EntityId),
}

/// A reactive collection for a single entity kind.
///
/// Keeps records in fetch order behind an `IndexMap` and a `watch`
/// channel of snapshots. Every mutation bumps a version counter and
/// rebuilds the snapshot that subscribers receive, so an unchanged
/// collection always hands out the same `Arc`.
pub struct EntityCollection<T: Send + Sync + 'static> {
    by_id: RwLock<IndexMap<EntityId, Arc<T>>>,

    /// Version counter, bumped on every mutation.
    version: watch::Sender<u64>,

    /// Full snapshot, rebuilt on mutation for efficient subscription.
    snapshot: watch::Sender<Snapshot<T>>,

    /// Writes to re-apply over the next fetched page, each tagged with
    /// the newest request id when it was recorded.
    overlay: Mutex<Vec<(u64, Overlay<T>)>>,
}

impl<T: Send + Sync + 'static> EntityCollection<T> {
    pub(crate) fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));

        Self {
            by_id: RwLock::new(IndexMap::new()),
            version,
            snapshot,
            overlay: Mutex::new(Vec::new()),
        }
    }

    /// Replace every record, keeping the given order. Later duplicates
    /// of an id overwrite earlier ones in place.
    pub(crate) fn replace_all(&self, items: impl IntoIterator<Item = (EntityId, T)>) {
        let mut map = self.write();
        map.clear();
        for (id, entity) in items {
            map.insert(id, Arc::new(entity));
        }
        self.publish(&map);
    }

    /// Replace every record with a fetched page, then re-apply the
    /// overlay entries recorded at or after `ticket`. The overlay is
    /// emptied either way.
    pub(crate) fn replace_with_overlay(
        &self,
        items: impl IntoIterator<Item = (EntityId, T)>,
        ticket: u64,
    ) -> usize {
        let pending = std::mem::take(&mut *self.overlay());
        let mut map = self.write();
        map.clear();
        for (id, entity) in items {
            map.insert(id, Arc::new(entity));
        }
        let mut replayed = 0;
        for (_, change) in pending.into_iter().filter(|(tag, _)| *tag >= ticket) {
            match change {
                Overlay::Upsert(id, entity) => {
                    put(&mut map, id, entity);
                }
                Overlay::Remove(id) => {
                    map.shift_remove(&id);
                }
            }
            replayed += 1;
        }
        self.publish(&map);
        replayed
    }

    /// Replace the record with `id` in place, or insert it at the front.
    /// Returns the stored record and whether the id was new.
    pub(crate) fn upsert(&self, id: EntityId, entity: T) -> (Arc<T>, bool) {
        let entity = Arc::new(entity);
        let mut map = self.write();
        let is_new = put(&mut map, id, Arc::clone(&entity));
        self.publish(&map);
        (entity, is_new)
    }

    /// Remember a confirmed write so an in-flight fetch cannot erase it.
    pub(crate) fn record_overlay(&self, ticket: u64, change: Overlay<T>) {
        self.overlay().push((ticket, change));
    }

    pub(crate) fn clear_overlay(&self) {
        self.overlay().clear();
    }

    #[cfg(test)]
    pub(crate) fn overlay_len(&self) -> usize {
        self.overlay().len()
    }

    /// Remove a record by id, preserving the order of the rest.
    pub(crate) fn remove(&self, id: &EntityId) -> Option<Arc<T>> {
        let mut map = self.write();
        let removed = map.shift_remove(id);
        if removed.is_some() {
            self.publish(&map);
        }
        removed
    }

    /// Remove all records and any pending overlay.
    pub(crate) fn clear(&self) {
        self.clear_overlay();
        let mut map = self.write();
        map.clear();
        self.publish(&map);
    }

    /// Look up a record by id.
    pub fn get(&self, id: &EntityId) -> Option<Arc<T>> {
        self.read().get(id).cloned()
    }

    /// Current snapshot (cheap `Arc` clone).
    pub fn snapshot(&self) -> Snapshot<T> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes via a `watch::Receiver`.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot<T>> {
        self.snapshot.subscribe()
    }

    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn read(&self) -> RwLockReadGuard<'_, IndexMap<EntityId, Arc<T>>> {
        self.by_id.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexMap<EntityId, Arc<T>>> {
        self.by_id.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn overlay(&self) -> MutexGuard<'_, Vec<(u64, Overlay<T>)>> {
        self.overlay.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Rebuild the snapshot from the locked map and broadcast it. Runs
    /// while the write guard is held so snapshots follow mutation order.
    fn publish(&self, map: &IndexMap<EntityId, Arc<T>>) {
        let values: Vec<Arc<T>> = map.values().cloned().collect();
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
        self.version.send_modify(|v| *v += 1);
    }
}

/// Replace in place, or insert at the front. True when `id` was new.
fn put<T>(map: &mut IndexMap<EntityId, Arc<T>>, id: EntityId, entity: Arc<T>) -> bool {
    match map.get_mut(&id) {
        Some(slot) => {
            *slot = entity;
            false
        }
        None => {
            map.shift_insert(0, id, entity);
            true
        }
    }
}
