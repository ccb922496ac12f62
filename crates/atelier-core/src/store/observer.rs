// ── Change listeners ──
//
// Callback registry for consumers that are not async (renderers,
// loggers). Listeners run after each store mutation, outside any lock.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use crate::model::{EntityId, EntityKind};

/// What changed in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    /// A kind's collection was replaced wholesale (fetch or `set_entities`).
    Replaced { kind: EntityKind, count: usize },
    Upserted {
        kind: EntityKind,
        id: EntityId,
        created: bool,
    },
    Removed { kind: EntityKind, id: EntityId },
    /// Loading, submitting, or error flags changed.
    Meta { kind: EntityKind },
    Invalidated { kind: EntityKind },
    Reset,
}

impl StoreChange {
    /// The kind affected, or `None` for a full reset.
    pub fn kind(&self) -> Option<EntityKind> {
        match self {
            Self::Replaced { kind, .. }
            | Self::Upserted { kind, .. }
            | Self::Removed { kind, .. }
            | Self::Meta { kind }
            | Self::Invalidated { kind } => Some(*kind),
            Self::Reset => None,
        }
    }
}

type Listener = Arc<dyn Fn(&StoreChange) + Send + Sync>;

#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: Mutex<BTreeMap<u64, Listener>>,
}

impl ListenerRegistry {
    pub(crate) fn register(self: &Arc<Self>, listener: Listener) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().insert(id, listener);
        Subscription {
            id,
            registry: Arc::downgrade(self),
        }
    }

    /// Call every listener with `change`. The registry lock is released
    /// first, so a listener may subscribe or unsubscribe.
    pub(crate) fn notify(&self, change: &StoreChange) {
        let listeners: Vec<Listener> = self.lock().values().cloned().collect();
        for listener in listeners {
            listener(change);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<u64, Listener>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle for a registered listener. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    id: u64,
    registry: Weak<ListenerRegistry>,
}

impl Subscription {
    /// Explicitly stop receiving changes (same as dropping the handle).
    pub fn unsubscribe(self) {}
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.lock().remove(&self.id);
        }
    }
}
