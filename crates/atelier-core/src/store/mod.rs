// ── Reactive data store ──
//
// Ordered entity collections, cache metadata, and change listeners.

mod collection;
mod data_store;
mod meta;
mod observer;

pub use collection::EntityCollection;
pub(crate) use data_store::MutationGuard;
pub use data_store::{DataStore, StateSnapshot};
pub use meta::{CacheMeta, CachePhase, CacheState};
pub use observer::{StoreChange, Subscription};
