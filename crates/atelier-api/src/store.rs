// ── Row-store contract ──
//
// The narrow surface the data layer consumes. Every backend (hosted
// PostgREST, in-memory, test doubles) implements this trait.

use async_trait::async_trait;
use serde_json::Value;

use crate::Error;
use crate::query::{Query, Rows};

/// An asynchronous table-scoped row store.
///
/// Rows travel as JSON objects; typing happens one layer up in the
/// repositories. Every call reports failure through `Err`, never by panicking.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Read rows matching `query` from `table`.
    async fn fetch(&self, table: &str, query: &Query) -> Result<Rows, Error>;

    /// Insert one row and return it as stored (server-assigned `id`, `created_at`).
    async fn insert(&self, table: &str, row: Value) -> Result<Value, Error>;

    /// Apply a partial update to the row with `id` and return the updated row.
    async fn update(&self, table: &str, id: &str, patch: Value) -> Result<Value, Error>;

    /// Delete the row with `id`.
    async fn delete(&self, table: &str, id: &str) -> Result<(), Error>;
}
