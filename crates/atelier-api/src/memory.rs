// ── In-process row store ──
//
// A `RemoteStore` backed by plain vectors of JSON rows. Assigns `id` and
// `created_at` the way the hosted backend does, so repositories see the
// same row shapes. Used for offline runs and as a test backend.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::query::{Query, Rows};
use crate::store::RemoteStore;
use crate::Error;

/// Thread-safe in-memory row store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a table with pre-built rows (ids and timestamps taken as given).
    pub fn with_rows(self, table: &str, rows: Vec<Value>) -> Self {
        self.lock().insert(table.to_owned(), rows);
        self
    }

    /// Copy of every row currently in `table`.
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.lock().get(table).cloned().unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<Value>>> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn row_id(row: &Value) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

fn not_an_object(table: &str) -> Error {
    Error::Store {
        message: format!("row for '{table}' must be a JSON object"),
        code: Some("PGRST102".into()),
        status: Some(400),
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn fetch(&self, table: &str, query: &Query) -> Result<Rows, Error> {
        let tables = self.lock();
        let rows = tables.get(table).map_or(&[][..], Vec::as_slice);
        let (data, total) = query.apply(rows);
        debug!(table, returned = data.len(), total, "memory fetch");
        Ok(Rows {
            data,
            count: query.count.then_some(total),
        })
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, Error> {
        let Value::Object(mut obj) = row else {
            return Err(not_an_object(table));
        };
        obj.entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        obj.entry("created_at")
            .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));
        let row = Value::Object(obj);

        let mut tables = self.lock();
        let rows = tables.entry(table.to_owned()).or_default();
        if let Some(id) = row_id(&row) {
            if rows.iter().any(|r| row_id(r) == Some(id)) {
                return Err(Error::Store {
                    message: format!("duplicate key value violates unique constraint \"{table}_pkey\""),
                    code: Some("23505".into()),
                    status: Some(409),
                });
            }
        }
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: &str, id: &str, patch: Value) -> Result<Value, Error> {
        let Value::Object(patch) = patch else {
            return Err(not_an_object(table));
        };
        let mut tables = self.lock();
        let existing = tables
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|r| row_id(r) == Some(id)))
            .ok_or_else(|| Error::NotFound {
                table: table.to_owned(),
                id: id.to_owned(),
            })?;

        if let Value::Object(obj) = existing {
            for (k, v) in patch {
                if k != "id" {
                    obj.insert(k, v);
                }
            }
        }
        Ok(existing.clone())
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), Error> {
        let mut tables = self.lock();
        let rows = tables.get_mut(table);
        let Some(rows) = rows else {
            return Err(Error::NotFound {
                table: table.to_owned(),
                id: id.to_owned(),
            });
        };
        let before = rows.len();
        rows.retain(|r| row_id(r) != Some(id));
        if rows.len() == before {
            return Err(Error::NotFound {
                table: table.to_owned(),
                id: id.to_owned(),
            });
        }
        Ok(())
    }
}
