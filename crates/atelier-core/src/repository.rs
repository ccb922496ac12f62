// ── Entity repositories ──
//
// Typed CRUD over one table of the row store. Repositories map rows to
// records and errors to `CoreError`; they never touch the `DataStore`.
// Placing results (or keeping stale data on failure) is the facade's job.

use std::marker::PhantomData;
use std::sync::Arc;

use atelier_api::{Filter, Query, RemoteStore, Sort};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use tracing::debug;

use crate::convert::{decode_row, decode_rows, encode};
use crate::error::CoreError;
use crate::model::{Client, Connection, Entity, EntityId, Instrument};

pub type ClientRepository = Repository<Client>;
pub type InstrumentRepository = Repository<Instrument>;
pub type ConnectionRepository = Repository<Connection>;

// ── FetchOptions ────────────────────────────────────────────────────

/// Filters, ordering, and paging for a repository read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOptions {
    pub filters: Vec<Filter>,
    /// Overrides the entity's default ordering when set.
    pub order: Option<Vec<Sort>>,
    pub page: Option<(u64, u64)>,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Rows whose `client_id` is `id`.
    pub fn linked_to_client(self, id: &EntityId) -> Self {
        self.filter(Filter::Eq("client_id".into(), Value::String(id.to_string())))
    }

    /// Rows whose `instrument_id` is `id`.
    pub fn linked_to_instrument(self, id: &EntityId) -> Self {
        self.filter(Filter::Eq(
            "instrument_id".into(),
            Value::String(id.to_string()),
        ))
    }

    /// Rows created within `[from, to]`; either bound may be open.
    pub fn created_between(
        mut self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Self {
        if let Some(from) = from {
            self = self.filter(Filter::Gte("created_at".into(), timestamp(from)));
        }
        if let Some(to) = to {
            self = self.filter(Filter::Lte("created_at".into(), timestamp(to)));
        }
        self
    }

    /// Case-insensitive substring match on one text column.
    pub fn matching(self, column: &str, needle: &str) -> Self {
        self.filter(Filter::ILike(column.to_owned(), needle.to_owned()))
    }

    pub fn order_by(mut self, sort: Sort) -> Self {
        self.order.get_or_insert_with(Vec::new).push(sort);
        self
    }

    pub fn page(mut self, offset: u64, limit: u64) -> Self {
        self.page = Some((offset, limit));
        self
    }

    fn to_query<T: Entity>(&self, count: bool) -> Query {
        let mut query = Query {
            filters: self.filters.clone(),
            order: self.order.clone().unwrap_or_else(T::default_order),
            range: None,
            count,
        };
        if let Some((offset, limit)) = self.page {
            query = query.range(offset, limit);
        }
        query
    }
}

/// One page of records plus the total number of matching rows.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: Option<u64>,
}

/// Timestamps in the same `Z`-suffixed form the store writes, so bounds
/// compare correctly against stored text.
fn timestamp(at: DateTime<Utc>) -> Value {
    Value::String(at.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

// ── Repository ──────────────────────────────────────────────────────

/// CRUD for one entity kind over a shared row store.
pub struct Repository<T: Entity> {
    remote: Arc<dyn RemoteStore>,
    _kind: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            remote: Arc::clone(&self.remote),
            _kind: PhantomData,
        }
    }
}

impl<T: Entity> Repository<T> {
    pub fn new(remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            remote,
            _kind: PhantomData,
        }
    }

    fn table() -> &'static str {
        T::KIND.table()
    }

    /// Every matching record, in the requested (or default) order.
    pub async fn fetch_all(&self, options: &FetchOptions) -> Result<Vec<T>, CoreError> {
        let rows = self
            .remote
            .fetch(Self::table(), &options.to_query::<T>(false))
            .await?;
        debug!(table = Self::table(), rows = rows.data.len(), "fetched");
        decode_rows(Self::table(), rows.data)
    }

    /// One window of records with the total match count.
    pub async fn fetch_page(&self, options: &FetchOptions) -> Result<Page<T>, CoreError> {
        let rows = self
            .remote
            .fetch(Self::table(), &options.to_query::<T>(true))
            .await?;
        Ok(Page {
            total: rows.count,
            items: decode_rows(Self::table(), rows.data)?,
        })
    }

    /// Insert a record; the store assigns `id` and `created_at`.
    pub async fn create(&self, input: &T::New) -> Result<T, CoreError> {
        let row = encode(Self::table(), input)?;
        let created = self.remote.insert(Self::table(), row).await?;
        decode_row(Self::table(), created)
    }

    /// Apply a partial update and return the updated record.
    pub async fn update(&self, id: &EntityId, patch: &T::Patch) -> Result<T, CoreError> {
        let row = encode(Self::table(), patch)?;
        let updated = self
            .remote
            .update(Self::table(), &id.to_string(), row)
            .await?;
        decode_row(Self::table(), updated)
    }

    pub async fn delete(&self, id: &EntityId) -> Result<(), CoreError> {
        self.remote.delete(Self::table(), &id.to_string()).await?;
        Ok(())
    }
}
