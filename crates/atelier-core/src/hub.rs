// ── Unified data facade ──
//
// The surface consumers use: cached reads, deduplicated fetches with a
// stale-response guard, derived relationship views, search, cache
// control, and mutations that touch the store only after the remote
// confirms them.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use atelier_api::{MemoryStore, RemoteStore, RestClient, TlsMode, TransportConfig};
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{StoreConfig, TlsVerification};
use crate::error::CoreError;
use crate::model::{
    Client, ClientPatch, Connection, ConnectionPatch, Entity, EntityId, EntityKind, Instrument,
    InstrumentPatch, NewClient, NewConnection, NewInstrument, RelationshipView, Validate,
};
use crate::relationships::RelationshipMemo;
use crate::repository::{
    ClientRepository, ConnectionRepository, FetchOptions, InstrumentRepository, Repository,
};
use crate::search::{SearchResults, search_snapshot};
use crate::store::{CacheMeta, CachePhase, DataStore, MutationGuard};

// ── FetchOutcome ─────────────────────────────────────────────────

/// What a fetch request ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The response was applied to the store.
    Applied { count: usize },
    /// A newer request was issued before this one finished; its result
    /// was discarded.
    Stale,
    /// Nothing to do: the kind is populated and fresh.
    Fresh,
    /// Another fetch for this kind is already in flight.
    InFlight,
}

// ── Hub ──────────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<HubInner>`. Every clone shares one
/// `DataStore`, so all consumers see the same records and flags.
#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

struct HubInner {
    store: Arc<DataStore>,
    remote: Arc<dyn RemoteStore>,
    clients: ClientRepository,
    instruments: InstrumentRepository,
    connections: ConnectionRepository,
    relationships: Mutex<RelationshipMemo>,
    cancel: CancellationToken,
    task_handles: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl Hub {
    /// Build a facade over any row store.
    pub fn new(remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            inner: Arc::new(HubInner {
                store: Arc::new(DataStore::new()),
                clients: Repository::new(Arc::clone(&remote)),
                instruments: Repository::new(Arc::clone(&remote)),
                connections: Repository::new(Arc::clone(&remote)),
                remote,
                relationships: Mutex::new(RelationshipMemo::default()),
                cancel: CancellationToken::new(),
                task_handles: tokio::sync::Mutex::new(Vec::new()),
            }),
        }
    }

    /// Build a facade over the hosted REST endpoint described by `config`.
    pub fn connect(config: &StoreConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            tls: match &config.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeout: config.timeout,
        };
        let client = RestClient::new(config.url.as_str(), &config.api_key, &transport)?;
        info!(url = %client.base_url(), "row store configured");
        Ok(Self::new(Arc::new(client)))
    }

    /// Facade over an empty in-process store.
    pub fn offline() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Access the underlying DataStore.
    pub fn store(&self) -> &Arc<DataStore> {
        &self.inner.store
    }

    pub fn remote(&self) -> &Arc<dyn RemoteStore> {
        &self.inner.remote
    }

    pub fn client_repository(&self) -> &ClientRepository {
        &self.inner.clients
    }

    pub fn instrument_repository(&self) -> &InstrumentRepository {
        &self.inner.instruments
    }

    pub fn connection_repository(&self) -> &ConnectionRepository {
        &self.inner.connections
    }

    // ── Reads ────────────────────────────────────────────────────

    pub fn clients(&self) -> Arc<Vec<Arc<Client>>> {
        self.inner.store.clients_snapshot()
    }

    pub fn instruments(&self) -> Arc<Vec<Arc<Instrument>>> {
        self.inner.store.instruments_snapshot()
    }

    pub fn connections(&self) -> Arc<Vec<Arc<Connection>>> {
        self.inner.store.connections_snapshot()
    }

    pub fn client(&self, id: &EntityId) -> Option<Arc<Client>> {
        self.inner.store.get(id)
    }

    pub fn instrument(&self, id: &EntityId) -> Option<Arc<Instrument>> {
        self.inner.store.get(id)
    }

    pub fn connection(&self, id: &EntityId) -> Option<Arc<Connection>> {
        self.inner.store.get(id)
    }

    pub fn meta(&self, kind: EntityKind) -> CacheMeta {
        self.inner.store.meta(kind)
    }

    pub fn phase(&self, kind: EntityKind) -> CachePhase {
        self.inner.store.phase(kind)
    }

    pub fn loading(&self, kind: EntityKind) -> bool {
        self.meta(kind).loading
    }

    pub fn submitting(&self, kind: EntityKind) -> bool {
        self.meta(kind).submitting
    }

    pub fn last_updated(&self, kind: EntityKind) -> Option<DateTime<Utc>> {
        self.inner.store.last_updated(kind)
    }

    pub fn error(&self, kind: EntityKind) -> Option<String> {
        self.meta(kind).error
    }

    // ── Fetching ─────────────────────────────────────────────────

    /// Fetch all clients, superseding any fetch already in flight.
    pub async fn fetch_clients(&self) -> Result<FetchOutcome, CoreError> {
        self.fetch_entity(&self.inner.clients, true).await
    }

    pub async fn fetch_instruments(&self) -> Result<FetchOutcome, CoreError> {
        self.fetch_entity(&self.inner.instruments, true).await
    }

    pub async fn fetch_connections(&self) -> Result<FetchOutcome, CoreError> {
        self.fetch_entity(&self.inner.connections, true).await
    }

    /// Fetch `kind` unconditionally.
    pub async fn fetch(&self, kind: EntityKind) -> Result<FetchOutcome, CoreError> {
        self.fetch_dispatch(kind, true).await
    }

    /// Fetch `kind` only if nothing is in flight and it is empty or stale.
    ///
    /// Concurrent callers share one request: the first claims the fetch,
    /// the rest get [`FetchOutcome::InFlight`].
    pub async fn ensure_loaded(&self, kind: EntityKind) -> Result<FetchOutcome, CoreError> {
        self.fetch_dispatch(kind, false).await
    }

    /// Like [`ensure_loaded`](Self::ensure_loaded), but when another
    /// caller's fetch is in flight, wait for it to land instead of
    /// returning early.
    pub async fn load(&self, kind: EntityKind) -> Result<FetchOutcome, CoreError> {
        let outcome = self.ensure_loaded(kind).await?;
        if outcome == FetchOutcome::InFlight {
            self.wait_until_idle(kind).await;
        }
        Ok(outcome)
    }

    /// Load every listed kind that needs it, concurrently, and wait for
    /// fetches other callers already have in flight. Populated kinds are
    /// skipped. Returns the first error after all fetches settle.
    pub async fn ensure_loaded_many(&self, kinds: &[EntityKind]) -> Result<(), CoreError> {
        let mut wanted: Vec<EntityKind> = Vec::with_capacity(kinds.len());
        for kind in kinds {
            if !wanted.contains(kind) {
                wanted.push(*kind);
            }
        }

        let results = join_all(wanted.iter().map(|kind| self.load(*kind))).await;
        results.into_iter().find_map(Result::err).map_or(Ok(()), Err)
    }

    /// Wait until no fetch for `kind` is in flight.
    pub async fn wait_until_idle(&self, kind: EntityKind) {
        let mut rx = self.inner.store.watch_meta();
        let _ = rx.wait_for(|state| !state.get(kind).loading).await;
    }

    async fn fetch_dispatch(&self, kind: EntityKind, force: bool) -> Result<FetchOutcome, CoreError> {
        match kind {
            EntityKind::Clients => self.fetch_entity(&self.inner.clients, force).await,
            EntityKind::Instruments => self.fetch_entity(&self.inner.instruments, force).await,
            EntityKind::Connections => self.fetch_entity(&self.inner.connections, force).await,
        }
    }

    async fn fetch_entity<T: Entity>(
        &self,
        repo: &Repository<T>,
        force: bool,
    ) -> Result<FetchOutcome, CoreError> {
        let store = &self.inner.store;
        let Some(mut claim) = store.claim_fetch(T::KIND, force) else {
            return Ok(if store.meta(T::KIND).loading {
                FetchOutcome::InFlight
            } else {
                FetchOutcome::Fresh
            });
        };
        let ticket = claim.ticket();
        debug!(kind = %T::KIND, ticket, "fetch started");

        // Dropping this future before the response lands releases the
        // claim, which clears `loading`.
        let response = repo.fetch_all(&FetchOptions::default()).await;
        claim.settle();

        match response {
            Ok(records) => {
                let count = records.len();
                if store.complete_fetch(ticket, records) {
                    debug!(kind = %T::KIND, ticket, count, "fetch applied");
                    Ok(FetchOutcome::Applied { count })
                } else {
                    debug!(kind = %T::KIND, ticket, "discarding stale fetch response");
                    Ok(FetchOutcome::Stale)
                }
            }
            Err(e) => {
                if store.fail_fetch(T::KIND, ticket, e.to_string()) {
                    warn!(kind = %T::KIND, error = %e, "fetch failed");
                    Err(e)
                } else {
                    debug!(kind = %T::KIND, ticket, error = %e, "discarding stale fetch error");
                    Ok(FetchOutcome::Stale)
                }
            }
        }
    }

    // ── Derived views ────────────────────────────────────────────

    /// Every connection joined to its client and instrument.
    ///
    /// Recomputed only when one of the three collections has changed
    /// since the last call; otherwise the same `Arc` is returned.
    pub fn client_relationships(&self) -> Arc<Vec<RelationshipView>> {
        let store = &self.inner.store;
        let (clients, instruments, connections) = (
            store.clients_snapshot(),
            store.instruments_snapshot(),
            store.connections_snapshot(),
        );
        self.inner
            .relationships
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(clients, instruments, connections)
    }

    /// How many times the relationship views have been rebuilt.
    pub fn relationship_computations(&self) -> u64 {
        self.inner
            .relationships
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .computations()
    }

    pub fn relationships_for_client(&self, id: &EntityId) -> Vec<RelationshipView> {
        self.client_relationships()
            .iter()
            .filter(|v| v.client.id == *id)
            .cloned()
            .collect()
    }

    pub fn relationships_for_instrument(&self, id: &EntityId) -> Vec<RelationshipView> {
        self.client_relationships()
            .iter()
            .filter(|v| v.instrument.id == *id)
            .cloned()
            .collect()
    }

    /// The client holding an instrument (`Owned` or `Sold`), if any.
    /// Lowest `display_order` wins when several qualify.
    pub fn instrument_owner(&self, id: &EntityId) -> Option<Arc<Client>> {
        self.relationships_for_instrument(id)
            .into_iter()
            .filter(|v| v.connection.relationship_type.is_ownership())
            .min_by_key(|v| v.connection.display_order)
            .map(|v| v.client)
    }

    /// Case-insensitive search across all three kinds.
    pub fn search_all(&self, query: &str) -> SearchResults {
        search_snapshot(&self.inner.store.state(), query)
    }

    // ── Cache control ────────────────────────────────────────────

    /// Mark `kind` stale; its records stay visible until refetched.
    pub fn invalidate(&self, kind: EntityKind) {
        self.inner.store.invalidate(kind);
    }

    pub fn invalidate_all(&self) {
        for kind in EntityKind::ALL {
            self.inner.store.invalidate(kind);
        }
    }

    /// Drop all cached state. In-flight fetches and mutations are
    /// discarded when they finish.
    pub fn reset(&self) {
        self.inner.store.reset();
        info!("cache reset");
    }

    // ── Client mutations ─────────────────────────────────────────

    pub async fn create_client(&self, input: NewClient) -> Result<Arc<Client>, CoreError> {
        self.create_entity(&self.inner.clients, input).await
    }

    pub async fn update_client(
        &self,
        id: &EntityId,
        patch: ClientPatch,
    ) -> Result<Arc<Client>, CoreError> {
        self.update_entity(&self.inner.clients, id, patch).await
    }

    /// Delete a client. Connections pointing at it are invalidated since
    /// the backend may cascade or null them.
    pub async fn delete_client(&self, id: &EntityId) -> Result<(), CoreError> {
        self.delete_entity(&self.inner.clients, id).await?;
        self.inner.store.invalidate(EntityKind::Connections);
        Ok(())
    }

    // ── Instrument mutations ─────────────────────────────────────

    pub async fn create_instrument(
        &self,
        input: NewInstrument,
    ) -> Result<Arc<Instrument>, CoreError> {
        self.create_entity(&self.inner.instruments, input).await
    }

    pub async fn update_instrument(
        &self,
        id: &EntityId,
        patch: InstrumentPatch,
    ) -> Result<Arc<Instrument>, CoreError> {
        self.update_entity(&self.inner.instruments, id, patch).await
    }

    pub async fn delete_instrument(&self, id: &EntityId) -> Result<(), CoreError> {
        self.delete_entity(&self.inner.instruments, id).await?;
        self.inner.store.invalidate(EntityKind::Connections);
        Ok(())
    }

    // ── Connection mutations ─────────────────────────────────────

    /// Create a connection. Without an explicit `display_order` it is
    /// placed after the client's existing connections, or at 0 for the
    /// client's first one. Connections are loaded first if needed.
    pub async fn create_connection(
        &self,
        mut input: NewConnection,
    ) -> Result<Arc<Connection>, CoreError> {
        if input.display_order.is_none() {
            input.validate()?;
            self.load(EntityKind::Connections).await?;
            let next = self
                .connections()
                .iter()
                .filter(|c| c.links_client(&input.client_id))
                .map(|c| c.display_order)
                .max()
                .map_or(0, |max| max + 1);
            input.display_order = Some(next);
        }
        self.create_entity(&self.inner.connections, input).await
    }

    pub async fn update_connection(
        &self,
        id: &EntityId,
        patch: ConnectionPatch,
    ) -> Result<Arc<Connection>, CoreError> {
        self.update_entity(&self.inner.connections, id, patch).await
    }

    pub async fn delete_connection(&self, id: &EntityId) -> Result<(), CoreError> {
        self.delete_entity(&self.inner.connections, id).await
    }

    /// Write `display_order = position` for each id, in order. Stops at
    /// the first failure; rows already written stay written.
    pub async fn reorder_connections(
        &self,
        ordered: &[EntityId],
    ) -> Result<Vec<Arc<Connection>>, CoreError> {
        let mut updated = Vec::with_capacity(ordered.len());
        for (position, id) in ordered.iter().enumerate() {
            let display_order = i64::try_from(position)
                .map_err(|_| CoreError::validation("too many connections to reorder"))?;
            if let Some(current) = self.connection(id) {
                if current.display_order == display_order {
                    updated.push(current);
                    continue;
                }
            }
            let patch = ConnectionPatch {
                display_order: Some(display_order),
                ..ConnectionPatch::default()
            };
            updated.push(self.update_connection(id, patch).await?);
        }
        debug!(count = updated.len(), "connections reordered");
        Ok(updated)
    }

    // ── Generic mutation plumbing ────────────────────────────────

    async fn create_entity<T: Entity>(
        &self,
        repo: &Repository<T>,
        input: T::New,
    ) -> Result<Arc<T>, CoreError> {
        input.validate()?;
        let guard = self.inner.store.begin_mutation(T::KIND);
        let record = repo.create(&input).await.inspect_err(|e| {
            warn!(kind = %T::KIND, error = %e, "create failed");
        })?;
        debug!(kind = %T::KIND, id = %record.id(), "created");
        Ok(self.commit(&guard, record))
    }

    async fn update_entity<T: Entity>(
        &self,
        repo: &Repository<T>,
        id: &EntityId,
        patch: T::Patch,
    ) -> Result<Arc<T>, CoreError> {
        patch.validate()?;
        let guard = self.inner.store.begin_mutation(T::KIND);
        let record = repo.update(id, &patch).await.inspect_err(|e| {
            warn!(kind = %T::KIND, %id, error = %e, "update failed");
        })?;
        debug!(kind = %T::KIND, %id, "updated");
        Ok(self.commit(&guard, record))
    }

    async fn delete_entity<T: Entity>(
        &self,
        repo: &Repository<T>,
        id: &EntityId,
    ) -> Result<(), CoreError> {
        let guard = self.inner.store.begin_mutation(T::KIND);
        repo.delete(id).await.inspect_err(|e| {
            warn!(kind = %T::KIND, %id, error = %e, "delete failed");
        })?;
        if guard.is_current() {
            self.inner.store.remove_entity::<T>(id);
        }
        debug!(kind = %T::KIND, %id, "deleted");
        Ok(())
    }

    /// Upsert a confirmed record unless the store was reset meanwhile.
    fn commit<T: Entity>(&self, guard: &MutationGuard<'_>, record: T) -> Arc<T> {
        if guard.is_current() {
            self.inner.store.upsert_shared(record).0
        } else {
            debug!(kind = %T::KIND, "store reset during mutation, not caching result");
            Arc::new(record)
        }
    }

    // ── Background revalidation ──────────────────────────────────

    /// Periodically reload any kind that is empty or invalidated.
    /// A zero period disables revalidation.
    pub async fn spawn_revalidation(&self, period: Duration) {
        if period.is_zero() {
            return;
        }
        let cancel = self.inner.cancel.child_token();
        let hub = self.clone();
        let handle = tokio::spawn(revalidate_task(hub, period, cancel));
        self.inner.task_handles.lock().await.push(handle);
        info!(period_secs = period.as_secs(), "background revalidation started");
    }

    /// Stop background tasks and wait for them to finish.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("hub shut down");
    }
}

async fn revalidate_task(hub: Hub, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = hub.ensure_loaded_many(&EntityKind::ALL).await {
                    warn!(error = %e, "background revalidation failed");
                }
            }
        }
    }
}
