#![allow(clippy::unwrap_used)]
// Facade behaviour against a scripted row store: fetch deduplication,
// stale-response handling, commit-on-confirmation, and derived views.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio::sync::oneshot;

use atelier_api::{Error, MemoryStore, Query, RemoteStore, Rows};
use atelier_core::{
    CachePhase, ClientPatch, CoreError, EntityId, EntityKind, FetchOutcome, Hub, NewClient,
    NewConnection, RelationshipType,
};

// ── Scripted store ──────────────────────────────────────────────────

type Reply = Result<Rows, Error>;

/// Row store that counts fetches, can hold a fetch open until the test
/// releases it, and can be told to reject writes.
#[derive(Default)]
struct ScriptedStore {
    rows: MemoryStore,
    fetches: Mutex<HashMap<String, usize>>,
    gates: Mutex<HashMap<String, VecDeque<oneshot::Receiver<Reply>>>>,
    reject_writes: Mutex<Option<String>>,
}

impl ScriptedStore {
    fn seeded(table: &str, rows: Value) -> Self {
        let mut store = Self::default();
        store.seed(table, rows);
        store
    }

    fn seed(&mut self, table: &str, rows: Value) {
        let Value::Array(rows) = rows else {
            panic!("seed rows must be an array")
        };
        self.rows = std::mem::take(&mut self.rows).with_rows(table, rows);
    }

    fn fetch_count(&self, table: &str) -> usize {
        self.fetches.lock().unwrap().get(table).copied().unwrap_or(0)
    }

    /// The next fetch of `table` waits for the returned sender.
    fn gate(&self, table: &str) -> oneshot::Sender<Reply> {
        let (tx, rx) = oneshot::channel();
        self.gates
            .lock()
            .unwrap()
            .entry(table.to_owned())
            .or_default()
            .push_back(rx);
        tx
    }

    fn reject_writes(&self, message: &str) {
        *self.reject_writes.lock().unwrap() = Some(message.to_owned());
    }

    fn write_error(&self) -> Option<Error> {
        self.reject_writes
            .lock()
            .unwrap()
            .clone()
            .map(|message| Error::Store {
                message,
                code: Some("42501".into()),
                status: Some(403),
            })
    }
}

#[async_trait]
impl RemoteStore for ScriptedStore {
    async fn fetch(&self, table: &str, query: &Query) -> Result<Rows, Error> {
        *self.fetches.lock().unwrap().entry(table.to_owned()).or_default() += 1;
        let gate = self
            .gates
            .lock()
            .unwrap()
            .get_mut(table)
            .and_then(VecDeque::pop_front);
        match gate {
            Some(rx) => rx.await.unwrap(),
            None => self.rows.fetch(table, query).await,
        }
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, Error> {
        match self.write_error() {
            Some(e) => Err(e),
            None => self.rows.insert(table, row).await,
        }
    }

    async fn update(&self, table: &str, id: &str, patch: Value) -> Result<Value, Error> {
        match self.write_error() {
            Some(e) => Err(e),
            None => self.rows.update(table, id, patch).await,
        }
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), Error> {
        match self.write_error() {
            Some(e) => Err(e),
            None => self.rows.delete(table, id).await,
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn hub_over(store: ScriptedStore) -> (Hub, Arc<ScriptedStore>) {
    let store = Arc::new(store);
    let remote: Arc<dyn RemoteStore> = store.clone();
    (Hub::new(remote), store)
}

fn rows(data: Value) -> Reply {
    let Value::Array(data) = data else {
        panic!("reply rows must be an array")
    };
    Ok(Rows { data, count: None })
}

async fn until_fetches(store: &ScriptedStore, table: &str, n: usize) {
    while store.fetch_count(table) < n {
        tokio::task::yield_now().await;
    }
}

fn client_ids(hub: &Hub) -> Vec<String> {
    hub.clients().iter().map(|c| c.id.to_string()).collect()
}

fn relationship_world(instrument_id: &str) -> ScriptedStore {
    let mut store = ScriptedStore::seeded(
        "clients",
        json!([{ "id": "c1", "first_name": "Jane", "last_name": "Doe" }]),
    );
    store.seed("instruments", json!([{ "id": "i1", "maker": "Amati", "type": "Violin" }]));
    store.seed(
        "client_instruments",
        json!([{
            "id": "x1", "client_id": "c1", "instrument_id": instrument_id,
            "relationship_type": "Owned"
        }]),
    );
    store
}

// ── Fetching ────────────────────────────────────────────────────────

#[tokio::test]
async fn fetch_clients_populates_store_and_toggles_loading() {
    let (hub, store) = hub_over(ScriptedStore::default());
    assert!(!hub.loading(EntityKind::Clients));
    assert!(hub.clients().is_empty());
    assert!(hub.last_updated(EntityKind::Clients).is_none());

    let release = store.gate("clients");
    let task = tokio::spawn({
        let hub = hub.clone();
        async move { hub.fetch_clients().await }
    });
    until_fetches(&store, "clients", 1).await;
    assert!(hub.loading(EntityKind::Clients));
    assert_eq!(hub.phase(EntityKind::Clients), CachePhase::Loading);

    release
        .send(rows(json!([{ "id": "c1", "first_name": "Jane" }])))
        .unwrap();
    let outcome = task.await.unwrap().unwrap();

    assert_eq!(outcome, FetchOutcome::Applied { count: 1 });
    assert!(!hub.loading(EntityKind::Clients));
    assert_eq!(client_ids(&hub), vec!["c1"]);
    assert!(hub.last_updated(EntityKind::Clients).is_some());
}

#[tokio::test]
async fn concurrent_access_issues_one_fetch() {
    let (hub, store) = hub_over(ScriptedStore::seeded(
        "instruments",
        json!([{ "id": "i1", "type": "Cello" }]),
    ));

    let release = store.gate("instruments");
    let first = tokio::spawn({
        let hub = hub.clone();
        async move { hub.ensure_loaded(EntityKind::Instruments).await }
    });
    until_fetches(&store, "instruments", 1).await;

    let second = hub.ensure_loaded(EntityKind::Instruments).await.unwrap();
    assert_eq!(second, FetchOutcome::InFlight);

    release.send(rows(json!([{ "id": "i1", "type": "Cello" }]))).unwrap();
    assert_eq!(
        first.await.unwrap().unwrap(),
        FetchOutcome::Applied { count: 1 }
    );
    assert_eq!(store.fetch_count("instruments"), 1);

    // Populated and fresh: further access is a no-op.
    assert_eq!(
        hub.ensure_loaded(EntityKind::Instruments).await.unwrap(),
        FetchOutcome::Fresh
    );
    assert_eq!(store.fetch_count("instruments"), 1);
}

#[tokio::test]
async fn joined_accessors_share_a_single_fetch() {
    let (hub, store) = hub_over(ScriptedStore::seeded("clients", json!([{ "id": "c1" }])));

    let (a, b) = tokio::join!(
        hub.ensure_loaded(EntityKind::Clients),
        hub.ensure_loaded(EntityKind::Clients)
    );
    a.unwrap();
    b.unwrap();

    assert_eq!(store.fetch_count("clients"), 1);
}

#[tokio::test]
async fn older_response_never_overwrites_newer() {
    let (hub, store) = hub_over(ScriptedStore::default());

    let release_a = store.gate("clients");
    let release_b = store.gate("clients");

    let a = tokio::spawn({
        let hub = hub.clone();
        async move { hub.fetch_clients().await }
    });
    until_fetches(&store, "clients", 1).await;
    let b = tokio::spawn({
        let hub = hub.clone();
        async move { hub.fetch_clients().await }
    });
    until_fetches(&store, "clients", 2).await;

    // B resolves first, then A.
    release_b.send(rows(json!([{ "id": "from-b" }]))).unwrap();
    assert_eq!(b.await.unwrap().unwrap(), FetchOutcome::Applied { count: 1 });
    release_a
        .send(rows(json!([{ "id": "from-a-1" }, { "id": "from-a-2" }])))
        .unwrap();
    assert_eq!(a.await.unwrap().unwrap(), FetchOutcome::Stale);

    assert_eq!(client_ids(&hub), vec!["from-b"]);
    assert!(!hub.loading(EntityKind::Clients));
}

#[tokio::test]
async fn older_response_is_discarded_when_it_lands_first() {
    let (hub, store) = hub_over(ScriptedStore::default());

    let release_a = store.gate("clients");
    let release_b = store.gate("clients");

    let a = tokio::spawn({
        let hub = hub.clone();
        async move { hub.fetch_clients().await }
    });
    until_fetches(&store, "clients", 1).await;
    let b = tokio::spawn({
        let hub = hub.clone();
        async move { hub.fetch_clients().await }
    });
    until_fetches(&store, "clients", 2).await;

    release_a.send(rows(json!([{ "id": "from-a" }]))).unwrap();
    assert_eq!(a.await.unwrap().unwrap(), FetchOutcome::Stale);
    assert!(hub.clients().is_empty());
    assert!(hub.loading(EntityKind::Clients));

    release_b.send(rows(json!([{ "id": "from-b" }]))).unwrap();
    b.await.unwrap().unwrap();
    assert_eq!(client_ids(&hub), vec!["from-b"]);
}

#[tokio::test]
async fn fetch_error_keeps_data_and_retries_on_next_access() {
    let (hub, store) = hub_over(ScriptedStore::seeded("clients", json!([{ "id": "c1" }])));
    hub.ensure_loaded(EntityKind::Clients).await.unwrap();
    hub.invalidate(EntityKind::Clients);

    let release = store.gate("clients");
    release
        .send(Err(Error::Store {
            message: "connection reset".into(),
            code: None,
            status: Some(503),
        }))
        .unwrap();
    let err = hub.ensure_loaded(EntityKind::Clients).await.unwrap_err();
    assert!(matches!(err, CoreError::Store { status: Some(503), .. }));

    assert_eq!(client_ids(&hub), vec!["c1"]);
    assert!(!hub.loading(EntityKind::Clients));
    assert!(hub.last_updated(EntityKind::Clients).is_none());
    assert!(hub.error(EntityKind::Clients).unwrap().contains("connection reset"));

    // Still stale, so the next access fetches again and clears the error.
    hub.ensure_loaded(EntityKind::Clients).await.unwrap();
    assert_eq!(store.fetch_count("clients"), 3);
    assert!(hub.error(EntityKind::Clients).is_none());
    assert!(hub.last_updated(EntityKind::Clients).is_some());
}

#[tokio::test]
async fn batch_load_fetches_missing_kinds_concurrently() {
    let (hub, store) = hub_over(relationship_world("i1"));
    hub.ensure_loaded(EntityKind::Clients).await.unwrap();

    let release_instruments = store.gate("instruments");
    let release_connections = store.gate("client_instruments");
    let batch = tokio::spawn({
        let hub = hub.clone();
        async move {
            hub.ensure_loaded_many(&[
                EntityKind::Clients,
                EntityKind::Instruments,
                EntityKind::Connections,
            ])
            .await
        }
    });

    // Both fetches are in flight before either resolves.
    until_fetches(&store, "instruments", 1).await;
    until_fetches(&store, "client_instruments", 1).await;

    release_connections
        .send(rows(json!([{ "id": "x1", "client_id": "c1", "instrument_id": "i1" }])))
        .unwrap();
    release_instruments
        .send(rows(json!([{ "id": "i1", "type": "Violin" }])))
        .unwrap();
    batch.await.unwrap().unwrap();

    assert_eq!(store.fetch_count("clients"), 1);
    assert_eq!(hub.client_relationships().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn dropped_fetch_does_not_wedge_loading() {
    let (hub, store) = hub_over(ScriptedStore::seeded("clients", json!([{ "id": "c1" }])));

    let _held = store.gate("clients");
    let timed_out =
        tokio::time::timeout(Duration::from_millis(20), hub.ensure_loaded(EntityKind::Clients))
            .await;
    assert!(timed_out.is_err());

    assert!(!hub.loading(EntityKind::Clients));
    assert_eq!(hub.phase(EntityKind::Clients), CachePhase::Empty);
    assert!(hub.error(EntityKind::Clients).is_some());

    let outcome = hub.ensure_loaded(EntityKind::Clients).await.unwrap();
    assert_eq!(outcome, FetchOutcome::Applied { count: 1 });
    assert_eq!(store.fetch_count("clients"), 2);
    assert!(hub.error(EntityKind::Clients).is_none());
}

#[tokio::test]
async fn batch_load_waits_for_a_fetch_already_in_flight() {
    let (hub, store) = hub_over(relationship_world("i1"));

    let release = store.gate("clients");
    let background = tokio::spawn({
        let hub = hub.clone();
        async move { hub.ensure_loaded(EntityKind::Clients).await }
    });
    until_fetches(&store, "clients", 1).await;

    let batch = tokio::spawn({
        let hub = hub.clone();
        async move { hub.ensure_loaded_many(&EntityKind::ALL).await }
    });
    until_fetches(&store, "client_instruments", 1).await;
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert!(!batch.is_finished());

    release
        .send(rows(json!([{ "id": "c1", "first_name": "Jane", "last_name": "Doe" }])))
        .unwrap();
    batch.await.unwrap().unwrap();
    background.await.unwrap().unwrap();

    assert_eq!(store.fetch_count("clients"), 1);
    assert_eq!(hub.client_relationships().len(), 1);
    assert_eq!(hub.search_all("jane").clients.len(), 1);
}

#[tokio::test]
async fn load_shares_the_in_flight_result() {
    let (hub, store) = hub_over(ScriptedStore::default());

    let release = store.gate("instruments");
    let first = tokio::spawn({
        let hub = hub.clone();
        async move { hub.ensure_loaded(EntityKind::Instruments).await }
    });
    until_fetches(&store, "instruments", 1).await;

    let waiter = tokio::spawn({
        let hub = hub.clone();
        async move {
            let outcome = hub.load(EntityKind::Instruments).await.unwrap();
            (outcome, hub.instruments().len())
        }
    });
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
    assert!(!waiter.is_finished());
    release.send(rows(json!([{ "id": "i1", "type": "Viola" }]))).unwrap();

    first.await.unwrap().unwrap();
    assert_eq!(waiter.await.unwrap(), (FetchOutcome::InFlight, 1));
    assert_eq!(store.fetch_count("instruments"), 1);
}

// ── Cache control ───────────────────────────────────────────────────

#[tokio::test]
async fn invalidate_is_idempotent_and_keeps_data() {
    let (hub, _store) = hub_over(ScriptedStore::seeded("clients", json!([{ "id": "c1" }])));
    hub.ensure_loaded(EntityKind::Clients).await.unwrap();
    let before = hub.clients();

    hub.invalidate(EntityKind::Clients);
    let once = hub.meta(EntityKind::Clients);
    hub.invalidate(EntityKind::Clients);

    assert_eq!(hub.meta(EntityKind::Clients), once);
    assert!(once.last_updated.is_none());
    assert!(Arc::ptr_eq(&before, &hub.clients()));
    assert_eq!(hub.phase(EntityKind::Clients), CachePhase::Invalidated);
}

#[tokio::test]
async fn reset_returns_every_kind_to_empty() {
    let (hub, store) = hub_over(relationship_world("i1"));
    hub.ensure_loaded_many(&EntityKind::ALL).await.unwrap();
    assert_eq!(hub.client_relationships().len(), 1);

    hub.reset();
    for kind in EntityKind::ALL {
        assert_eq!(hub.phase(kind), CachePhase::Empty);
    }
    assert!(hub.client_relationships().is_empty());

    hub.ensure_loaded(EntityKind::Clients).await.unwrap();
    assert_eq!(store.fetch_count("clients"), 2);
}

// ── Mutations ───────────────────────────────────────────────────────

#[tokio::test]
async fn create_failure_leaves_store_unchanged() {
    let (hub, store) = hub_over(ScriptedStore::seeded(
        "clients",
        json!([{ "id": "c1" }, { "id": "c2" }]),
    ));
    hub.ensure_loaded(EntityKind::Clients).await.unwrap();
    store.reject_writes("permission denied for table clients");

    let err = hub
        .create_client(NewClient {
            first_name: Some("Jane".into()),
            ..NewClient::default()
        })
        .await
        .unwrap_err();

    assert_eq!(err.code(), Some("42501"));
    assert_eq!(client_ids(&hub), vec!["c1", "c2"]);
    assert!(!hub.submitting(EntityKind::Clients));
}

#[tokio::test]
async fn create_during_fetch_survives_the_older_page() {
    let (hub, store) = hub_over(ScriptedStore::seeded("clients", json!([{ "id": "c1" }])));
    hub.ensure_loaded(EntityKind::Clients).await.unwrap();
    hub.invalidate(EntityKind::Clients);

    let release = store.gate("clients");
    let fetch = tokio::spawn({
        let hub = hub.clone();
        async move { hub.ensure_loaded(EntityKind::Clients).await }
    });
    until_fetches(&store, "clients", 2).await;

    let created = hub
        .create_client(NewClient {
            first_name: Some("Jane".into()),
            ..NewClient::default()
        })
        .await
        .unwrap();
    hub.update_client(
        &EntityId::from("c1"),
        ClientPatch {
            note: Some("called back".into()),
            ..ClientPatch::default()
        },
    )
    .await
    .unwrap();

    // The page was read before either write landed.
    release.send(rows(json!([{ "id": "c1" }]))).unwrap();
    fetch.await.unwrap().unwrap();

    assert_eq!(client_ids(&hub), vec![created.id.to_string(), "c1".to_owned()]);
    assert_eq!(
        hub.client(&EntityId::from("c1")).unwrap().note.as_deref(),
        Some("called back")
    );
    assert_eq!(hub.phase(EntityKind::Clients), CachePhase::Populated);
}

#[tokio::test]
async fn delete_during_fetch_stays_deleted() {
    let (hub, store) = hub_over(ScriptedStore::seeded(
        "clients",
        json!([{ "id": "c1" }, { "id": "c2" }]),
    ));
    hub.ensure_loaded(EntityKind::Clients).await.unwrap();
    hub.invalidate(EntityKind::Clients);

    let release = store.gate("clients");
    let fetch = tokio::spawn({
        let hub = hub.clone();
        async move { hub.ensure_loaded(EntityKind::Clients).await }
    });
    until_fetches(&store, "clients", 2).await;

    hub.delete_client(&EntityId::from("c2")).await.unwrap();
    release.send(rows(json!([{ "id": "c1" }, { "id": "c2" }]))).unwrap();
    fetch.await.unwrap().unwrap();

    assert_eq!(client_ids(&hub), vec!["c1"]);
}

#[tokio::test]
async fn create_success_inserts_at_front() {
    let (hub, _store) = hub_over(ScriptedStore::seeded("clients", json!([{ "id": "c1" }])));
    hub.ensure_loaded(EntityKind::Clients).await.unwrap();

    let created = hub
        .create_client(NewClient {
            first_name: Some("Jane".into()),
            email: Some("jane@example.com".into()),
            ..NewClient::default()
        })
        .await
        .unwrap();

    let ids = client_ids(&hub);
    assert_eq!(ids.len(), 2);
    assert_eq!(ids[0], created.id.to_string());
    assert!(created.created_at.is_some());
}

#[tokio::test]
async fn invalid_payload_never_reaches_the_store() {
    let (hub, store) = hub_over(ScriptedStore::default());
    store.reject_writes("should not be called");

    let err = hub.create_client(NewClient::default()).await.unwrap_err();
    assert!(matches!(err, CoreError::ValidationFailed { .. }));
}

#[tokio::test]
async fn update_replaces_record_in_place() {
    let (hub, _store) = hub_over(ScriptedStore::seeded(
        "clients",
        json!([{ "id": "c1", "first_name": "Jane" }, { "id": "c2", "first_name": "John" }]),
    ));
    hub.ensure_loaded(EntityKind::Clients).await.unwrap();

    let updated = hub
        .update_client(
            &EntityId::from("c2"),
            ClientPatch {
                last_name: Some("Smith".into()),
                ..ClientPatch::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.last_name.as_deref(), Some("Smith"));
    assert_eq!(client_ids(&hub), vec!["c1", "c2"]);
    assert_eq!(
        hub.client(&EntityId::from("c2")).unwrap().full_name(),
        "John Smith"
    );
}

#[tokio::test]
async fn delete_removes_only_after_confirmation() {
    let (hub, store) = hub_over(ScriptedStore::seeded(
        "clients",
        json!([{ "id": "c1" }, { "id": "c2" }]),
    ));
    hub.ensure_loaded(EntityKind::Clients).await.unwrap();

    hub.delete_client(&EntityId::from("c1")).await.unwrap();
    assert_eq!(client_ids(&hub), vec!["c2"]);

    store.reject_writes("row is referenced by an invoice");
    let err = hub.delete_client(&EntityId::from("c2")).await;
    assert!(err.is_err());
    assert_eq!(client_ids(&hub), vec!["c2"]);
}

#[tokio::test]
async fn deleting_a_client_invalidates_connections() {
    let (hub, _store) = hub_over(relationship_world("i1"));
    hub.ensure_loaded_many(&EntityKind::ALL).await.unwrap();

    hub.delete_client(&EntityId::from("c1")).await.unwrap();

    assert_eq!(hub.phase(EntityKind::Connections), CachePhase::Invalidated);
    assert!(hub.client_relationships().is_empty());
}

#[tokio::test]
async fn new_connection_is_appended_to_client_order() {
    let mut store = ScriptedStore::seeded(
        "client_instruments",
        json!([
            { "id": "x1", "client_id": "c1", "instrument_id": "i1", "display_order": 0 },
            { "id": "x2", "client_id": "c1", "instrument_id": "i2", "display_order": 4 },
            { "id": "x3", "client_id": "c9", "instrument_id": "i3", "display_order": 7 },
        ]),
    );
    store.seed("clients", json!([]));
    let (hub, _store) = hub_over(store);
    hub.ensure_loaded(EntityKind::Connections).await.unwrap();

    let created = hub
        .create_connection(NewConnection {
            client_id: EntityId::from("c1"),
            instrument_id: EntityId::from("i4"),
            relationship_type: RelationshipType::Interested,
            notes: None,
            display_order: None,
        })
        .await
        .unwrap();

    assert_eq!(created.display_order, 5);
}

#[tokio::test]
async fn first_connection_gets_order_zero_after_loading_the_cache() {
    let (hub, store) = hub_over(ScriptedStore::seeded(
        "client_instruments",
        json!([
            { "id": "x1", "client_id": "c1", "instrument_id": "i1", "display_order": 3 },
        ]),
    ));

    // Nothing cached yet: the existing row is loaded before ordering.
    let appended = hub
        .create_connection(NewConnection {
            client_id: EntityId::from("c1"),
            instrument_id: EntityId::from("i2"),
            relationship_type: RelationshipType::Interested,
            notes: None,
            display_order: None,
        })
        .await
        .unwrap();
    assert_eq!(appended.display_order, 4);
    assert_eq!(store.fetch_count("client_instruments"), 1);

    let first = hub
        .create_connection(NewConnection {
            client_id: EntityId::from("c2"),
            instrument_id: EntityId::from("i1"),
            relationship_type: RelationshipType::Booked,
            notes: None,
            display_order: None,
        })
        .await
        .unwrap();
    assert_eq!(first.display_order, 0);
    let stored = store.rows.rows("client_instruments");
    assert_eq!(stored.last().unwrap()["display_order"], json!(0));
}

#[tokio::test]
async fn reorder_writes_positions() {
    let (hub, store) = hub_over(ScriptedStore::seeded(
        "client_instruments",
        json!([
            { "id": "x1", "client_id": "c1", "instrument_id": "i1", "display_order": 0 },
            { "id": "x2", "client_id": "c1", "instrument_id": "i2", "display_order": 1 },
            { "id": "x3", "client_id": "c1", "instrument_id": "i3", "display_order": 2 },
        ]),
    ));
    hub.ensure_loaded(EntityKind::Connections).await.unwrap();

    let ordered: Vec<EntityId> = ["x3", "x1", "x2"].into_iter().map(EntityId::from).collect();
    let updated = hub.reorder_connections(&ordered).await.unwrap();

    let orders: Vec<i64> = updated.iter().map(|c| c.display_order).collect();
    assert_eq!(orders, vec![0, 1, 2]);
    let stored: Vec<(String, i64)> = store
        .rows
        .rows("client_instruments")
        .iter()
        .map(|r| {
            (
                r["id"].as_str().unwrap().to_owned(),
                r["display_order"].as_i64().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        stored,
        vec![("x1".into(), 1), ("x2".into(), 2), ("x3".into(), 0)]
    );
}

// ── Derived views ───────────────────────────────────────────────────

#[tokio::test]
async fn relationship_joins_existing_records() {
    let (hub, _store) = hub_over(relationship_world("i1"));
    hub.ensure_loaded_many(&EntityKind::ALL).await.unwrap();

    let views = hub.client_relationships();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].client.id, EntityId::from("c1"));
    assert_eq!(views[0].instrument.id, EntityId::from("i1"));

    let owner = hub.instrument_owner(&EntityId::from("i1")).unwrap();
    assert_eq!(owner.full_name(), "Jane Doe");
    assert_eq!(hub.relationships_for_client(&EntityId::from("c1")).len(), 1);
}

#[tokio::test]
async fn relationship_with_missing_instrument_is_dropped() {
    let (hub, _store) = hub_over(relationship_world("i-missing"));
    hub.ensure_loaded_many(&EntityKind::ALL).await.unwrap();

    assert!(hub.client_relationships().is_empty());
    assert!(hub.instrument_owner(&EntityId::from("i1")).is_none());
}

#[tokio::test]
async fn relationships_are_memoized_on_collection_identity() {
    let (hub, _store) = hub_over(relationship_world("i1"));
    hub.ensure_loaded_many(&EntityKind::ALL).await.unwrap();

    let first = hub.client_relationships();
    let second = hub.client_relationships();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(hub.relationship_computations(), 1);

    // Invalidation alone does not change any collection.
    hub.invalidate_all();
    assert!(Arc::ptr_eq(&first, &hub.client_relationships()));

    hub.update_client(
        &EntityId::from("c1"),
        ClientPatch {
            note: Some("prefers gut strings".into()),
            ..ClientPatch::default()
        },
    )
    .await
    .unwrap();
    let third = hub.client_relationships();
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(hub.relationship_computations(), 2);
    assert_eq!(third[0].client.note.as_deref(), Some("prefers gut strings"));
}

#[tokio::test]
async fn search_is_case_insensitive_and_empty_matches_all() {
    let (hub, _store) = hub_over(relationship_world("i1"));
    hub.ensure_loaded_many(&EntityKind::ALL).await.unwrap();

    let upper = hub.search_all("JANE");
    let lower = hub.search_all("jane");
    assert_eq!(upper.total, 1);
    assert_eq!(upper.clients[0].id, lower.clients[0].id);
    assert_eq!(lower.total, upper.total);

    let owned = hub.search_all("owned");
    assert_eq!(owned.connections.len(), 1);
    assert!(owned.clients.is_empty());

    let all = hub.search_all("");
    assert_eq!(
        (all.clients.len(), all.instruments.len(), all.connections.len(), all.total),
        (1, 1, 1, 3)
    );
}

// ── Subscriptions & background work ─────────────────────────────────

#[tokio::test]
async fn streams_observe_fetches() {
    let (hub, _store) = hub_over(ScriptedStore::seeded("clients", json!([{ "id": "c1" }])));
    let mut stream = hub.store().subscribe_clients();
    assert!(stream.current().is_empty());

    hub.fetch_clients().await.unwrap();
    let snapshot = stream.changed().await.unwrap();
    assert_eq!(snapshot.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn revalidation_reloads_stale_kinds_until_shutdown() {
    let (hub, store) = hub_over(ScriptedStore::seeded("clients", json!([{ "id": "c1" }])));
    hub.ensure_loaded_many(&EntityKind::ALL).await.unwrap();
    hub.invalidate(EntityKind::Clients);

    hub.spawn_revalidation(Duration::from_secs(60)).await;
    tokio::time::sleep(Duration::from_secs(61)).await;

    assert_eq!(store.fetch_count("clients"), 2);
    assert!(hub.last_updated(EntityKind::Clients).is_some());

    hub.shutdown().await;
    hub.invalidate(EntityKind::Clients);
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(store.fetch_count("clients"), 2);
}
