#![allow(clippy::unwrap_used)]
// Integration tests for `RestClient` using wiremock.

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use atelier_api::{Error, Filter, Query, RemoteStore, RestClient, Sort, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, RestClient) {
    let server = MockServer::start().await;
    let client = RestClient::from_reqwest(&server.uri(), reqwest::Client::new()).unwrap();
    (server, client)
}

// ── Reads ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_renders_filters_order_and_count() {
    let (server, client) = setup().await;

    let body = json!([
        { "id": "x1", "client_id": "c1", "instrument_id": "i1", "relationship_type": "Owned" },
    ]);

    Mock::given(method("GET"))
        .and(path("/rest/v1/connections"))
        .and(query_param("select", "*"))
        .and(query_param("client_id", "eq.c1"))
        .and(query_param("order", "display_order.asc"))
        .and(header("Prefer", "count=exact"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Range", "0-0/1")
                .set_body_json(&body),
        )
        .mount(&server)
        .await;

    let query = Query::new()
        .filter(Filter::Eq("client_id".into(), json!("c1")))
        .order(Sort::asc("display_order"))
        .with_count();
    let rows = client.fetch("connections", &query).await.unwrap();

    assert_eq!(rows.count, Some(1));
    assert_eq!(rows.data.len(), 1);
    assert_eq!(rows.data[0]["relationship_type"], "Owned");
}

#[tokio::test]
async fn test_fetch_without_count_leaves_count_empty() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/clients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let rows = client.fetch("clients", &Query::new()).await.unwrap();
    assert!(rows.data.is_empty());
    assert_eq!(rows.count, None);
}

// ── Writes ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_insert_returns_representation() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/clients"))
        .and(header("Prefer", "return=representation"))
        .and(body_json(json!({ "first_name": "Jane" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            { "id": "c1", "first_name": "Jane", "created_at": "2024-05-01T10:00:00Z" }
        ])))
        .mount(&server)
        .await;

    let row = client
        .insert("clients", json!({ "first_name": "Jane" }))
        .await
        .unwrap();
    assert_eq!(row["id"], "c1");
    assert_eq!(row["created_at"], "2024-05-01T10:00:00Z");
}

#[tokio::test]
async fn test_update_keys_on_id() {
    let (server, client) = setup().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/instruments"))
        .and(query_param("id", "eq.i1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "i1", "status": "Sold" }
        ])))
        .mount(&server)
        .await;

    let row = client
        .update("instruments", "i1", json!({ "status": "Sold" }))
        .await
        .unwrap();
    assert_eq!(row["status"], "Sold");
}

#[tokio::test]
async fn test_update_with_no_affected_rows_is_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/instruments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let result = client.update("instruments", "ghost", json!({})).await;
    assert!(
        matches!(result, Err(Error::NotFound { ref id, .. }) if id == "ghost"),
        "expected NotFound, got: {result:?}"
    );
}

#[tokio::test]
async fn test_delete_succeeds() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/clients"))
        .and(query_param("id", "eq.c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": "c1" }])))
        .expect(1)
        .mount(&server)
        .await;

    client.delete("clients", "c1").await.unwrap();
}

// ── Error handling ──────────────────────────────────────────────────

#[tokio::test]
async fn test_store_error_carries_code() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/clients"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint",
            "details": "Key (email)=(jane@example.com) already exists."
        })))
        .mount(&server)
        .await;

    let err = client
        .insert("clients", json!({ "email": "jane@example.com" }))
        .await
        .unwrap_err();

    assert_eq!(err.code(), Some("23505"));
    match err {
        Error::Store {
            message, status, ..
        } => {
            assert_eq!(status, Some(409));
            assert!(message.contains("already exists"));
        }
        other => panic!("expected Store error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_unauthorized_maps_to_authentication() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/clients"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Invalid API key" })),
        )
        .mount(&server)
        .await;

    let result = client.fetch("clients", &Query::new()).await;
    assert!(
        matches!(result, Err(Error::Authentication { ref message }) if message == "Invalid API key"),
        "expected Authentication error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_malformed_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/clients"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let result = client.fetch("clients", &Query::new()).await;
    assert!(matches!(result, Err(Error::Deserialization { .. })));
}

#[tokio::test]
async fn test_new_sends_api_key_headers() {
    let server = MockServer::start().await;
    let key: secrecy::SecretString = "anon-key".to_string().into();
    let client = RestClient::new(&server.uri(), &key, &TransportConfig::default()).unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/clients"))
        .and(header("apikey", "anon-key"))
        .and(header("Authorization", "Bearer anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    client.fetch("clients", &Query::new()).await.unwrap();
}
