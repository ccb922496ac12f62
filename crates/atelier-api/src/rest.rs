// Hand-crafted async HTTP client for a PostgREST endpoint (Supabase `rest/v1`).
//
// Base path: /rest/v1/
// Auth: `apikey` header + `Authorization: Bearer <key>`

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::query::{Query, Rows};
use crate::store::RemoteStore;
use crate::transport::TransportConfig;
use crate::Error;

const PREFER_REPRESENTATION: &str = "return=representation";
const PREFER_COUNT: &str = "count=exact";

// ── Error response shape from PostgREST ──────────────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for a PostgREST row store.
pub struct RestClient {
    http: reqwest::Client,
    base_url: Url,
}

impl RestClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from a project URL and API key.
    ///
    /// Injects `apikey` and `Authorization: Bearer` as default headers.
    pub fn new(
        base_url: &str,
        api_key: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        let mut key_value =
            HeaderValue::from_str(api_key.expose_secret()).map_err(|e| Error::Authentication {
                message: format!("invalid API key header value: {e}"),
            })?;
        key_value.set_sensitive(true);
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", api_key.expose_secret()))
            .map_err(|e| Error::Authentication {
                message: format!("invalid API key header value: {e}"),
            })?;
        bearer.set_sensitive(true);
        headers.insert("apikey", key_value);
        headers.insert(reqwest::header::AUTHORIZATION, bearer);

        let http = transport.build_client(headers)?;
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self { http, base_url })
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self { http, base_url })
    }

    /// Ensure the base URL ends with `/rest/v1/`.
    ///
    /// Accepts either the bare project URL (`https://xyz.supabase.co`) or
    /// the full REST root.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        if path.ends_with("/rest/v1") {
            url.set_path(&format!("{path}/"));
        } else {
            url.set_path(&format!("{path}/rest/v1/"));
        }
        Ok(url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn table_url(&self, table: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(table)?)
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_json(resp: reqwest::Response) -> Result<Value, Error> {
        let status = resp.status();
        if !status.is_success() {
            return Err(Self::parse_error(status, resp).await);
        }
        let body = resp.text().await?;
        if body.trim().is_empty() {
            return Ok(Value::Array(Vec::new()));
        }
        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    }

    async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        let raw = resp.text().await.unwrap_or_default();
        let parsed = serde_json::from_str::<ErrorResponse>(&raw).ok();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Error::Authentication {
                message: parsed
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| status.to_string()),
            };
        }

        match parsed {
            Some(err) => Error::Store {
                message: match (err.message, err.details) {
                    (Some(m), Some(d)) => format!("{m} ({d})"),
                    (Some(m), None) => m,
                    (None, _) => status.to_string(),
                },
                code: err.code,
                status: Some(status.as_u16()),
            },
            None => Error::Store {
                message: if raw.is_empty() {
                    status.to_string()
                } else {
                    raw
                },
                code: None,
                status: Some(status.as_u16()),
            },
        }
    }

    /// PostgREST returns affected rows as an array; pull out the single row.
    fn single_row(value: Value, table: &str, id: &str) -> Result<Value, Error> {
        match value {
            Value::Array(mut rows) if !rows.is_empty() => Ok(rows.swap_remove(0)),
            Value::Array(_) => Err(Error::NotFound {
                table: table.to_owned(),
                id: id.to_owned(),
            }),
            obj @ Value::Object(_) => Ok(obj),
            other => Err(Error::Deserialization {
                message: "expected row object or array".into(),
                body: other.to_string(),
            }),
        }
    }
}

/// Parse the total from a `Content-Range` header (`0-24/3573`, `*/0`).
fn parse_content_range(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.parse().ok()
}

#[async_trait]
impl RemoteStore for RestClient {
    async fn fetch(&self, table: &str, query: &Query) -> Result<Rows, Error> {
        let url = self.table_url(table)?;
        let params = query.to_params();
        debug!("GET {url} params={params:?}");

        let mut req = self.http.get(url).query(&params);
        if query.count {
            req = req.header("Prefer", PREFER_COUNT);
        }
        let resp = req.send().await?;

        let count = resp
            .headers()
            .get(reqwest::header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range);

        match Self::handle_json(resp).await? {
            Value::Array(data) => Ok(Rows { data, count }),
            other => Err(Error::Deserialization {
                message: format!("expected array of rows from '{table}'"),
                body: other.to_string(),
            }),
        }
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, Error> {
        let url = self.table_url(table)?;
        debug!("POST {url}");

        let resp = self
            .http
            .post(url)
            .header("Prefer", PREFER_REPRESENTATION)
            .json(&row)
            .send()
            .await?;
        let body = Self::handle_json(resp).await?;
        Self::single_row(body, table, "<new>")
    }

    async fn update(&self, table: &str, id: &str, patch: Value) -> Result<Value, Error> {
        let url = self.table_url(table)?;
        debug!("PATCH {url} id={id}");

        let resp = self
            .http
            .patch(url)
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", PREFER_REPRESENTATION)
            .json(&patch)
            .send()
            .await?;
        let body = Self::handle_json(resp).await?;
        Self::single_row(body, table, id)
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), Error> {
        let url = self.table_url(table)?;
        debug!("DELETE {url} id={id}");

        let resp = self
            .http
            .delete(url)
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", PREFER_REPRESENTATION)
            .send()
            .await?;
        let body = Self::handle_json(resp).await?;
        Self::single_row(body, table, id).map(|_| ())
    }
}
