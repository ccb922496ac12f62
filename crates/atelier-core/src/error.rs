// ── Core error types ──
//
// Errors surfaced by the data layer. Consumers never see raw HTTP or
// JSON failures; `From<atelier_api::Error>` folds transport-level errors
// into domain variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach the store at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Entity not found: {entity_type} with id {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    #[error("Could not decode rows from '{table}': {message}")]
    Decode { table: String, message: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── Store errors (wrapped, not exposed raw) ──────────────────────
    #[error("Store error: {message}")]
    Store {
        message: String,
        /// Provider-specific code (a Postgres SQLSTATE or PostgREST code).
        code: Option<String>,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }

    /// Provider error code, when the store supplied one.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Store { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<atelier_api::Error> for CoreError {
    fn from(err: atelier_api::Error) -> Self {
        match err {
            atelier_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            atelier_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Store {
                        message: e.to_string(),
                        code: None,
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            atelier_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            atelier_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            atelier_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            atelier_api::Error::Store {
                message,
                code,
                status,
            } => CoreError::Store {
                message,
                code,
                status,
            },
            atelier_api::Error::NotFound { table, id } => CoreError::NotFound {
                entity_type: table,
                identifier: id,
            },
            atelier_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
            atelier_api::Error::Serialization(e) => {
                CoreError::Internal(format!("Serialization error: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_keeps_code_and_status() {
        let err = CoreError::from(atelier_api::Error::Store {
            message: "duplicate key".into(),
            code: Some("23505".into()),
            status: Some(409),
        });
        assert_eq!(err.code(), Some("23505"));
        assert!(matches!(err, CoreError::Store { status: Some(409), .. }));
    }

    #[test]
    fn missing_row_maps_to_not_found() {
        let err = CoreError::from(atelier_api::Error::NotFound {
            table: "clients".into(),
            id: "c1".into(),
        });
        assert_eq!(err.to_string(), "Entity not found: clients with id c1");
    }
}
