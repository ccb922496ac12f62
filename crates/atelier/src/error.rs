//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use atelier_config::ConfigError;
use atelier_core::{CoreError, EntityKind};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to the store at {url}")]
    #[diagnostic(
        code(atelier::connection_failed),
        help(
            "Check the project URL and your network.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(atelier::auth_failed),
        help(
            "Verify the project API key.\n\
             Run: atelier config set-key"
        )
    )]
    AuthFailed { message: String },

    #[error("No API key configured for profile '{profile}'")]
    #[diagnostic(
        code(atelier::no_credentials),
        help(
            "Configure one with: atelier config init\n\
             Or set the ATELIER_API_KEY environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(atelier::not_found),
        help("Run: atelier {list_command} to see available records")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("Conflict: {message}")]
    #[diagnostic(code(atelier::conflict))]
    Conflict { message: String },

    #[error("Permission denied: {message}")]
    #[diagnostic(
        code(atelier::permission_denied),
        help("The API key's role is not allowed to perform this operation.")
    )]
    PermissionDenied { message: String },

    // ── Store ────────────────────────────────────────────────────────
    #[error("Store error ({code}): {message}")]
    #[diagnostic(code(atelier::store_error))]
    StoreError { code: String, message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(atelier::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(atelier::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: atelier config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No backend configured")]
    #[diagnostic(
        code(atelier::no_config),
        help(
            "Create a profile with: atelier config init\n\
             Expected at: {path}\n\
             Or pass --url and --api-key, or use --offline."
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(atelier::config))]
    Config(Box<ConfigError>),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(atelier::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(atelier::timeout),
        help("Increase the timeout with --timeout or check backend responsiveness.")
    )]
    Timeout { seconds: u64 },

    #[error("Internal error: {0}")]
    #[diagnostic(code(atelier::internal))]
    Internal(String),

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::PermissionDenied { .. } => exit_code::PERMISSION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(Box::new(other)),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },

            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },

            CoreError::Timeout { timeout_secs } => Self::Timeout {
                seconds: timeout_secs,
            },

            CoreError::NotFound {
                entity_type,
                identifier,
            } => {
                let command = EntityKind::ALL
                    .into_iter()
                    .find(|kind| kind.table() == entity_type)
                    .map_or_else(|| entity_type.clone(), |kind| kind.to_string());
                Self::NotFound {
                    list_command: format!("{command} list"),
                    resource_type: entity_type,
                    identifier,
                }
            }

            CoreError::ValidationFailed { message } => Self::Validation {
                field: "input".into(),
                reason: message,
            },

            // SQLSTATE 23xxx: integrity constraint violations.
            CoreError::Store {
                message,
                code: Some(code),
                ..
            } if code.starts_with("23") => Self::Conflict { message },

            CoreError::Store {
                message,
                status: Some(401 | 403),
                ..
            } => Self::PermissionDenied { message },

            CoreError::Store { message, code, .. } => Self::StoreError {
                code: code.unwrap_or_else(|| "unknown".into()),
                message,
            },

            CoreError::Decode { table, message } => Self::StoreError {
                code: "decode".into(),
                message: format!("{table}: {message}"),
            },

            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => Self::Internal(message),
        }
    }
}
