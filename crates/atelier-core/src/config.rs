// ── Runtime store configuration ──
//
// Describes *how* to reach the row store. Carries credentials and
// transport tuning but never touches disk; the CLI builds a
// `StoreConfig` from its profile and hands it to `Hub::connect`.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-hosted stacks with self-signed certs).
    DangerAcceptInvalid,
}

/// Configuration for a single backend project.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Project URL (e.g., `https://abc.supabase.co`).
    pub url: Url,
    /// Project API key, sent as `apikey` and bearer token.
    pub api_key: SecretString,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Request timeout.
    pub timeout: Duration,
    /// How often the background revalidation runs (seconds). 0 = never.
    pub revalidate_interval_secs: u64,
}

impl StoreConfig {
    pub fn new(url: Url, api_key: SecretString) -> Self {
        Self {
            url,
            api_key,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            revalidate_interval_secs: 0,
        }
    }
}
