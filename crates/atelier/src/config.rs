//! CLI configuration: thin wrapper around `atelier_config` shared types.
//!
//! Re-exports the shared types and adds CLI-specific resolution that
//! respects `GlobalOpts` flag overrides (--url, --api-key, etc.).

use std::time::Duration;

use secrecy::SecretString;

use atelier_core::{StoreConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use atelier_config::{
    Config, Profile, config_path, load_config, load_config_or_default, save_config,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build a `StoreConfig` from the config file, active profile, and flags.
pub fn build_store_config(global: &GlobalOpts) -> Result<StoreConfig, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    if let Some(profile) = cfg.profiles.get(&profile_name) {
        return resolve_profile(profile, &profile_name, &cfg, global);
    }

    // No profile: build from flags / env vars alone.
    let url_str = global.url.as_deref().ok_or_else(|| CliError::NoConfig {
        path: config_path().display().to_string(),
    })?;
    let url = atelier_config::parse_url(url_str)?;
    let key = global
        .api_key
        .as_ref()
        .ok_or(CliError::NoCredentials {
            profile: profile_name,
        })?;

    let mut store = StoreConfig::new(url, SecretString::from(key.clone()));
    if global.insecure {
        store.tls = TlsVerification::DangerAcceptInvalid;
    }
    store.timeout = Duration::from_secs(global.timeout);
    Ok(store)
}

/// Translate a `Profile` + global flags into a `StoreConfig`.
///
/// CLI flag overrides take priority over profile values.
fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<StoreConfig, CliError> {
    // 1. URL (flag > env > profile)
    let url = atelier_config::parse_url(global.url.as_deref().unwrap_or(&profile.url))?;

    // 2. API key (flag > profile chain)
    let api_key = match global.api_key {
        Some(ref key) => SecretString::from(key.clone()),
        None => atelier_config::resolve_api_key(profile, profile_name)?,
    };

    // 3. TLS verification
    let tls = if global.insecure {
        TlsVerification::DangerAcceptInvalid
    } else {
        atelier_config::tls_for(profile, &cfg.defaults)
    };

    let mut store = StoreConfig::new(url, api_key);
    store.tls = tls;
    store.timeout = Duration::from_secs(global.timeout);
    store.revalidate_interval_secs = profile.revalidate_interval.unwrap_or(0);
    Ok(store)
}
