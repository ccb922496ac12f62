//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::sync::Arc;

use atelier_core::{Entity, EntityId, FetchOptions, Hub, Repository, Searchable};

use crate::cli::ListArgs;
use crate::error::CliError;

/// Parse a user-supplied identifier, rejecting blanks.
pub fn parse_id(raw: &str, field: &str) -> Result<EntityId, CliError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CliError::Validation {
            field: field.into(),
            reason: "ID cannot be empty".into(),
        });
    }
    Ok(EntityId::from(trimmed))
}

/// Records for a list command.
///
/// Without `--limit` the kind is loaded through the hub cache and the
/// cached snapshot is returned. With `--limit` one page is read straight
/// from the backend, bypassing the cache.
pub async fn list_records<T>(
    hub: &Hub,
    repo: &Repository<T>,
    args: &ListArgs,
) -> Result<Vec<Arc<T>>, CliError>
where
    T: Entity + Searchable,
{
    let records: Vec<Arc<T>> = match args.limit {
        Some(limit) => {
            let page = repo
                .fetch_page(&FetchOptions::new().page(args.offset, limit))
                .await?;
            tracing::debug!(returned = page.items.len(), total = ?page.total, "page fetched");
            page.items.into_iter().map(Arc::new).collect()
        }
        None => {
            hub.load(T::KIND).await?;
            hub.store().snapshot::<T>().as_ref().clone()
        }
    };

    Ok(match args.filter.as_deref() {
        Some(text) => {
            let needle = text.to_lowercase();
            records
                .into_iter()
                .filter(|r| r.matches_needle(&needle))
                .collect()
        }
        None => records,
    })
}

/// Look up one cached record, loading its kind first.
pub async fn find_record<T: Entity>(hub: &Hub, raw_id: &str) -> Result<Arc<T>, CliError> {
    let id = parse_id(raw_id, "id")?;
    hub.load(T::KIND).await?;
    hub.store().get::<T>(&id).ok_or_else(|| CliError::NotFound {
        resource_type: T::KIND.to_string(),
        identifier: raw_id.into(),
        list_command: format!("{} list", T::KIND),
    })
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: message.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Format an optional text field for detail views.
pub fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("-")
}
