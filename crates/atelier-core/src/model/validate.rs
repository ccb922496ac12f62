// ── Input validation ──
//
// Runs on create/update payloads before any remote call, so a rejected
// payload never reaches the store.

use chrono::{Datelike, Utc};

use crate::error::CoreError;

/// Checked before a payload is sent to the store.
pub trait Validate {
    fn validate(&self) -> Result<(), CoreError>;
}

pub(crate) fn check_email(email: Option<&str>) -> Result<(), CoreError> {
    match email.map(str::trim) {
        Some(e) if !e.is_empty() && !e.contains('@') => Err(CoreError::validation(format!(
            "'{e}' is not an email address"
        ))),
        _ => Ok(()),
    }
}

/// A field that is being set must not be blank.
pub(crate) fn check_text(field: &str, value: Option<&str>) -> Result<(), CoreError> {
    match value {
        Some(v) if v.trim().is_empty() => {
            Err(CoreError::validation(format!("{field} must not be blank")))
        }
        _ => Ok(()),
    }
}

pub(crate) fn check_year(year: Option<i32>) -> Result<(), CoreError> {
    let Some(year) = year else { return Ok(()) };
    let latest = Utc::now().year() + 1;
    if (1500..=latest).contains(&year) {
        Ok(())
    } else {
        Err(CoreError::validation(format!(
            "year {year} is outside 1500..={latest}"
        )))
    }
}
