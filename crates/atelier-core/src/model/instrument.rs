// ── Instrument domain types ──

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity_id::EntityId;
use super::validate::{Validate, check_text, check_year};
use crate::convert::lenient;
use crate::error::CoreError;

/// Inventory status of an instrument.
///
/// Unknown values read from the store are preserved in `Other` so a
/// round-trip never rewrites them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InstrumentStatus {
    #[default]
    Available,
    Booked,
    Sold,
    Reserved,
    Maintenance,
    Other(String),
}

impl InstrumentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Available => "Available",
            Self::Booked => "Booked",
            Self::Sold => "Sold",
            Self::Reserved => "Reserved",
            Self::Maintenance => "Maintenance",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for InstrumentStatus {
    fn from(raw: String) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "available" => Self::Available,
            "booked" => Self::Booked,
            "sold" => Self::Sold,
            "reserved" => Self::Reserved,
            "maintenance" => Self::Maintenance,
            _ => Self::Other(raw),
        }
    }
}

impl From<InstrumentStatus> for String {
    fn from(status: InstrumentStatus) -> Self {
        match status {
            InstrumentStatus::Other(s) => s,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for InstrumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stocked or serviced instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub id: EntityId,
    #[serde(default)]
    pub maker: Option<String>,
    #[serde(rename = "type", default)]
    pub type_: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default, deserialize_with = "lenient::integer")]
    pub year: Option<i32>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub status: InstrumentStatus,
    #[serde(default, deserialize_with = "lenient::number")]
    pub price: Option<f64>,
    #[serde(default)]
    pub ownership: Option<String>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub certificate: bool,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Instrument {
    /// "Maker Type (Year)", skipping missing parts.
    pub fn display_name(&self) -> String {
        let mut parts: Vec<String> = [self.maker.as_deref(), self.type_.as_deref()]
            .into_iter()
            .flatten()
            .map(str::to_owned)
            .collect();
        if let Some(year) = self.year {
            parts.push(format!("({year})"));
        }
        if parts.is_empty() {
            self.id.to_string()
        } else {
            parts.join(" ")
        }
    }
}

// ── Payloads ────────────────────────────────────────────────────────

/// Fields for a new instrument row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewInstrument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maker: Option<String>,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub status: InstrumentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ownership: Option<String>,
    #[serde(default)]
    pub certificate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Partial update for an instrument.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstrumentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maker: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<InstrumentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ownership: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

fn check_price(price: Option<f64>) -> Result<(), CoreError> {
    match price {
        Some(p) if !p.is_finite() || p < 0.0 => Err(CoreError::validation(format!(
            "price {p} must be a non-negative amount"
        ))),
        _ => Ok(()),
    }
}

impl Validate for NewInstrument {
    fn validate(&self) -> Result<(), CoreError> {
        if self.type_.trim().is_empty() {
            return Err(CoreError::validation("an instrument needs a type"));
        }
        check_year(self.year)?;
        check_price(self.price)
    }
}

impl Validate for InstrumentPatch {
    fn validate(&self) -> Result<(), CoreError> {
        check_text("type", self.type_.as_deref())?;
        check_year(self.year)?;
        check_price(self.price)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_lenient_row() {
        let inst: Instrument = serde_json::from_value(json!({
            "id": "i1",
            "maker": "Vuillaume",
            "type": "Violin",
            "year": "1850",
            "price": "12,500.00",
            "status": "sold",
            "certificate": null
        }))
        .unwrap();
        assert_eq!(inst.year, Some(1850));
        assert_eq!(inst.price, Some(12500.0));
        assert_eq!(inst.status, InstrumentStatus::Sold);
        assert!(!inst.certificate);
        assert_eq!(inst.display_name(), "Vuillaume Violin (1850)");
    }

    #[test]
    fn unknown_status_round_trips() {
        let status = InstrumentStatus::from("On Loan".to_owned());
        assert_eq!(status, InstrumentStatus::Other("On Loan".into()));
        assert_eq!(serde_json::to_value(&status).unwrap(), json!("On Loan"));
    }

    #[test]
    fn null_status_defaults_to_available() {
        let inst: Instrument = serde_json::from_value(json!({ "id": "i1", "status": null })).unwrap();
        assert_eq!(inst.status, InstrumentStatus::Available);
    }

    #[test]
    fn new_instrument_needs_type_and_sane_year() {
        let mut input = NewInstrument::default();
        assert!(input.validate().is_err());

        input.type_ = "Cello".into();
        assert!(input.validate().is_ok());

        input.year = Some(1200);
        assert!(input.validate().is_err());
    }

    #[test]
    fn new_instrument_serializes_type_key() {
        let input = NewInstrument {
            type_: "Viola".into(),
            ..NewInstrument::default()
        };
        let row = serde_json::to_value(&input).unwrap();
        assert_eq!(row["type"], json!("Viola"));
        assert_eq!(row["status"], json!("Available"));
    }
}
