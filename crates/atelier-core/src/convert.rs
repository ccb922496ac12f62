// ── Row-to-domain conversions ──
//
// Bridges raw JSON rows from the row store into typed records and back.
// The `lenient` helpers absorb the shape drift seen in hand-edited
// tables: tags stored as comma-separated text, numbers stored as strings,
// timestamps without an offset, nulls where a default is expected.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::CoreError;

/// Decode one row into a typed record, naming the table on failure.
pub(crate) fn decode_row<T: DeserializeOwned>(table: &str, row: Value) -> Result<T, CoreError> {
    serde_json::from_value(row).map_err(|e| CoreError::Decode {
        table: table.to_owned(),
        message: e.to_string(),
    })
}

/// Decode a full result set. One bad row fails the whole batch.
pub(crate) fn decode_rows<T: DeserializeOwned>(
    table: &str,
    rows: Vec<Value>,
) -> Result<Vec<T>, CoreError> {
    rows.into_iter().map(|row| decode_row(table, row)).collect()
}

/// Encode a create/update payload as a JSON row object.
pub(crate) fn encode<P: Serialize>(table: &str, payload: &P) -> Result<Value, CoreError> {
    serde_json::to_value(payload).map_err(|e| {
        CoreError::Internal(format!("could not encode payload for '{table}': {e}"))
    })
}

// ── Lenient field deserializers ─────────────────────────────────────

pub(crate) mod lenient {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Tags: JSON array of strings, comma-separated text, or null.
    pub(crate) fn tags<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s.trim().to_owned()),
                    Value::Null => None,
                    other => Some(other.to_string()),
                })
                .filter(|s| !s.is_empty())
                .collect(),
            Some(Value::String(s)) => split_tags(&s),
            _ => Vec::new(),
        })
    }

    pub(crate) fn split_tags(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect()
    }

    /// Optional timestamp in RFC 3339, Postgres text form, or a bare date.
    pub(crate) fn timestamp<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        Ok(raw.as_deref().and_then(parse_timestamp))
    }

    pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
            return Some(dt.with_timezone(&Utc));
        }
        for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
                return Some(naive.and_utc());
            }
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }

    /// Optional float from a JSON number or numeric text (`"12,500.00"` included).
    pub(crate) fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().replace(',', "").parse().ok(),
            _ => None,
        })
    }

    /// Optional integer from a JSON number or numeric text.
    pub(crate) fn integer<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i32>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Number(n)) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        })
    }

    /// Boolean where null or absent means `false`.
    pub(crate) fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Bool(b)) => b,
            Some(Value::String(s)) => matches!(s.trim().to_lowercase().as_str(), "true" | "yes"),
            _ => false,
        })
    }

    /// Any field where null should fall back to the type's default.
    pub(crate) fn or_default<'de, D, T>(d: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Default + Deserialize<'de>,
    {
        Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
    }
}
