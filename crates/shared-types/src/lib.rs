//! Shared types for the Portal Charts pipeline
//!
//! This crate contains the canonical statistics vocabulary shared between the
//! data-manager, config-system, and pipeline crates: series keys, canonical
//! records, and the per-key schema table that drives field-name resolution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

pub mod schema;

pub use schema::{SeriesSchema, MONTH_ABBREV, SYNTHETIC_FLAG, SYNTHETIC_VALUE_RANGE};

/// Logical identifier of a statistic family tracked by the portal.
///
/// Each key selects which endpoints, candidate field names, and synthetic
/// generator parameters apply. The set mirrors the portal's admin areas
/// (companies, users, events).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKey {
    Empresas,
    Usuarios,
    Eventos,
}

impl SeriesKey {
    pub const ALL: [SeriesKey; 3] = [SeriesKey::Empresas, SeriesKey::Usuarios, SeriesKey::Eventos];

    pub fn as_str(&self) -> &'static str {
        match self {
            SeriesKey::Empresas => "empresas",
            SeriesKey::Usuarios => "usuarios",
            SeriesKey::Eventos => "eventos",
        }
    }

    /// Schema table entry for this key
    pub fn schema(&self) -> &'static SeriesSchema {
        schema::schema_for(*self)
    }

    /// Query action selecting this key's historical series on an origin
    pub fn historico_action(&self) -> String {
        format!("{}_historico", self.as_str())
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognized series key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSeriesKey(pub String);

impl fmt::Display for UnknownSeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown series key: {}", self.0)
    }
}

impl std::error::Error for UnknownSeriesKey {}

impl FromStr for SeriesKey {
    type Err = UnknownSeriesKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "empresas" => Ok(SeriesKey::Empresas),
            "usuarios" => Ok(SeriesKey::Usuarios),
            "eventos" => Ok(SeriesKey::Eventos),
            other => Err(UnknownSeriesKey(other.to_string())),
        }
    }
}

/// Record identifier as delivered by the origins (numeric or string)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(n) => write!(f, "{}", n),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

/// One normalized data point.
///
/// `value` is always a finite number after normalization; records whose value
/// had to be synthesized carry `extra["synthetic"] = true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub id: RecordId,
    pub label: String,
    pub value: f64,
    pub category: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, Value>,
}

impl CanonicalRecord {
    pub fn is_synthetic(&self) -> bool {
        matches!(self.extra.get(SYNTHETIC_FLAG), Some(Value::Bool(true)))
    }
}

/// Ordered sequence of canonical records.
///
/// Insertion order is display order. A normalized series is never empty;
/// empty source payloads trigger fallback generation upstream instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Series {
    records: Vec<CanonicalRecord>,
}

impl Series {
    pub fn from_records(records: Vec<CanonicalRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[CanonicalRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&CanonicalRecord> {
        self.records.last()
    }

    /// Labels in display order, ready for the render capability
    pub fn labels(&self) -> Vec<String> {
        self.records.iter().map(|r| r.label.clone()).collect()
    }

    /// Values in display order, ready for the render capability
    pub fn values(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.value).collect()
    }
}

impl IntoIterator for Series {
    type Item = CanonicalRecord;
    type IntoIter = std::vec::IntoIter<CanonicalRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

/// Whether a series came from a live source or the synthetic generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Live,
    Synthetic,
}

/// Aggregate answer some origins return instead of a time series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregateSnapshot {
    pub total: f64,
    #[serde(
        rename = "porcentaje_crecimiento",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub growth_percent: Option<f64>,
}

impl AggregateSnapshot {
    /// Extract a snapshot from a raw JSON object, tolerating the stringly
    /// numerics the PHP origins emit. Requires a finite `total`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let total = coerce_numeric(obj.get("total")?)?;
        let growth_percent = obj
            .get("porcentaje_crecimiento")
            .and_then(coerce_numeric);
        Some(Self {
            total,
            growth_percent,
        })
    }
}

/// Numeric coercion rule shared by the normalizer and aggregate extraction:
/// JSON numbers are accepted when finite; numeric strings are parsed with
/// base-10 integer parsing. Anything else is skipped, never zeroed.
pub fn coerce_numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => s.trim().parse::<i64>().ok().map(|v| v as f64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_series_key_round_trip() {
        for key in SeriesKey::ALL {
            assert_eq!(key.as_str().parse::<SeriesKey>().unwrap(), key);
        }
        assert_eq!("EMPRESAS".parse::<SeriesKey>().unwrap(), SeriesKey::Empresas);
        assert!("ventas".parse::<SeriesKey>().is_err());
    }

    #[test]
    fn test_historico_action() {
        assert_eq!(SeriesKey::Usuarios.historico_action(), "usuarios_historico");
    }

    #[test]
    fn test_coerce_numeric() {
        assert_eq!(coerce_numeric(&json!(15)), Some(15.0));
        assert_eq!(coerce_numeric(&json!(3.5)), Some(3.5));
        assert_eq!(coerce_numeric(&json!("15")), Some(15.0));
        assert_eq!(coerce_numeric(&json!(" 42 ")), Some(42.0));
        // Base-10 integer parsing only: non-integer strings are skipped
        assert_eq!(coerce_numeric(&json!("15.5")), None);
        assert_eq!(coerce_numeric(&json!("abc")), None);
        assert_eq!(coerce_numeric(&json!(true)), None);
        assert_eq!(coerce_numeric(&json!(null)), None);
    }

    #[test]
    fn test_aggregate_from_value() {
        let snap =
            AggregateSnapshot::from_value(&json!({"total": 120, "porcentaje_crecimiento": 8.5}))
                .unwrap();
        assert_eq!(snap.total, 120.0);
        assert_eq!(snap.growth_percent, Some(8.5));

        let stringly = AggregateSnapshot::from_value(&json!({"total": "120"})).unwrap();
        assert_eq!(stringly.total, 120.0);
        assert_eq!(stringly.growth_percent, None);

        assert!(AggregateSnapshot::from_value(&json!({"count": 3})).is_none());
        assert!(AggregateSnapshot::from_value(&json!([1, 2])).is_none());
    }

    #[test]
    fn test_series_accessors() {
        let series = Series::from_records(vec![
            CanonicalRecord {
                id: RecordId::Int(0),
                label: "Ene".to_string(),
                value: 10.0,
                category: "general".to_string(),
                timestamp: Utc::now(),
                extra: serde_json::Map::new(),
            },
            CanonicalRecord {
                id: RecordId::Text("b".to_string()),
                label: "Feb".to_string(),
                value: 12.0,
                category: "general".to_string(),
                timestamp: Utc::now(),
                extra: serde_json::Map::new(),
            },
        ]);

        assert_eq!(series.len(), 2);
        assert_eq!(series.labels(), vec!["Ene", "Feb"]);
        assert_eq!(series.values(), vec![10.0, 12.0]);
        assert_eq!(series.last().unwrap().label, "Feb");
    }

    #[test]
    fn test_series_serializes_as_bare_array() {
        let series = Series::from_records(vec![CanonicalRecord {
            id: RecordId::Int(1),
            label: "Ene".to_string(),
            value: 15.0,
            category: "general".to_string(),
            timestamp: "2026-01-01T00:00:00Z".parse().unwrap(),
            extra: serde_json::Map::new(),
        }]);

        let text = serde_json::to_string(&series).unwrap();
        assert!(text.starts_with('['), "expected bare array, got {}", text);

        let back: Series = serde_json::from_str(&text).unwrap();
        assert_eq!(back, series);
    }

    #[test]
    fn test_synthetic_flag_detection() {
        let mut extra = serde_json::Map::new();
        extra.insert(SYNTHETIC_FLAG.to_string(), Value::Bool(true));
        let record = CanonicalRecord {
            id: RecordId::Int(0),
            label: "Ene".to_string(),
            value: 7.0,
            category: "general".to_string(),
            timestamp: Utc::now(),
            extra,
        };
        assert!(record.is_synthetic());
    }
}
