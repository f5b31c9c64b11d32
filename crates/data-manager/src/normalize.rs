//! Record normalizer: any origin shape in, canonical records out.
//!
//! Field names drift between endpoints and portal versions, so every slot of
//! the canonical record is resolved through the ordered candidate lists in
//! the shared schema table. Records are never dropped: a record with no
//! numeric field gets a bounded synthetic value and a provenance flag.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use log::debug;
use portal_charts_shared::{
    coerce_numeric, schema::month_abbrev, AggregateSnapshot, CanonicalRecord, RecordId, Series,
    SeriesKey, SeriesSchema, SYNTHETIC_FLAG, SYNTHETIC_VALUE_RANGE,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Map, Value};

use crate::client::RawSeries;

/// Points produced when expanding an aggregate answer into a progression
pub const AGGREGATE_POINTS: usize = 6;

/// Growth rate assumed when an aggregate answer omits it
const DEFAULT_GROWTH_PERCENT: f64 = 10.0;

pub struct RecordNormalizer {
    rng: StdRng,
}

impl RecordNormalizer {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Seeded variant so synthetic substitutions are reproducible
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Normalize a raw payload into a canonical series. Array input maps
    /// record-for-record; an aggregate input expands into a short
    /// progression ending exactly at its total.
    pub fn normalize(&mut self, raw: &RawSeries, key: SeriesKey) -> Series {
        match raw {
            RawSeries::Records(items) => self.normalize_records(items, key),
            RawSeries::Aggregate(snapshot) => self.expand_aggregate(snapshot, key),
        }
    }

    fn normalize_records(&mut self, items: &[Value], key: SeriesKey) -> Series {
        let schema = key.schema();
        let records = items
            .iter()
            .enumerate()
            .map(|(index, item)| self.normalize_one(index, item, schema))
            .collect();
        Series::from_records(records)
    }

    fn normalize_one(&mut self, index: usize, item: &Value, schema: &SeriesSchema) -> CanonicalRecord {
        let empty = Map::new();
        let fields = item.as_object().unwrap_or(&empty);
        let mut consumed: Vec<&str> = Vec::new();

        let label = match first_present(fields, schema.label_fields, &mut consumed) {
            Some(value) => label_text(value),
            None => None,
        }
        .unwrap_or_else(|| format!("Punto {}", index + 1));

        let mut value = match first_numeric(fields, schema.value_fields, &mut consumed) {
            Some(v) => Some(v),
            // A bare numeric element ("data":[15,"22"]) is its own value
            None if !item.is_object() => coerce_numeric(item),
            None => None,
        };

        let category = first_present(fields, schema.category_fields, &mut consumed)
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| "general".to_string());

        let timestamp = first_present(fields, schema.timestamp_fields, &mut consumed)
            .and_then(parse_timestamp)
            .unwrap_or_else(Utc::now);

        let id = first_present(fields, schema.id_fields, &mut consumed)
            .and_then(record_id)
            .unwrap_or(RecordId::Int(index as i64));

        let mut extra: Map<String, Value> = fields
            .iter()
            .filter(|(name, _)| !consumed.contains(&name.as_str()))
            .map(|(name, v)| (name.clone(), v.clone()))
            .collect();

        let value = match value.take() {
            Some(v) => v,
            None => {
                let (lo, hi) = SYNTHETIC_VALUE_RANGE;
                let substitute = self.rng.gen_range(lo..=hi);
                debug!(
                    "record {} of {} had no numeric field, substituting {}",
                    index, schema.key, substitute
                );
                extra.insert(SYNTHETIC_FLAG.to_string(), Value::Bool(true));
                substitute as f64
            }
        };

        CanonicalRecord {
            id,
            label,
            value,
            category,
            timestamp,
            extra,
        }
    }

    /// Expand an aggregate `{ total, porcentaje_crecimiento }` answer into a
    /// non-decreasing monthly progression whose final point equals the total
    /// exactly. Intermediate points are synthesized; the final one is not.
    fn expand_aggregate(&mut self, snapshot: &AggregateSnapshot, key: SeriesKey) -> Series {
        let now = Utc::now();
        self.expand_aggregate_at(snapshot, key, now)
    }

    fn expand_aggregate_at(
        &mut self,
        snapshot: &AggregateSnapshot,
        key: SeriesKey,
        now: DateTime<Utc>,
    ) -> Series {
        // Negative growth would make the progression decrease, which the
        // series contract forbids; flatten it instead.
        let growth = snapshot
            .growth_percent
            .filter(|g| g.is_finite())
            .unwrap_or(DEFAULT_GROWTH_PERCENT)
            .max(0.0);
        let ratio = 1.0 + growth / 100.0;

        let mut values = vec![0.0; AGGREGATE_POINTS];
        values[AGGREGATE_POINTS - 1] = snapshot.total;
        for i in (0..AGGREGATE_POINTS - 1).rev() {
            // Dividing a negative total moves it toward zero, above the next
            // point; clamp so the walk never exceeds it.
            values[i] = (values[i + 1] / ratio).floor().min(values[i + 1]);
        }

        let records = values
            .iter()
            .enumerate()
            .map(|(i, &value)| {
                let months_back = (AGGREGATE_POINTS - 1 - i) as i32;
                let (year, month0) = shift_month(now.year(), now.month0() as i32, -months_back);
                let timestamp = Utc
                    .with_ymd_and_hms(year, month0 as u32 + 1, 1, 0, 0, 0)
                    .single()
                    .unwrap_or(now);

                let mut extra = Map::new();
                if i < AGGREGATE_POINTS - 1 {
                    extra.insert(SYNTHETIC_FLAG.to_string(), Value::Bool(true));
                }

                CanonicalRecord {
                    id: RecordId::Int(i as i64),
                    label: month_abbrev(month0 as usize).to_string(),
                    value,
                    category: "general".to_string(),
                    timestamp,
                    extra,
                }
            })
            .collect();

        debug!(
            "expanded aggregate for {} into {} points ending at {}",
            key, AGGREGATE_POINTS, snapshot.total
        );
        Series::from_records(records)
    }
}

impl Default for RecordNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// First candidate field present in the record; the winner is consumed so it
/// does not also land in `extra`
fn first_present<'a>(
    fields: &'a Map<String, Value>,
    candidates: &[&'static str],
    consumed: &mut Vec<&'a str>,
) -> Option<&'a Value> {
    for candidate in candidates {
        if let Some((name, value)) = fields.get_key_value(*candidate) {
            consumed.push(name.as_str());
            return Some(value);
        }
    }
    None
}

/// First candidate field that coerces to a finite number. Non-coercible
/// candidates are skipped, not zeroed, and stay out of `consumed`.
fn first_numeric<'a>(
    fields: &'a Map<String, Value>,
    candidates: &[&'static str],
    consumed: &mut Vec<&'a str>,
) -> Option<f64> {
    for candidate in candidates {
        if let Some((name, value)) = fields.get_key_value(*candidate) {
            if let Some(v) = coerce_numeric(value) {
                consumed.push(name.as_str());
                return Some(v);
            }
        }
    }
    None
}

fn label_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn record_id(value: &Value) -> Option<RecordId> {
    match value {
        Value::Number(n) => n.as_i64().map(RecordId::Int),
        Value::String(s) if !s.is_empty() => Some(RecordId::Text(s.clone())),
        _ => None,
    }
}

/// Accepts RFC 3339, bare dates, and epoch seconds
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                return date
                    .and_hms_opt(0, 0, 0)
                    .map(|naive| Utc.from_utc_datetime(&naive));
            }
            None
        }
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        _ => None,
    }
}

/// Month arithmetic on (year, zero-based month)
fn shift_month(year: i32, month0: i32, delta: i32) -> (i32, i32) {
    let total = year * 12 + month0 + delta;
    (total.div_euclid(12), total.rem_euclid(12))
}
