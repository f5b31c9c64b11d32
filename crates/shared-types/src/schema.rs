//! Declarative per-series-key schema table.
//!
//! The origins never agreed on field names: depending on endpoint and version
//! a companies series may arrive as `empresas`, `total`, or `cantidad`, with
//! labels under `mes` or `nombre`. Instead of scattering that guessing across
//! call sites, every candidate list lives here, ordered by preference, one
//! entry per series key. Candidates are intentionally conservative: only the
//! names the origins have actually been seen to emit, plus generic fallbacks.

use crate::SeriesKey;

/// Key in `CanonicalRecord::extra` marking a synthesized value
pub const SYNTHETIC_FLAG: &str = "synthetic";

/// Range for the normalizer's last-resort synthetic values (inclusive)
pub const SYNTHETIC_VALUE_RANGE: (i64, i64) = (5, 40);

/// Spanish month abbreviations used by the origins and the synthetic labels
pub const MONTH_ABBREV: [&str; 12] = [
    "Ene", "Feb", "Mar", "Abr", "May", "Jun", "Jul", "Ago", "Sep", "Oct", "Nov", "Dic",
];

/// Month abbreviation by zero-based month index
pub fn month_abbrev(month0: usize) -> &'static str {
    MONTH_ABBREV[month0 % 12]
}

/// Field-resolution and fallback parameters for one series key.
///
/// Candidate lists are ordered: the first present (and, for values, the first
/// numeric-coercible) field wins. Each key's own field name comes before the
/// generic fallbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesSchema {
    pub key: SeriesKey,
    /// Human-readable name for status messages and chart titles
    pub display_name: &'static str,
    pub value_fields: &'static [&'static str],
    pub label_fields: &'static [&'static str],
    pub category_fields: &'static [&'static str],
    pub timestamp_fields: &'static [&'static str],
    pub id_fields: &'static [&'static str],
    /// Starting value for a synthetic cumulative series
    pub fallback_base: i64,
    /// Inclusive bounds for the per-month synthetic increment
    pub fallback_step: (i64, i64),
}

const LABEL_FIELDS: &[&str] = &["mes", "nombre", "label"];
const CATEGORY_FIELDS: &[&str] = &["categoria", "tipo", "category"];
const TIMESTAMP_FIELDS: &[&str] = &["fecha", "timestamp", "created_at"];
const ID_FIELDS: &[&str] = &["id"];

static EMPRESAS: SeriesSchema = SeriesSchema {
    key: SeriesKey::Empresas,
    display_name: "Empresas",
    value_fields: &["empresas", "total", "cantidad", "valor", "value"],
    label_fields: LABEL_FIELDS,
    category_fields: CATEGORY_FIELDS,
    timestamp_fields: TIMESTAMP_FIELDS,
    id_fields: ID_FIELDS,
    fallback_base: 10,
    fallback_step: (1, 5),
};

static USUARIOS: SeriesSchema = SeriesSchema {
    key: SeriesKey::Usuarios,
    display_name: "Usuarios",
    value_fields: &["usuarios", "total", "cantidad", "valor", "value"],
    label_fields: LABEL_FIELDS,
    category_fields: CATEGORY_FIELDS,
    timestamp_fields: TIMESTAMP_FIELDS,
    id_fields: ID_FIELDS,
    fallback_base: 25,
    fallback_step: (5, 20),
};

static EVENTOS: SeriesSchema = SeriesSchema {
    key: SeriesKey::Eventos,
    display_name: "Eventos",
    value_fields: &["eventos", "total", "cantidad", "valor", "value"],
    label_fields: LABEL_FIELDS,
    category_fields: CATEGORY_FIELDS,
    timestamp_fields: TIMESTAMP_FIELDS,
    id_fields: ID_FIELDS,
    fallback_base: 2,
    fallback_step: (0, 3),
};

/// Look up the schema entry for a series key
pub fn schema_for(key: SeriesKey) -> &'static SeriesSchema {
    match key {
        SeriesKey::Empresas => &EMPRESAS,
        SeriesKey::Usuarios => &USUARIOS,
        SeriesKey::Eventos => &EVENTOS,
    }
}
