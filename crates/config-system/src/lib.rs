//! Saved chart configurations and style resolution
//!
//! Users save chart configurations from the portal UI into two independent
//! stores. This crate models those entries, reads and writes both stores
//! through a string-level backend trait, and resolves the effective chart
//! style by layering the most recent saved entry over built-in per-series
//! defaults.

use chrono::{DateTime, Utc};
use portal_charts_shared::{Series, SeriesKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod backends;
pub mod defaults;
pub mod store;

pub use backends::{JsonFileBackend, MemoryBackend};
pub use defaults::{default_style, merge_style};
pub use store::{ConfigBackend, ConfigurationStore};

/// Chart renderings the portal supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
    Pie,
    Doughnut,
}

impl ChartKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Line => "line",
            ChartKind::Bar => "bar",
            ChartKind::Pie => "pie",
            ChartKind::Doughnut => "doughnut",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognized chart kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownChartKind(pub String);

impl fmt::Display for UnknownChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown chart kind: {}", self.0)
    }
}

impl std::error::Error for UnknownChartKind {}

impl FromStr for ChartKind {
    type Err = UnknownChartKind;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "line" => Ok(ChartKind::Line),
            "bar" => Ok(ChartKind::Bar),
            "pie" => Ok(ChartKind::Pie),
            "doughnut" => Ok(ChartKind::Doughnut),
            other => Err(UnknownChartKind(other.to_string())),
        }
    }
}

/// Per-chart display switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleToggles {
    pub grid: bool,
    pub legend: bool,
    pub tooltips: bool,
    pub animation: bool,
}

impl Default for StyleToggles {
    fn default() -> Self {
        Self {
            grid: true,
            legend: true,
            tooltips: true,
            animation: true,
        }
    }
}

/// Which of the two stores an entry lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreOrigin {
    #[default]
    Primary,
    Secondary,
}

impl fmt::Display for StoreOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreOrigin::Primary => f.write_str("primary"),
            StoreOrigin::Secondary => f.write_str("secondary"),
        }
    }
}

/// Error returned when parsing an unrecognized store name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStoreOrigin(pub String);

impl fmt::Display for UnknownStoreOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown store: {}", self.0)
    }
}

impl std::error::Error for UnknownStoreOrigin {}

impl FromStr for StoreOrigin {
    type Err = UnknownStoreOrigin;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" => Ok(StoreOrigin::Primary),
            "secondary" => Ok(StoreOrigin::Secondary),
            other => Err(UnknownStoreOrigin(other.to_string())),
        }
    }
}

/// One saved chart configuration.
///
/// The wire format keeps the portal's camelCase field names so stores written
/// by older deployments round-trip unchanged. `origin` is derived from the
/// store an entry was read from and never persisted. Optional style fields
/// mean "not set here, fall back to the default".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedConfiguration {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_kind: Option<ChartKind>,
    pub data_source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_primary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toggles: Option<StyleToggles>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Series>,
    pub saved_at: DateTime<Utc>,
    #[serde(skip)]
    pub origin: StoreOrigin,
}

impl SavedConfiguration {
    /// Minimal entry for a series key, saved now, everything else default
    pub fn for_series(name: impl Into<String>, key: SeriesKey) -> Self {
        Self {
            name: name.into(),
            chart_kind: None,
            data_source: key.as_str().to_string(),
            color_primary: None,
            toggles: None,
            data: None,
            saved_at: Utc::now(),
            origin: StoreOrigin::Primary,
        }
    }

    /// The series key this entry configures, if `data_source` names one
    pub fn series_key(&self) -> Option<SeriesKey> {
        SeriesKey::from_str(&self.data_source).ok()
    }
}

/// Fully resolved style handed to the render capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveStyle {
    pub chart_kind: ChartKind,
    pub color_primary: String,
    pub toggles: StyleToggles,
    pub title: String,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store {label} I/O failed: {message}")]
    Io { label: String, message: String },

    #[error("store {label} holds data that does not serialize: {message}")]
    Corrupt { label: String, message: String },

    #[error("no entry {index} in the {origin} store")]
    NoSuchEntry { origin: StoreOrigin, index: usize },
}

pub type Result<T> = std::result::Result<T, StoreError>;
