//! Synthetic series generator used when every origin fails
//!
//! The output imitates a plausible year-to-date cumulative curve for the
//! requested key: one point per elapsed month of the current year, values
//! non-decreasing, every record tagged as synthetic.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use log::info;
use portal_charts_shared::{
    schema::month_abbrev, CanonicalRecord, RecordId, Series, SeriesKey, SYNTHETIC_FLAG,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Map, Value};

/// Upper bound on generated points (a full calendar year)
pub const MAX_FALLBACK_POINTS: usize = 12;

pub struct FallbackSeriesGenerator {
    rng: StdRng,
}

impl FallbackSeriesGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Seeded variant for reproducible series in tests
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generate a synthetic year-to-date series for the key
    pub fn generate(&mut self, key: SeriesKey) -> Series {
        self.generate_at(key, Utc::now())
    }

    /// Like `generate` but with an explicit clock, one point per month from
    /// January through the month of `now`
    pub fn generate_at(&mut self, key: SeriesKey, now: DateTime<Utc>) -> Series {
        let schema = key.schema();
        let months = (now.month() as usize).min(MAX_FALLBACK_POINTS);
        let (step_lo, step_hi) = schema.fallback_step;

        let mut running = schema.fallback_base;
        let records = (0..months)
            .map(|month0| {
                running += self.rng.gen_range(step_lo..=step_hi);
                let timestamp = Utc
                    .with_ymd_and_hms(now.year(), month0 as u32 + 1, 1, 0, 0, 0)
                    .single()
                    .unwrap_or(now);

                let mut extra = Map::new();
                extra.insert(SYNTHETIC_FLAG.to_string(), Value::Bool(true));

                CanonicalRecord {
                    id: RecordId::Int(month0 as i64),
                    label: month_abbrev(month0).to_string(),
                    value: running as f64,
                    category: "general".to_string(),
                    timestamp,
                    extra,
                }
            })
            .collect();

        info!("generated {} synthetic points for {}", months, key);
        Series::from_records(records)
    }
}

impl Default for FallbackSeriesGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(month: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, month, 15, 9, 30, 0).single().unwrap()
    }

    #[test]
    fn test_length_tracks_current_month() {
        let mut generator = FallbackSeriesGenerator::with_seed(42);
        assert_eq!(generator.generate_at(SeriesKey::Empresas, at(1)).len(), 1);
        assert_eq!(generator.generate_at(SeriesKey::Empresas, at(8)).len(), 8);
        assert_eq!(generator.generate_at(SeriesKey::Empresas, at(12)).len(), 12);
    }

    #[test]
    fn test_series_is_never_empty() {
        let mut generator = FallbackSeriesGenerator::with_seed(42);
        for key in SeriesKey::ALL {
            assert!(!generator.generate_at(key, at(1)).is_empty());
        }
    }

    #[test]
    fn test_values_non_decreasing_and_above_base() {
        let mut generator = FallbackSeriesGenerator::with_seed(7);
        for key in SeriesKey::ALL {
            let series = generator.generate_at(key, at(12));
            let values = series.values();
            for pair in values.windows(2) {
                assert!(pair[0] <= pair[1]);
            }
            assert!(values[0] >= key.schema().fallback_base as f64);
        }
    }

    #[test]
    fn test_every_point_tagged_synthetic() {
        let mut generator = FallbackSeriesGenerator::with_seed(7);
        let series = generator.generate_at(SeriesKey::Usuarios, at(6));
        for record in series.records() {
            assert!(record.is_synthetic());
        }
    }

    #[test]
    fn test_labels_and_timestamps_walk_the_year() {
        let mut generator = FallbackSeriesGenerator::with_seed(7);
        let series = generator.generate_at(SeriesKey::Eventos, at(3));

        assert_eq!(series.labels(), vec!["Ene", "Feb", "Mar"]);
        for (i, record) in series.records().iter().enumerate() {
            assert_eq!(record.timestamp.year(), 2026);
            assert_eq!(record.timestamp.month() as usize, i + 1);
            assert_eq!(record.timestamp.day(), 1);
        }
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let a = FallbackSeriesGenerator::with_seed(99).generate_at(SeriesKey::Empresas, at(10));
        let b = FallbackSeriesGenerator::with_seed(99).generate_at(SeriesKey::Empresas, at(10));
        assert_eq!(a, b);
    }
}
