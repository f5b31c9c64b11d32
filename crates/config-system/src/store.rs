//! Dual-store configuration persistence

use crate::{Result, SavedConfiguration, StoreError, StoreOrigin};
use log::{debug, warn};

/// String-level storage a configuration store writes through.
///
/// Implementations persist one opaque string (the serialized entry list);
/// they never interpret it.
pub trait ConfigBackend: Send + Sync {
    /// Short name used in diagnostics
    fn label(&self) -> &str;

    fn read(&self) -> Result<Option<String>>;

    fn write(&self, contents: &str) -> Result<()>;

    fn clear(&self) -> Result<()>;
}

/// Two independent stores of saved configurations.
///
/// The stores are peers: entries are saved to one or the other and never
/// migrated between them. Resolution picks the most recently saved entry
/// across both. A store whose persisted contents fail to parse is treated
/// as empty for the call and only reported through the log.
pub struct ConfigurationStore {
    primary: Box<dyn ConfigBackend>,
    secondary: Box<dyn ConfigBackend>,
}

impl ConfigurationStore {
    pub fn new(primary: Box<dyn ConfigBackend>, secondary: Box<dyn ConfigBackend>) -> Self {
        Self { primary, secondary }
    }

    /// Append `config` to the store named by its `origin`
    pub fn save(&self, config: &SavedConfiguration) -> Result<()> {
        let origin = config.origin;
        let mut entries = self.read_entries(origin);
        entries.push(config.clone());
        self.write_entries(origin, &entries)?;
        debug!(
            "saved configuration '{}' to the {} store ({} entries)",
            config.name,
            origin,
            entries.len()
        );
        Ok(())
    }

    /// Every saved entry, primary store first, each tagged with its origin
    pub fn list(&self) -> Vec<SavedConfiguration> {
        let mut entries = self.read_entries(StoreOrigin::Primary);
        entries.extend(self.read_entries(StoreOrigin::Secondary));
        entries
    }

    /// The configuration that currently applies: the later of the two
    /// stores' most recent entries. On an equal `saved_at` the primary
    /// store wins. `None` when both stores are empty.
    pub fn resolve_effective(&self) -> Option<SavedConfiguration> {
        let primary = self.read_entries(StoreOrigin::Primary).pop();
        let secondary = self.read_entries(StoreOrigin::Secondary).pop();

        match (primary, secondary) {
            (Some(p), Some(s)) => {
                if s.saved_at > p.saved_at {
                    Some(s)
                } else {
                    Some(p)
                }
            }
            (Some(p), None) => Some(p),
            (None, Some(s)) => Some(s),
            (None, None) => None,
        }
    }

    /// Remove the entry at `index` within one store
    pub fn delete(&self, origin: StoreOrigin, index: usize) -> Result<()> {
        let mut entries = self.read_entries(origin);
        if index >= entries.len() {
            return Err(StoreError::NoSuchEntry { origin, index });
        }
        entries.remove(index);
        self.write_entries(origin, &entries)
    }

    /// Empty both stores
    pub fn clear_all(&self) -> Result<()> {
        self.backend(StoreOrigin::Primary).clear()?;
        self.backend(StoreOrigin::Secondary).clear()
    }

    fn backend(&self, origin: StoreOrigin) -> &dyn ConfigBackend {
        match origin {
            StoreOrigin::Primary => self.primary.as_ref(),
            StoreOrigin::Secondary => self.secondary.as_ref(),
        }
    }

    /// Entries of one store, tagged with their origin. Unreadable or
    /// unparseable contents degrade to an empty list.
    fn read_entries(&self, origin: StoreOrigin) -> Vec<SavedConfiguration> {
        let backend = self.backend(origin);
        let contents = match backend.read() {
            Ok(Some(contents)) => contents,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!("reading the {} store failed: {}", backend.label(), err);
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<SavedConfiguration>>(&contents) {
            Ok(mut entries) => {
                for entry in &mut entries {
                    entry.origin = origin;
                }
                entries
            }
            Err(err) => {
                warn!(
                    "the {} store holds corrupt data, treating it as empty: {}",
                    backend.label(),
                    err
                );
                Vec::new()
            }
        }
    }

    fn write_entries(&self, origin: StoreOrigin, entries: &[SavedConfiguration]) -> Result<()> {
        let backend = self.backend(origin);
        let contents = serde_json::to_string(entries).map_err(|e| StoreError::Corrupt {
            label: backend.label().to_string(),
            message: e.to_string(),
        })?;
        backend.write(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryBackend;
    use chrono::{DateTime, Utc};
    use portal_charts_shared::SeriesKey;

    fn store_with_handles() -> (ConfigurationStore, MemoryBackend, MemoryBackend) {
        let primary = MemoryBackend::new("primary");
        let secondary = MemoryBackend::new("secondary");
        let store = ConfigurationStore::new(
            Box::new(primary.clone()),
            Box::new(secondary.clone()),
        );
        (store, primary, secondary)
    }

    fn entry(name: &str, saved_at: &str, origin: StoreOrigin) -> SavedConfiguration {
        let mut config = SavedConfiguration::for_series(name, SeriesKey::Empresas);
        config.saved_at = saved_at.parse::<DateTime<Utc>>().unwrap();
        config.origin = origin;
        config
    }

    #[test]
    fn test_save_appends_within_origin() {
        let (store, primary, secondary) = store_with_handles();

        store
            .save(&entry("a", "2026-01-01T00:00:00Z", StoreOrigin::Primary))
            .unwrap();
        store
            .save(&entry("b", "2026-01-02T00:00:00Z", StoreOrigin::Primary))
            .unwrap();
        store
            .save(&entry("c", "2026-01-03T00:00:00Z", StoreOrigin::Secondary))
            .unwrap();

        let listed = store.list();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].name, "a");
        assert_eq!(listed[1].name, "b");
        assert_eq!(listed[2].name, "c");
        assert_eq!(listed[0].origin, StoreOrigin::Primary);
        assert_eq!(listed[2].origin, StoreOrigin::Secondary);

        assert!(primary.raw().unwrap().contains("\"a\""));
        assert!(!primary.raw().unwrap().contains("\"c\""));
        assert!(secondary.raw().unwrap().contains("\"c\""));
    }

    #[test]
    fn test_resolution_picks_most_recent_across_stores() {
        let (store, _, _) = store_with_handles();

        store
            .save(&entry("vieja", "2026-01-01T00:00:00Z", StoreOrigin::Primary))
            .unwrap();
        store
            .save(&entry("nueva", "2026-02-01T00:00:00Z", StoreOrigin::Secondary))
            .unwrap();

        let effective = store.resolve_effective().unwrap();
        assert_eq!(effective.name, "nueva");
        assert_eq!(effective.origin, StoreOrigin::Secondary);
    }

    #[test]
    fn test_resolution_compares_last_entries_only() {
        let (store, _, _) = store_with_handles();

        // The primary store's LAST entry is older than its first
        store
            .save(&entry("reciente", "2026-03-01T00:00:00Z", StoreOrigin::Primary))
            .unwrap();
        store
            .save(&entry("restaurada", "2026-01-15T00:00:00Z", StoreOrigin::Primary))
            .unwrap();
        store
            .save(&entry("media", "2026-02-01T00:00:00Z", StoreOrigin::Secondary))
            .unwrap();

        // Last primary (Jan 15) vs last secondary (Feb 1)
        assert_eq!(store.resolve_effective().unwrap().name, "media");
    }

    #[test]
    fn test_resolution_tie_prefers_primary() {
        let (store, _, _) = store_with_handles();
        let at = "2026-01-10T12:00:00Z";

        store.save(&entry("p", at, StoreOrigin::Primary)).unwrap();
        store.save(&entry("s", at, StoreOrigin::Secondary)).unwrap();

        assert_eq!(store.resolve_effective().unwrap().name, "p");
    }

    #[test]
    fn test_resolution_with_one_or_no_stores() {
        let (store, _, _) = store_with_handles();
        assert!(store.resolve_effective().is_none());

        store
            .save(&entry("solo", "2026-01-01T00:00:00Z", StoreOrigin::Secondary))
            .unwrap();
        assert_eq!(store.resolve_effective().unwrap().name, "solo");
    }

    #[test]
    fn test_corrupt_store_degrades_to_empty() {
        let (store, primary, _) = store_with_handles();

        store
            .save(&entry("sana", "2026-01-01T00:00:00Z", StoreOrigin::Secondary))
            .unwrap();
        primary.inject_raw("{definitely not a json array");

        let listed = store.list();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "sana");
        assert_eq!(store.resolve_effective().unwrap().name, "sana");
    }

    #[test]
    fn test_save_overwrites_corrupt_store() {
        let (store, primary, _) = store_with_handles();
        primary.inject_raw("\u{0}garbage\u{0}");

        store
            .save(&entry("fresca", "2026-01-01T00:00:00Z", StoreOrigin::Primary))
            .unwrap();

        let listed = store.list();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "fresca");
    }

    #[test]
    fn test_delete_by_origin_and_index() {
        let (store, _, _) = store_with_handles();

        store
            .save(&entry("a", "2026-01-01T00:00:00Z", StoreOrigin::Primary))
            .unwrap();
        store
            .save(&entry("b", "2026-01-02T00:00:00Z", StoreOrigin::Primary))
            .unwrap();

        store.delete(StoreOrigin::Primary, 0).unwrap();
        let listed = store.list();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "b");

        let err = store.delete(StoreOrigin::Primary, 5).unwrap_err();
        assert!(matches!(
            err,
            StoreError::NoSuchEntry {
                origin: StoreOrigin::Primary,
                index: 5
            }
        ));
        // Deleting from the untouched secondary store also reports cleanly
        assert!(store.delete(StoreOrigin::Secondary, 0).is_err());
    }

    #[test]
    fn test_clear_all_empties_both_stores() {
        let (store, primary, secondary) = store_with_handles();

        store
            .save(&entry("p", "2026-01-01T00:00:00Z", StoreOrigin::Primary))
            .unwrap();
        store
            .save(&entry("s", "2026-01-01T00:00:00Z", StoreOrigin::Secondary))
            .unwrap();

        store.clear_all().unwrap();
        assert!(store.list().is_empty());
        assert!(primary.raw().is_none());
        assert!(secondary.raw().is_none());
    }

    #[test]
    fn test_entries_never_migrate_between_stores() {
        let (store, primary, secondary) = store_with_handles();

        store
            .save(&entry("fija", "2026-01-01T00:00:00Z", StoreOrigin::Secondary))
            .unwrap();
        // Resolution and listing must not move the entry into primary
        store.resolve_effective();
        store.list();

        assert!(primary.raw().is_none());
        assert!(secondary.raw().unwrap().contains("fija"));
    }
}
