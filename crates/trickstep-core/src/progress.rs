use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// Key under which the progress snapshot is stored.
pub const PROGRESS_KEY: &str = "trickstep.progress";
/// Highest star rating a level can earn.
pub const MAX_STARS: u8 = 3;

/// Errors from a [`KeyValueStore`] backend.
#[derive(Debug)]
pub enum StoreError {
    /// The backing store does not exist in this environment.
    Unavailable,
    Io(String),
    Encode(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable => write!(f, "storage unavailable"),
            Self::Io(m) => write!(f, "storage i/o error: {m}"),
            Self::Encode(m) => write!(f, "storage encoding error: {m}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Flat string key-value persistence (browser localStorage, a JSON file, ...).
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// In-process store. Used for tests and when no persistent backend exists.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Star rating for a completed attempt with the given death count.
///
/// Flawless = 3, up to 3 deaths = 2, anything else = 1.
pub fn stars_for_deaths(deaths: u32) -> u8 {
    match deaths {
        0 => 3,
        1..=3 => 2,
        _ => 1,
    }
}

/// Persisted player progress keyed by global level index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressSnapshot {
    pub completed: BTreeSet<usize>,
    pub stars: BTreeMap<usize, u8>,
    pub cosmetics: BTreeMap<String, String>,
}

impl ProgressSnapshot {
    /// Load from `store`, falling back to defaults when the entry is missing,
    /// unreadable, or corrupt.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        match store.get(PROGRESS_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<ProgressSnapshot>(&raw) {
                Ok(snapshot) => snapshot.sanitized(),
                Err(e) => {
                    tracing::warn!("Corrupt progress snapshot: {e}, using defaults");
                    Self::default()
                },
            },
            Ok(None) => Self::default(),
            Err(e) => {
                tracing::warn!("Failed to read progress: {e}, using defaults");
                Self::default()
            },
        }
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), StoreError> {
        let raw = serde_json::to_string(self).map_err(|e| StoreError::Encode(e.to_string()))?;
        store.set(PROGRESS_KEY, &raw)
    }

    /// Mark `level` complete with `stars`, keeping the best rating seen.
    pub fn record_completion(&mut self, level: usize, stars: u8) {
        self.completed.insert(level);
        let stars = stars.min(MAX_STARS);
        let best = self.stars.entry(level).or_insert(0);
        *best = (*best).max(stars);
    }

    pub fn is_completed(&self, level: usize) -> bool {
        self.completed.contains(&level)
    }

    pub fn stars(&self, level: usize) -> u8 {
        self.stars.get(&level).copied().unwrap_or(0)
    }

    /// The first level is always open; later ones open once their
    /// predecessor (or the level itself) has been completed.
    pub fn is_unlocked(&self, level: usize) -> bool {
        level == 0 || self.is_completed(level) || self.is_completed(level - 1)
    }

    pub fn total_stars(&self) -> u32 {
        self.stars.values().map(|&s| u32::from(s)).sum()
    }

    pub fn set_cosmetic(&mut self, key: &str, value: &str) {
        self.cosmetics.insert(key.to_string(), value.to_string());
    }

    pub fn cosmetic(&self, key: &str) -> Option<&str> {
        self.cosmetics.get(key).map(String::as_str)
    }

    fn sanitized(mut self) -> Self {
        for stars in self.stars.values_mut() {
            *stars = (*stars).min(MAX_STARS);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Unavailable)
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable)
        }
    }

    #[test]
    fn stars_thresholds() {
        assert_eq!(stars_for_deaths(0), 3);
        assert_eq!(stars_for_deaths(1), 2);
        assert_eq!(stars_for_deaths(3), 2);
        assert_eq!(stars_for_deaths(4), 1);
        assert_eq!(stars_for_deaths(500), 1);
    }

    #[test]
    fn missing_snapshot_gives_defaults() {
        let store = MemoryStore::new();
        assert_eq!(ProgressSnapshot::load(&store), ProgressSnapshot::default());
    }

    #[test]
    fn corrupt_snapshot_gives_defaults() {
        let mut store = MemoryStore::new();
        store.set(PROGRESS_KEY, "{not json").unwrap();
        assert_eq!(ProgressSnapshot::load(&store), ProgressSnapshot::default());
    }

    #[test]
    fn unavailable_store_gives_defaults() {
        assert_eq!(
            ProgressSnapshot::load(&BrokenStore),
            ProgressSnapshot::default()
        );
    }

    #[test]
    fn save_reports_store_failure() {
        let snapshot = ProgressSnapshot::default();
        assert!(matches!(
            snapshot.save(&mut BrokenStore),
            Err(StoreError::Unavailable)
        ));
    }

    #[test]
    fn best_rating_is_kept() {
        let mut p = ProgressSnapshot::default();
        p.record_completion(2, 3);
        p.record_completion(2, 1);
        assert_eq!(p.stars(2), 3);
        assert!(p.is_completed(2));
    }

    #[test]
    fn rating_is_clamped() {
        let mut p = ProgressSnapshot::default();
        p.record_completion(0, 9);
        assert_eq!(p.stars(0), MAX_STARS);

        let mut store = MemoryStore::new();
        store
            .set(PROGRESS_KEY, r#"{"completed":[1],"stars":{"1":7}}"#)
            .unwrap();
        assert_eq!(ProgressSnapshot::load(&store).stars(1), MAX_STARS);
    }

    #[test]
    fn unlock_follows_completion() {
        let mut p = ProgressSnapshot::default();
        assert!(p.is_unlocked(0));
        assert!(!p.is_unlocked(1));
        p.record_completion(0, 2);
        assert!(p.is_unlocked(1));
        assert!(!p.is_unlocked(2));
    }

    #[test]
    fn partial_snapshot_fills_defaults() {
        let mut store = MemoryStore::new();
        store.set(PROGRESS_KEY, r#"{"completed":[0,1]}"#).unwrap();
        let p = ProgressSnapshot::load(&store);
        assert!(p.is_completed(1));
        assert!(p.stars.is_empty());
        assert!(p.cosmetics.is_empty());
    }

    #[test]
    fn cosmetics_are_stored() {
        let mut p = ProgressSnapshot::default();
        p.set_cosmetic("color", "teal");
        assert_eq!(p.cosmetic("color"), Some("teal"));
        assert_eq!(p.cosmetic("hat"), None);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn snapshot_roundtrips_through_store(
                completions in proptest::collection::vec((0usize..64, 0u8..=3), 0..20),
                cosmetics in proptest::collection::btree_map("[a-z]{1,8}", "[a-z0-9]{0,8}", 0..4)
            ) {
                let mut snapshot = ProgressSnapshot::default();
                for &(level, stars) in &completions {
                    snapshot.record_completion(level, stars);
                }
                snapshot.cosmetics = cosmetics;

                let mut store = MemoryStore::new();
                snapshot.save(&mut store).unwrap();
                let loaded = ProgressSnapshot::load(&store);

                prop_assert_eq!(&loaded.completed, &snapshot.completed);
                prop_assert_eq!(&loaded.stars, &snapshot.stars);
                prop_assert_eq!(loaded, snapshot);
            }
        }
    }
}
