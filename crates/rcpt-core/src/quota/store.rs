//! Quota persistence, keyed by calendar month.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::warn;

use crate::error::StoreError;

/// Persistence boundary for the monthly used-call counter.
pub trait QuotaStore: Send + Sync {
    /// Calls used in `period` ("YYYY-MM"); 0 for an unknown period.
    fn load(&self, period: &str) -> Result<u32, StoreError>;

    fn save(&self, period: &str, used: u32) -> Result<(), StoreError>;
}

/// JSON file mapping period to used count.
#[derive(Debug, Clone)]
pub struct JsonQuotaStore {
    path: PathBuf,
}

impl JsonQuotaStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<BTreeMap<String, u32>, StoreError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }
}

impl QuotaStore for JsonQuotaStore {
    fn load(&self, period: &str) -> Result<u32, StoreError> {
        Ok(self.read()?.get(period).copied().unwrap_or(0))
    }

    fn save(&self, period: &str, used: u32) -> Result<(), StoreError> {
        let mut periods = match self.read() {
            Ok(periods) => periods,
            Err(StoreError::Serde(e)) => {
                warn!(
                    "Replacing unreadable quota file {}: {}",
                    self.path.display(),
                    e
                );
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        periods.insert(period.to_string(), used);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&periods)?)?;
        Ok(())
    }
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryQuotaStore {
    periods: Mutex<HashMap<String, u32>>,
}

impl MemoryQuotaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with one period's usage.
    pub fn with_used(period: &str, used: u32) -> Self {
        let store = Self::default();
        if let Ok(mut periods) = store.periods.lock() {
            periods.insert(period.to_string(), used);
        }
        store
    }
}

impl QuotaStore for MemoryQuotaStore {
    fn load(&self, period: &str) -> Result<u32, StoreError> {
        let periods = self.periods.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(periods.get(period).copied().unwrap_or(0))
    }

    fn save(&self, period: &str, used: u32) -> Result<(), StoreError> {
        let mut periods = self.periods.lock().map_err(|_| StoreError::Poisoned)?;
        periods.insert(period.to_string(), used);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_json_store_round_trip_per_period() {
        let dir = tempdir().unwrap();
        let store = JsonQuotaStore::new(dir.path().join("quota.json"));

        assert_eq!(store.load("2024-01").unwrap(), 0);
        store.save("2024-01", 7).unwrap();
        store.save("2024-02", 1).unwrap();

        assert_eq!(store.load("2024-01").unwrap(), 7);
        assert_eq!(store.load("2024-02").unwrap(), 1);
        assert_eq!(store.load("2024-03").unwrap(), 0);
    }

    #[test]
    fn test_json_store_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("quota.json");
        fs::write(&path, "[1, 2").unwrap();
        let store = JsonQuotaStore::new(&path);

        assert!(matches!(store.load("2024-01"), Err(StoreError::Serde(_))));
        store.save("2024-01", 4).unwrap();
        assert_eq!(store.load("2024-01").unwrap(), 4);
    }

    #[test]
    fn test_memory_store_seeded() {
        let store = MemoryQuotaStore::with_used("2024-05", 100);
        assert_eq!(store.load("2024-05").unwrap(), 100);
        assert_eq!(store.load("2024-06").unwrap(), 0);
    }
}
