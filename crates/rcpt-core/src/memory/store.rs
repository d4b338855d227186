//! Vendor memory persistence.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use super::VendorMemoryEntry;
use crate::error::StoreError;

/// Persistence boundary for vendor signatures.
///
/// Loaded once per session; written through on every update.
pub trait VendorStore: Send + Sync {
    /// Every stored entry.
    fn load_all(&self) -> Result<Vec<VendorMemoryEntry>, StoreError>;

    /// Insert the entry, or replace the one with the same key.
    fn upsert(&self, entry: &VendorMemoryEntry) -> Result<(), StoreError>;
}

fn upsert_into(entries: &mut Vec<VendorMemoryEntry>, entry: &VendorMemoryEntry) {
    match entries.iter_mut().find(|e| e.key == entry.key) {
        Some(existing) => *existing = entry.clone(),
        None => entries.push(entry.clone()),
    }
}

/// JSON file holding a list of entries.
#[derive(Debug, Clone)]
pub struct JsonVendorStore {
    path: PathBuf,
}

impl JsonVendorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VendorStore for JsonVendorStore {
    fn load_all(&self) -> Result<Vec<VendorMemoryEntry>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn upsert(&self, entry: &VendorMemoryEntry) -> Result<(), StoreError> {
        let mut entries = self.load_all()?;
        upsert_into(&mut entries, entry);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&entries)?)?;
        debug!("Saved vendor '{}' to {}", entry.key, self.path.display());
        Ok(())
    }
}

/// Process-local store, used by tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryVendorStore {
    entries: Mutex<Vec<VendorMemoryEntry>>,
}

impl MemoryVendorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Vec<VendorMemoryEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }
}

impl VendorStore for MemoryVendorStore {
    fn load_all(&self) -> Result<Vec<VendorMemoryEntry>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.clone())
    }

    fn upsert(&self, entry: &VendorMemoryEntry) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        upsert_into(&mut entries, entry);
        Ok(())
    }
}
