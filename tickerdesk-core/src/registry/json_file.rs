//! JSON file registry.
//!
//! Layout: one pretty-printed JSON document holding every entry.
//!
//! Commits are atomic: the complete new registry is written to
//! `{path}.tmp` and renamed over the old file, so a failed batch leaves the
//! previous registry untouched.

use super::store::{RegistryStore, StoreError};
use crate::domain::{Market, RegistryEntry};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct RegistryFile {
    version: u32,
    entries: Vec<RegistryEntry>,
}

type EntryMap = BTreeMap<(Market, String), RegistryEntry>;

pub struct JsonFileRegistry {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl JsonFileRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Load the whole registry. A missing file is an empty registry.
    fn load(&self) -> Result<EntryMap, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };

        let file: RegistryFile = serde_json::from_str(&content)
            .map_err(|e| StoreError::Corrupt(format!("{}: {e}", self.path.display())))?;
        if file.version != FORMAT_VERSION {
            return Err(StoreError::Corrupt(format!(
                "unsupported registry version {} (expected {FORMAT_VERSION})",
                file.version
            )));
        }

        Ok(file
            .entries
            .into_iter()
            .map(|e| ((e.market, e.ticker.clone()), e))
            .collect())
    }

    /// Write the whole registry via temp file + rename.
    fn commit(&self, entries: EntryMap) -> Result<(), StoreError> {
        let file = RegistryFile {
            version: FORMAT_VERSION,
            entries: entries.into_values().collect(),
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = self.tmp_path();
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            StoreError::Io(e)
        })?;

        debug!(path = %self.path.display(), entries = file.entries.len(), "registry committed");
        Ok(())
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>, StoreError> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::Unavailable("registry lock poisoned".into()))
    }
}

impl RegistryStore for JsonFileRegistry {
    fn read_market(&self, market: Market) -> Result<Vec<RegistryEntry>, StoreError> {
        Ok(self
            .load()?
            .into_values()
            .filter(|e| e.market == market)
            .collect())
    }

    fn apply_upserts(&self, entries: &[RegistryEntry]) -> Result<(), StoreError> {
        if entries.is_empty() {
            return Ok(());
        }
        let _guard = self.guard()?;
        let mut map = self.load()?;
        for entry in entries {
            map.insert((entry.market, entry.ticker.clone()), entry.clone());
        }
        self.commit(map)
    }

    fn deactivate(&self, market: Market, ticker: &str) -> Result<RegistryEntry, StoreError> {
        let _guard = self.guard()?;
        let mut map = self.load()?;
        let entry = map
            .get_mut(&(market, ticker.to_string()))
            .ok_or_else(|| StoreError::NotFound {
                market,
                ticker: ticker.to_string(),
            })?;
        if !entry.active {
            return Ok(entry.clone());
        }
        entry.active = false;
        entry.updated_at = Utc::now();
        let updated = entry.clone();
        self.commit(map)?;
        Ok(updated)
    }
}
