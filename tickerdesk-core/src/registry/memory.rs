//! In-memory registry.

use super::store::{RegistryStore, StoreError};
use crate::domain::{Market, RegistryEntry};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

type Key = (Market, String);

/// Registry held in a `BTreeMap` behind one lock; a batch's upserts are
/// applied under a single acquisition.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    entries: Mutex<BTreeMap<Key, RegistryEntry>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: impl IntoIterator<Item = RegistryEntry>) -> Self {
        let map = entries
            .into_iter()
            .map(|e| ((e.market, e.ticker.clone()), e))
            .collect();
        Self {
            entries: Mutex::new(map),
        }
    }

    /// Every entry across markets, ordered by `(market, ticker)`.
    pub fn snapshot(&self) -> Vec<RegistryEntry> {
        match self.lock() {
            Ok(entries) => entries.values().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<Key, RegistryEntry>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Unavailable("registry lock poisoned".into()))
    }
}

impl RegistryStore for MemoryRegistry {
    fn read_market(&self, market: Market) -> Result<Vec<RegistryEntry>, StoreError> {
        Ok(self
            .lock()?
            .values()
            .filter(|e| e.market == market)
            .cloned()
            .collect())
    }

    fn apply_upserts(&self, entries: &[RegistryEntry]) -> Result<(), StoreError> {
        let mut map = self.lock()?;
        for entry in entries {
            map.insert((entry.market, entry.ticker.clone()), entry.clone());
        }
        Ok(())
    }

    fn deactivate(&self, market: Market, ticker: &str) -> Result<RegistryEntry, StoreError> {
        let mut map = self.lock()?;
        let entry = map
            .get_mut(&(market, ticker.to_string()))
            .ok_or_else(|| StoreError::NotFound {
                market,
                ticker: ticker.to_string(),
            })?;
        if entry.active {
            entry.active = false;
            entry.updated_at = Utc::now();
        }
        Ok(entry.clone())
    }
}
