//! Registry store trait.
//!
//! The registry is owned by the store; the pipeline reads one market's
//! entries at batch start and hands back a write set that must be applied
//! all-or-nothing.

use crate::domain::{Market, RegistryEntry};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("registry I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("registry file is corrupt: {0}")]
    Corrupt(String),

    #[error("registry serialization failed: {0}")]
    Serialization(String),

    #[error("no {market} entry for ticker '{ticker}'")]
    NotFound { market: Market, ticker: String },

    #[error("registry unavailable: {0}")]
    Unavailable(String),
}

pub trait RegistryStore: Send + Sync {
    /// All entries for a market, active or not, ordered by ticker.
    fn read_market(&self, market: Market) -> Result<Vec<RegistryEntry>, StoreError>;

    /// Active entries for a market, ordered by ticker.
    fn read_active(&self, market: Market) -> Result<Vec<RegistryEntry>, StoreError> {
        let mut entries = self.read_market(market)?;
        entries.retain(|e| e.active);
        Ok(entries)
    }

    /// Insert or replace every entry, keyed by `(market, ticker)`.
    ///
    /// Atomic: on `Err`, none of the entries were applied.
    fn apply_upserts(&self, entries: &[RegistryEntry]) -> Result<(), StoreError>;

    /// Soft-remove one entry. Returns the updated entry.
    fn deactivate(&self, market: Market, ticker: &str) -> Result<RegistryEntry, StoreError>;
}
