//! Persisted registry entry.

use super::market::Market;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A curated ticker as stored in the registry.
///
/// Keyed by `(market, ticker)`; KRX tickers carry their exchange suffix so the
/// key is market-qualified either way. Entries are never deleted by ingestion,
/// only deactivated through a separate administrative action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub ticker: String,
    pub name: String,
    pub market: Market,
    pub active: bool,
    pub updated_at: DateTime<Utc>,
}
