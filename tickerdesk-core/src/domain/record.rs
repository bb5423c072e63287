//! Per-row records as they move through the ingestion stages.
//!
//! Each stage consumes the previous stage's type:
//! `RawRow` → [`CanonicalRow`] → [`NormalizedRecord`] → [`EnrichedRecord`].

use super::market::Market;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One parsed CSV record, cells aligned positionally with the header row.
pub type RawRow = csv::StringRecord;

/// A data row after column resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRow {
    /// 1-based data row number (the first row after the header is row 1).
    pub row: usize,
    /// Never empty or whitespace-only.
    pub ticker_raw: String,
    /// Trimmed; `None` when the file has no name column or the cell is blank.
    pub name_raw: Option<String>,
}

/// A row after ticker canonicalization for the batch market.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    pub row: usize,
    pub ticker: String,
    pub market: Market,
    /// May be empty, pending enrichment.
    pub name: String,
}

/// Why a name lookup did not produce a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentFailure {
    /// The provider answered but knows no such ticker.
    NotFound,
    /// No answer before the enrichment deadline or the request timeout.
    TimedOut,
    /// The provider throttled the request.
    RateLimited,
    /// The provider is unreachable or its circuit breaker is open.
    Unavailable,
    /// Anything else (malformed response, unexpected status).
    Error,
}

impl EnrichmentFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrichmentFailure::NotFound => "not_found",
            EnrichmentFailure::TimedOut => "timed_out",
            EnrichmentFailure::RateLimited => "rate_limited",
            EnrichmentFailure::Unavailable => "unavailable",
            EnrichmentFailure::Error => "error",
        }
    }
}

impl fmt::Display for EnrichmentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an enriched record's name came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "reason", rename_all = "snake_case")]
pub enum NameSource {
    /// Supplied by the uploaded file.
    Provided,
    /// Taken from the curated name already stored in the registry.
    Registry,
    /// Resolved through the external lookup.
    Resolved,
    /// Lookup failed; the name is empty.
    Failed(EnrichmentFailure),
}

/// A normalized record after the name enrichment stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedRecord {
    pub row: usize,
    pub ticker: String,
    pub market: Market,
    /// Non-empty unless `source` is [`NameSource::Failed`].
    pub name: String,
    pub source: NameSource,
}

impl EnrichedRecord {
    /// Carry a normalized record through unchanged with a known name source.
    pub fn from_normalized(record: NormalizedRecord, source: NameSource) -> Self {
        Self {
            row: record.row,
            ticker: record.ticker,
            market: record.market,
            name: record.name,
            source,
        }
    }

    pub fn enrichment_failed(&self) -> bool {
        matches!(self.source, NameSource::Failed(_))
    }

    pub fn failure(&self) -> Option<EnrichmentFailure> {
        match self.source {
            NameSource::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}
