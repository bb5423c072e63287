//! Company-name lookup trait and structured error types.
//!
//! The [`NameLookup`] trait abstracts over name sources (Yahoo Finance, a
//! static in-memory table) so the pipeline can be tested without network
//! access and run offline.

use crate::domain::EnrichmentFailure;
use thiserror::Error;

/// Errors a lookup can report. All of them are non-fatal to a batch.
#[derive(Debug, Clone, Error)]
pub enum LookupError {
    #[error("symbol not found: {symbol}")]
    NotFound { symbol: String },

    #[error("request timed out")]
    Timeout,

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("provider has blocked requests (circuit breaker open)")]
    CircuitOpen,

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("lookup error: {0}")]
    Other(String),
}

impl LookupError {
    /// Collapse into the flag recorded on an enriched record.
    pub fn failure(&self) -> EnrichmentFailure {
        match self {
            LookupError::NotFound { .. } => EnrichmentFailure::NotFound,
            LookupError::Timeout => EnrichmentFailure::TimedOut,
            LookupError::RateLimited { .. } => EnrichmentFailure::RateLimited,
            LookupError::NetworkUnreachable(_) | LookupError::CircuitOpen => {
                EnrichmentFailure::Unavailable
            }
            LookupError::ResponseFormatChanged(_) | LookupError::Other(_) => {
                EnrichmentFailure::Error
            }
        }
    }
}

/// Resolves a display name for a canonical ticker.
///
/// Implementations make a single attempt; retries and backoff are the
/// provider's own business, never the pipeline's.
pub trait NameLookup: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Resolve the display name for `ticker` (already canonical, e.g. `005930.KS`).
    fn resolve(&self, ticker: &str) -> Result<String, LookupError>;
}
