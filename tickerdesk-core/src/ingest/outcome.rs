//! Per-batch outcome reported back to the uploader.

use super::error::RowRejection;
use crate::domain::{EnrichmentFailure, Market, RegistryEntry};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a row shows up in the diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum DiagnosticReason {
    /// The row was dropped.
    Rejected(RowRejection),
    /// The row was registered without a name.
    EnrichmentFailed(EnrichmentFailure),
}

impl fmt::Display for DiagnosticReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticReason::Rejected(r) => write!(f, "{r}"),
            DiagnosticReason::EnrichmentFailed(e) => write!(f, "enrichment_failed ({e})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// 1-based data row number.
    pub row: usize,
    /// Ticker as read from the row; canonical once the row was normalized.
    pub ticker: Option<String>,
    pub reason: DiagnosticReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionOutcome {
    pub market: Market,
    /// BLAKE3 hex digest of the uploaded bytes.
    pub batch_hash: String,
    pub total_rows: usize,
    /// Rows that reached merge classification.
    pub merged_rows: usize,
    pub created: usize,
    pub updated: usize,
    /// Subset of `updated` that flipped an inactive entry back on.
    pub reactivated: usize,
    pub unchanged: usize,
    pub rejected: usize,
    /// Distinct external name lookups issued.
    pub lookups: usize,
    pub dry_run: bool,
    /// Ordered by row.
    pub diagnostics: Vec<Diagnostic>,
    /// Entries written (or, in a dry run, that would have been written).
    pub written: Vec<RegistryEntry>,
}

impl IngestionOutcome {
    pub fn enrichment_failures(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| matches!(d.reason, DiagnosticReason::EnrichmentFailed(_)))
            .count()
    }

    /// One-line summary for logs and CLI output.
    pub fn summary(&self) -> String {
        format!(
            "{} rows: {} created, {} updated ({} reactivated), {} unchanged, {} rejected, {} without name",
            self.total_rows,
            self.created,
            self.updated,
            self.reactivated,
            self.unchanged,
            self.rejected,
            self.enrichment_failures(),
        )
    }
}
