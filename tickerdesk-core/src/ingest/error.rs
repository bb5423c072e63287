//! Error taxonomy for one ingestion batch.
//!
//! - [`BatchRejection`]: the file as a whole is unusable; nothing is processed.
//! - [`RowRejection`]: one row is unusable; recorded, the batch continues.
//! - [`IngestError::Persistence`]: the registry read or atomic write failed;
//!   nothing was committed and the caller should retry the whole upload.
//!
//! Enrichment failures are not errors at all; they are a flag on the record
//! (see [`crate::domain::EnrichmentFailure`]).

use crate::registry::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Whole-file rejection. Surfaced immediately with zero writes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchRejection {
    #[error("file is empty")]
    EmptyFile,

    #[error("file is {size} bytes, larger than the {limit}-byte upload limit")]
    TooLarge { size: usize, limit: usize },

    #[error("file is not valid UTF-8 (invalid byte at offset {offset})")]
    InvalidEncoding { offset: usize },

    #[error("malformed CSV: {0}")]
    MalformedCsv(String),

    #[error("no ticker column in header {headers:?} (expected one of: ticker, symbol, code)")]
    MissingTickerColumn { headers: Vec<String> },
}

/// Row-scoped rejection reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowRejection {
    EmptyTicker,
    InvalidUsTickerFormat,
}

impl RowRejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowRejection::EmptyTicker => "empty_ticker",
            RowRejection::InvalidUsTickerFormat => "invalid_us_ticker_format",
        }
    }
}

impl fmt::Display for RowRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fatal outcome of a pipeline invocation.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("batch rejected: {0}")]
    BatchRejected(#[from] BatchRejection),

    #[error("registry persistence failed, nothing was committed: {0}")]
    Persistence(#[from] StoreError),
}
