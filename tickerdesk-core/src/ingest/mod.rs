//! CSV ingestion and enrichment pipeline.
//!
//! Stages, leaf-first:
//! - [`columns`]: header aliases → canonical columns
//! - [`normalize`]: ticker canonicalization per market
//! - [`enrich`]: company-name resolution
//! - [`merge`]: reconciliation against the registry
//! - [`pipeline`]: orchestration over one uploaded file

pub mod columns;
pub mod enrich;
pub mod error;
pub mod merge;
pub mod normalize;
pub mod outcome;
pub mod pipeline;

pub use columns::ColumnMap;
pub use enrich::{CompanyNameResolver, Enrichment};
pub use error::{BatchRejection, IngestError, RowRejection};
pub use merge::{MergeAction, MergeDecision, MergePlan};
pub use normalize::TickerNormalizer;
pub use outcome::{Diagnostic, DiagnosticReason, IngestionOutcome};
pub use pipeline::{IngestOptions, IngestionPipeline, DEFAULT_MAX_FILE_BYTES};
