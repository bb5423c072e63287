//! Tickerdesk Core: ticker list ingestion for the newsletter registry.
//!
//! This crate turns an uploaded CSV of tickers into registry entries:
//! - Header alias resolution (ticker / symbol / code, name / company / ...)
//! - Ticker canonicalization per market (KRX suffixes, US symbol format)
//! - Company-name enrichment through a pluggable lookup with a circuit breaker
//! - Last-write-wins merge against the registry with an atomic commit
//! - A structured per-batch outcome with row diagnostics

pub mod config;
pub mod domain;
pub mod ingest;
pub mod lookup;
pub mod registry;

pub use config::{ConfigError, TickerdeskConfig};
pub use domain::{Market, RegistryEntry};
pub use ingest::{
    BatchRejection, CompanyNameResolver, IngestError, IngestOptions, IngestionOutcome,
    IngestionPipeline, RowRejection,
};
pub use lookup::{LookupError, NameLookup};
pub use registry::{RegistryStore, StoreError};
