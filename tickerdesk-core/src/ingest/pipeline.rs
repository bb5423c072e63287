//! Batch orchestration: one uploaded file in, one outcome out.
//!
//! parse → resolve columns → normalize → enrich → merge → persist.
//!
//! Header-level problems reject the batch before the registry is touched.
//! Row-level problems are collected as diagnostics and the batch completes.
//! The registry is read once at batch start and the write set is applied in a
//! single atomic call, so a persistence failure commits nothing.

use super::columns::ColumnMap;
use super::enrich::CompanyNameResolver;
use super::error::{BatchRejection, IngestError};
use super::merge;
use super::normalize::TickerNormalizer;
use super::outcome::{Diagnostic, DiagnosticReason, IngestionOutcome};
use crate::domain::{Market, NormalizedRecord};
use crate::registry::RegistryStore;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{debug, info};

/// The upload limit of the admin web form.
pub const DEFAULT_MAX_FILE_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOptions {
    pub max_file_bytes: usize,
    /// Compute the full outcome but skip the registry write.
    pub dry_run: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            dry_run: false,
        }
    }
}

pub struct IngestionPipeline<'a> {
    resolver: &'a CompanyNameResolver,
    store: &'a dyn RegistryStore,
    options: IngestOptions,
}

impl<'a> IngestionPipeline<'a> {
    pub fn new(resolver: &'a CompanyNameResolver, store: &'a dyn RegistryStore) -> Self {
        Self {
            resolver,
            store,
            options: IngestOptions::default(),
        }
    }

    pub fn with_options(mut self, options: IngestOptions) -> Self {
        self.options = options;
        self
    }

    /// Process one complete file for `market`.
    pub fn run(&self, input: &[u8], market: Market) -> Result<IngestionOutcome, IngestError> {
        self.run_at(input, market, Utc::now())
    }

    /// Like [`run`](Self::run) with an explicit timestamp for written entries.
    pub fn run_at(
        &self,
        input: &[u8],
        market: Market,
        now: DateTime<Utc>,
    ) -> Result<IngestionOutcome, IngestError> {
        let batch_hash = blake3::hash(input).to_hex().to_string();
        let short_hash = &batch_hash[..12];
        info!(%market, bytes = input.len(), batch = short_hash, "ingesting ticker list");

        let text = decode(input, self.options.max_file_bytes)?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| BatchRejection::MalformedCsv(e.to_string()))?
            .clone();
        let columns = ColumnMap::resolve(headers.iter())?;
        debug!(?columns, headers = ?headers, "resolved header columns");

        let existing = self.store.read_market(market)?;
        let normalizer = TickerNormalizer::new(market);

        let mut total_rows = 0;
        let mut diagnostics = Vec::new();
        let mut normalized: Vec<NormalizedRecord> = Vec::new();

        for (idx, result) in reader.records().enumerate() {
            let row = idx + 1;
            let raw = result.map_err(|e| BatchRejection::MalformedCsv(format!("row {row}: {e}")))?;
            total_rows += 1;

            let canonical = match columns.canonical_row(row, &raw) {
                Ok(canonical) => canonical,
                Err(reason) => {
                    diagnostics.push(Diagnostic {
                        row,
                        ticker: None,
                        reason: DiagnosticReason::Rejected(reason),
                    });
                    continue;
                }
            };

            let ticker_raw = canonical.ticker_raw.clone();
            match normalizer.normalize(canonical) {
                Ok(record) => normalized.push(record),
                Err(reason) => diagnostics.push(Diagnostic {
                    row,
                    ticker: Some(ticker_raw),
                    reason: DiagnosticReason::Rejected(reason),
                }),
            }
        }

        let rejected = diagnostics.len();
        let merged_rows = normalized.len();

        let known: HashMap<String, String> = existing
            .iter()
            .filter(|e| !e.name.is_empty())
            .map(|e| (e.ticker.clone(), e.name.clone()))
            .collect();
        let enrichment = self
            .resolver
            .enrich(merge::collapse_duplicates(normalized), &known);

        let plan = merge::plan(enrichment.records, &existing, now);
        for decision in &plan.decisions {
            if let Some(failure) = decision.record.failure() {
                diagnostics.push(Diagnostic {
                    row: decision.record.row,
                    ticker: Some(decision.record.ticker.clone()),
                    reason: DiagnosticReason::EnrichmentFailed(failure),
                });
            }
        }
        diagnostics.sort_by_key(|d| d.row);

        if self.options.dry_run {
            info!(writes = plan.writes.len(), "dry run, registry not modified");
        } else if !plan.writes.is_empty() {
            self.store.apply_upserts(&plan.writes)?;
        }

        let outcome = IngestionOutcome {
            market,
            batch_hash,
            total_rows,
            merged_rows,
            created: plan.created(),
            updated: plan.updated(),
            reactivated: plan.reactivated(),
            unchanged: plan.unchanged(),
            rejected,
            lookups: enrichment.lookups,
            dry_run: self.options.dry_run,
            diagnostics,
            written: plan.writes,
        };
        info!(%market, "{}", outcome.summary());
        Ok(outcome)
    }
}

/// Size check, UTF-8 decode, BOM strip.
fn decode(input: &[u8], limit: usize) -> Result<&str, BatchRejection> {
    if input.len() > limit {
        return Err(BatchRejection::TooLarge {
            size: input.len(),
            limit,
        });
    }

    let text = std::str::from_utf8(input).map_err(|e| BatchRejection::InvalidEncoding {
        offset: e.valid_up_to(),
    })?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    if text.trim().is_empty() {
        return Err(BatchRejection::EmptyFile);
    }
    Ok(text)
}
