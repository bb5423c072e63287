//! Reconcile a batch against the registry.
//!
//! Policy:
//! - duplicate tickers within a batch: the last row wins;
//! - new ticker → `created`;
//! - same name and already active → `unchanged`, no write;
//! - different name or inactive → `updated` (name refreshed, reactivated);
//! - an empty incoming name never replaces a stored name;
//! - tickers absent from the batch are never touched.

use crate::domain::{EnrichedRecord, NormalizedRecord, RegistryEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeAction {
    Created,
    Updated { reactivated: bool },
    Unchanged,
}

/// Decision for one distinct ticker of the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeDecision {
    /// The winning (last) record for the ticker.
    pub record: EnrichedRecord,
    pub action: MergeAction,
}

/// Everything the merge decided, in first-appearance order of each ticker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergePlan {
    pub decisions: Vec<MergeDecision>,
    /// Entries to upsert; excludes `unchanged` tickers.
    pub writes: Vec<RegistryEntry>,
}

impl MergePlan {
    pub fn count(&self, pred: impl Fn(&MergeAction) -> bool) -> usize {
        self.decisions.iter().filter(|d| pred(&d.action)).count()
    }

    pub fn created(&self) -> usize {
        self.count(|a| matches!(a, MergeAction::Created))
    }

    pub fn updated(&self) -> usize {
        self.count(|a| matches!(a, MergeAction::Updated { .. }))
    }

    pub fn reactivated(&self) -> usize {
        self.count(|a| matches!(a, MergeAction::Updated { reactivated: true }))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|a| matches!(a, MergeAction::Unchanged))
    }
}

/// Keep the last record of each ticker, ordered by the ticker's first
/// appearance.
fn last_per_ticker<R>(records: Vec<R>, ticker: impl Fn(&R) -> &str) -> Vec<R> {
    let mut order: Vec<String> = Vec::new();
    let mut latest: HashMap<String, R> = HashMap::new();
    for record in records {
        let key = ticker(&record).to_string();
        if !latest.contains_key(&key) {
            order.push(key.clone());
        }
        latest.insert(key, record);
    }
    order
        .into_iter()
        .filter_map(|key| latest.remove(&key))
        .collect()
}

/// Drop rows superseded by a later row for the same ticker, so only the
/// records that will be merged go on to enrichment.
pub fn collapse_duplicates(records: Vec<NormalizedRecord>) -> Vec<NormalizedRecord> {
    last_per_ticker(records, |r| r.ticker.as_str())
}

/// Build the write set for a batch.
///
/// `existing` is the registry state for the batch market, read once at batch
/// start. `now` stamps every written entry.
pub fn plan(
    records: Vec<EnrichedRecord>,
    existing: &[RegistryEntry],
    now: DateTime<Utc>,
) -> MergePlan {
    let current: HashMap<&str, &RegistryEntry> =
        existing.iter().map(|e| (e.ticker.as_str(), e)).collect();

    let mut plan = MergePlan::default();
    for record in last_per_ticker(records, |r| r.ticker.as_str()) {
        let (action, write) = match current.get(record.ticker.as_str()) {
            None => (
                MergeAction::Created,
                Some(RegistryEntry {
                    ticker: record.ticker.clone(),
                    name: record.name.clone(),
                    market: record.market,
                    active: true,
                    updated_at: now,
                }),
            ),
            Some(entry) => {
                let name = if record.name.is_empty() {
                    entry.name.clone()
                } else {
                    record.name.clone()
                };

                if name == entry.name && entry.active {
                    (MergeAction::Unchanged, None)
                } else {
                    (
                        MergeAction::Updated {
                            reactivated: !entry.active,
                        },
                        Some(RegistryEntry {
                            ticker: entry.ticker.clone(),
                            name,
                            market: entry.market,
                            active: true,
                            updated_at: now,
                        }),
                    )
                }
            }
        };

        plan.writes.extend(write);
        plan.decisions.push(MergeDecision { record, action });
    }

    plan
}
