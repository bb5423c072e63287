//! Company-name enrichment.
//!
//! Records whose name is empty get one from, in order:
//! 1. the curated name already stored in the registry for that ticker;
//! 2. one external lookup per distinct ticker per batch.
//!
//! Lookups for distinct tickers run concurrently on a thread pool built for
//! the batch and report over a channel. The collector stops at the enrichment
//! deadline; tickers that have not reported by then are `timed_out`, and their
//! queued lookups are cancelled so they never reach the provider. Stragglers
//! keep only their own pool busy, so the next batch starts on fresh threads.
//! A failed or panicking lookup never fails the batch, it only flags the
//! record.

use crate::domain::{EnrichedRecord, EnrichmentFailure, NameSource, NormalizedRecord};
use crate::lookup::{LookupError, NameLookup};
use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Records after enrichment, plus how many external lookups were issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrichment {
    pub records: Vec<EnrichedRecord>,
    pub lookups: usize,
}

pub struct CompanyNameResolver {
    lookup: Arc<dyn NameLookup>,
    max_concurrent: usize,
    timeout: Option<Duration>,
}

impl CompanyNameResolver {
    /// `max_concurrent` bounds in-flight lookups; `timeout` bounds the whole
    /// enrichment phase (`None` waits for every lookup).
    pub fn new(lookup: Arc<dyn NameLookup>, max_concurrent: usize, timeout: Option<Duration>) -> Self {
        Self {
            lookup,
            max_concurrent: max_concurrent.max(1),
            timeout,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.lookup.name()
    }

    /// Enrich a batch. `known` maps canonical tickers to names already
    /// curated in the registry.
    pub fn enrich(
        &self,
        records: Vec<NormalizedRecord>,
        known: &HashMap<String, String>,
    ) -> Enrichment {
        let mut pending = Vec::new();
        let mut queued = HashSet::new();
        for record in &records {
            if record.name.is_empty()
                && !known.contains_key(&record.ticker)
                && queued.insert(record.ticker.as_str())
            {
                pending.push(record.ticker.clone());
            }
        }

        let resolved = self.resolve_all(&pending);

        let records = records
            .into_iter()
            .map(|mut record| {
                if !record.name.is_empty() {
                    return EnrichedRecord::from_normalized(record, NameSource::Provided);
                }
                if let Some(name) = known.get(&record.ticker) {
                    record.name = name.clone();
                    return EnrichedRecord::from_normalized(record, NameSource::Registry);
                }
                match resolved.get(&record.ticker) {
                    Some(Ok(name)) => {
                        record.name = name.clone();
                        EnrichedRecord::from_normalized(record, NameSource::Resolved)
                    }
                    Some(Err(failure)) => {
                        EnrichedRecord::from_normalized(record, NameSource::Failed(*failure))
                    }
                    None => EnrichedRecord::from_normalized(
                        record,
                        NameSource::Failed(EnrichmentFailure::TimedOut),
                    ),
                }
            })
            .collect();

        Enrichment {
            records,
            lookups: pending.len(),
        }
    }

    /// One lookup per ticker, collected until every ticker reports or the
    /// deadline passes.
    fn resolve_all(&self, tickers: &[String]) -> HashMap<String, Result<String, EnrichmentFailure>> {
        let mut results = HashMap::with_capacity(tickers.len());
        if tickers.is_empty() {
            return results;
        }

        debug!(
            provider = self.lookup.name(),
            count = tickers.len(),
            "resolving company names"
        );

        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_concurrent)
            .thread_name(|i| format!("name-lookup-{i}"))
            .build()
        {
            Ok(pool) => pool,
            Err(e) => {
                warn!(error = %e, "could not start lookup threads; names left unresolved");
                return tickers
                    .iter()
                    .map(|t| (t.clone(), Err(EnrichmentFailure::Error)))
                    .collect();
            }
        };

        let cancelled = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel();
        for ticker in tickers {
            let tx = tx.clone();
            let lookup = Arc::clone(&self.lookup);
            let cancelled = Arc::clone(&cancelled);
            let ticker = ticker.clone();
            pool.spawn(move || {
                if cancelled.load(Ordering::Acquire) {
                    return;
                }
                let result = panic::catch_unwind(AssertUnwindSafe(|| lookup.resolve(&ticker)))
                    .unwrap_or_else(|_| Err(LookupError::Other("lookup panicked".into())));
                // The collector may have stopped listening at the deadline.
                let _ = tx.send((ticker, result));
            });
        }
        drop(tx);

        let deadline = self.timeout.map(|t| Instant::now() + t);
        while results.len() < tickers.len() {
            let received = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    rx.recv_timeout(remaining)
                }
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };

            match received {
                Ok((ticker, Ok(name))) => {
                    results.insert(ticker, Ok(name));
                }
                Ok((ticker, Err(err))) => {
                    warn!(%ticker, error = %err, "company name lookup failed");
                    results.insert(ticker, Err(err.failure()));
                }
                Err(RecvTimeoutError::Timeout) => {
                    cancelled.store(true, Ordering::Release);
                    warn!(
                        outstanding = tickers.len() - results.len(),
                        "enrichment deadline reached; remaining lookups marked timed_out"
                    );
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Market;
    use crate::lookup::StaticNameLookup;

    fn record(row: usize, ticker: &str, name: &str) -> NormalizedRecord {
        NormalizedRecord {
            row,
            ticker: ticker.into(),
            market: Market::Us,
            name: name.into(),
        }
    }

    fn resolver(lookup: Arc<StaticNameLookup>, timeout: Option<Duration>) -> CompanyNameResolver {
        CompanyNameResolver::new(lookup, 4, timeout)
    }

    #[test]
    fn provided_names_skip_the_lookup() {
        let lookup = Arc::new(StaticNameLookup::empty());
        let out = resolver(lookup.clone(), None)
            .enrich(vec![record(1, "AAPL", "Apple Inc.")], &HashMap::new());

        assert_eq!(out.lookups, 0);
        assert!(lookup.calls().is_empty());
        assert_eq!(out.records[0].source, NameSource::Provided);
        assert_eq!(out.records[0].name, "Apple Inc.");
    }

    #[test]
    fn registry_names_fill_blanks_without_lookup() {
        let lookup = Arc::new(StaticNameLookup::empty());
        let known = HashMap::from([("MSFT".to_string(), "Microsoft Corporation".to_string())]);
        let out = resolver(lookup.clone(), None).enrich(vec![record(1, "MSFT", "")], &known);

        assert!(lookup.calls().is_empty());
        assert_eq!(out.records[0].name, "Microsoft Corporation");
        assert_eq!(out.records[0].source, NameSource::Registry);
    }

    #[test]
    fn repeated_tickers_are_looked_up_once() {
        let lookup = Arc::new(StaticNameLookup::empty().with_name("NVDA", "NVIDIA Corporation"));
        let out = resolver(lookup.clone(), None).enrich(
            vec![record(1, "NVDA", ""), record(2, "NVDA", ""), record(3, "NVDA", "")],
            &HashMap::new(),
        );

        assert_eq!(out.lookups, 1);
        assert_eq!(lookup.calls(), vec!["NVDA"]);
        assert!(out
            .records
            .iter()
            .all(|r| r.name == "NVIDIA Corporation" && r.source == NameSource::Resolved));
    }

    #[test]
    fn failures_flag_the_record_and_keep_it() {
        let lookup = Arc::new(
            StaticNameLookup::empty()
                .with_failure("TSLA", LookupError::RateLimited { retry_after_secs: 30 }),
        );
        let out = resolver(lookup, None).enrich(
            vec![record(1, "ZZZZ", ""), record(2, "TSLA", "")],
            &HashMap::new(),
        );

        assert_eq!(out.records.len(), 2);
        assert_eq!(out.records[0].failure(), Some(EnrichmentFailure::NotFound));
        assert_eq!(out.records[1].failure(), Some(EnrichmentFailure::RateLimited));
        assert!(out.records.iter().all(|r| r.name.is_empty()));
    }

    #[test]
    fn slow_lookups_past_the_deadline_time_out() {
        let lookup = Arc::new(
            StaticNameLookup::empty()
                .with_name("AAPL", "Apple Inc.")
                .with_delay(Duration::from_millis(500)),
        );
        let started = Instant::now();
        let out = resolver(lookup, Some(Duration::from_millis(50)))
            .enrich(vec![record(1, "AAPL", "")], &HashMap::new());

        assert!(started.elapsed() < Duration::from_millis(400));
        assert_eq!(out.records[0].failure(), Some(EnrichmentFailure::TimedOut));
        assert_eq!(out.lookups, 1);
    }

    /// Sleeps on tickers starting with `S`, panics on `BOOM`, answers the rest.
    #[derive(Default)]
    struct UnevenLookup {
        calls: std::sync::Mutex<Vec<String>>,
    }

    impl NameLookup for UnevenLookup {
        fn name(&self) -> &str {
            "uneven"
        }

        fn resolve(&self, ticker: &str) -> Result<String, LookupError> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(ticker.to_string());
            }
            if ticker == "BOOM" {
                panic!("provider bug");
            }
            if ticker.starts_with('S') {
                std::thread::sleep(Duration::from_millis(400));
            }
            Ok(format!("{ticker} Corp"))
        }
    }

    #[test]
    fn timed_out_batch_does_not_delay_the_next_one() {
        let lookup = Arc::new(UnevenLookup::default());
        let resolver = CompanyNameResolver::new(lookup, 2, Some(Duration::from_millis(100)));

        let first = resolver.enrich(
            vec![record(1, "SA", ""), record(2, "SB", "")],
            &HashMap::new(),
        );
        assert!(first
            .records
            .iter()
            .all(|r| r.failure() == Some(EnrichmentFailure::TimedOut)));

        let second = resolver.enrich(vec![record(1, "FAST", "")], &HashMap::new());
        assert_eq!(second.records[0].failure(), None);
        assert_eq!(second.records[0].name, "FAST Corp");
    }

    #[test]
    fn queued_lookups_are_cancelled_at_the_deadline() {
        let lookup = Arc::new(UnevenLookup::default());
        let resolver =
            CompanyNameResolver::new(lookup.clone(), 1, Some(Duration::from_millis(100)));

        resolver.enrich(
            vec![record(1, "SA", ""), record(2, "SB", ""), record(3, "SC", "")],
            &HashMap::new(),
        );
        // Let the in-flight lookup drain.
        std::thread::sleep(Duration::from_millis(900));

        let calls = lookup.calls.lock().unwrap().clone();
        assert_eq!(calls, vec!["SA"]);
    }

    #[test]
    fn panicking_lookup_is_flagged_not_fatal() {
        let lookup = Arc::new(UnevenLookup::default());
        let out = resolver_for(lookup).enrich(
            vec![record(1, "BOOM", ""), record(2, "AAPL", "")],
            &HashMap::new(),
        );

        assert_eq!(out.records[0].failure(), Some(EnrichmentFailure::Error));
        assert_eq!(out.records[1].name, "AAPL Corp");
    }

    fn resolver_for(lookup: Arc<UnevenLookup>) -> CompanyNameResolver {
        CompanyNameResolver::new(lookup, 2, None)
    }
}
