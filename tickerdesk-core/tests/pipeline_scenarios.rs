//! End-to-end batch scenarios against in-memory collaborators.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tickerdesk_core::domain::{EnrichmentFailure, Market, RegistryEntry};
use tickerdesk_core::ingest::{
    BatchRejection, CompanyNameResolver, DiagnosticReason, IngestError, IngestOptions,
    IngestionOutcome, IngestionPipeline, RowRejection,
};
use tickerdesk_core::lookup::{LookupError, StaticNameLookup};
use tickerdesk_core::registry::{MemoryRegistry, RegistryStore, StoreError};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 8, 20, 9, 0, 0).unwrap()
}

fn t1() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 1, 9, 0, 0).unwrap()
}

fn resolver(lookup: StaticNameLookup) -> CompanyNameResolver {
    CompanyNameResolver::new(Arc::new(lookup), 4, None)
}

fn run(
    csv: &str,
    market: Market,
    resolver: &CompanyNameResolver,
    store: &dyn RegistryStore,
) -> Result<IngestionOutcome, IngestError> {
    IngestionPipeline::new(resolver, store).run_at(csv.as_bytes(), market, t1())
}

fn entry(ticker: &str, name: &str, market: Market, active: bool) -> RegistryEntry {
    RegistryEntry {
        ticker: ticker.into(),
        name: name.into(),
        market,
        active,
        updated_at: t0(),
    }
}

/// Store whose writes always fail, counting attempts.
#[derive(Default)]
struct FailingStore {
    inner: MemoryRegistry,
    write_attempts: AtomicUsize,
}

impl RegistryStore for FailingStore {
    fn read_market(&self, market: Market) -> Result<Vec<RegistryEntry>, StoreError> {
        self.inner.read_market(market)
    }

    fn apply_upserts(&self, _entries: &[RegistryEntry]) -> Result<(), StoreError> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Unavailable("database is locked".into()))
    }

    fn deactivate(&self, market: Market, ticker: &str) -> Result<RegistryEntry, StoreError> {
        self.inner.deactivate(market, ticker)
    }
}

#[test]
fn duplicate_row_with_name_wins_over_blank_row() {
    let store = MemoryRegistry::new();
    let resolver = resolver(StaticNameLookup::empty());

    let out = run(
        "ticker,name\nAAPL,\nAAPL,Apple Inc.\n",
        Market::Us,
        &resolver,
        &store,
    )
    .unwrap();

    assert_eq!(out.created, 1);
    assert_eq!(out.updated + out.unchanged + out.rejected, 0);
    assert_eq!(
        store.snapshot(),
        vec![RegistryEntry {
            ticker: "AAPL".into(),
            name: "Apple Inc.".into(),
            market: Market::Us,
            active: true,
            updated_at: t1(),
        }]
    );
    assert!(out.diagnostics.is_empty());
}

#[test]
fn last_write_wins_for_conflicting_names() {
    let store = MemoryRegistry::new();
    let resolver = resolver(StaticNameLookup::empty());

    run(
        "symbol,company\nAAPL,Apple Computer\nMSFT,Microsoft\nAAPL,Apple Inc.\n",
        Market::Us,
        &resolver,
        &store,
    )
    .unwrap();

    let aapl: Vec<_> = store
        .snapshot()
        .into_iter()
        .filter(|e| e.ticker == "AAPL")
        .collect();
    assert_eq!(aapl.len(), 1);
    assert_eq!(aapl[0].name, "Apple Inc.");
}

#[test]
fn krx_codes_are_suffixed_per_market() {
    let store = MemoryRegistry::new();
    let resolver = resolver(StaticNameLookup::empty());

    run("code,name\n005930,Samsung Electronics\n", Market::Kospi, &resolver, &store).unwrap();
    run("code,name\n005930,Samsung Electronics\n", Market::Kosdaq, &resolver, &store).unwrap();

    let kospi = store.read_market(Market::Kospi).unwrap();
    let kosdaq = store.read_market(Market::Kosdaq).unwrap();
    assert_eq!(kospi[0].ticker, "005930.KS");
    assert_eq!(kosdaq[0].ticker, "005930.KQ");
}

#[test]
fn second_identical_run_is_unchanged() {
    let store = MemoryRegistry::new();
    let resolver = resolver(StaticNameLookup::empty().with_name("NVDA", "NVIDIA Corporation"));
    let csv = "Ticker,Name\nAAPL,Apple Inc.\nMSFT,Microsoft Corporation\nNVDA,\n";

    let first = run(csv, Market::Us, &resolver, &store).unwrap();
    assert_eq!((first.created, first.updated, first.unchanged), (3, 0, 0));

    let second = run(csv, Market::Us, &resolver, &store).unwrap();
    assert_eq!((second.created, second.updated, second.unchanged), (0, 0, 3));
    assert!(second.written.is_empty());
    // NVDA's name now comes from the registry, not the provider.
    assert_eq!(second.lookups, 0);
}

#[test]
fn not_found_lookup_still_registers_ticker() {
    let store = MemoryRegistry::new();
    let resolver = resolver(StaticNameLookup::empty());

    let out = run("ticker\nZZZZ\nAAPL\n", Market::Us, &resolver, &store).unwrap();

    assert_eq!(out.created, 2);
    assert_eq!(out.lookups, 2);
    assert_eq!(out.enrichment_failures(), 2);
    assert_eq!(out.diagnostics[0].row, 1);
    assert_eq!(out.diagnostics[0].ticker.as_deref(), Some("ZZZZ"));
    assert_eq!(
        out.diagnostics[0].reason,
        DiagnosticReason::EnrichmentFailed(EnrichmentFailure::NotFound)
    );

    let registered = store.read_active(Market::Us).unwrap();
    assert_eq!(registered.len(), 2);
    assert!(registered.iter().all(|e| e.name.is_empty()));
}

#[test]
fn transient_lookup_errors_do_not_abort_batch() {
    let store = MemoryRegistry::new();
    let resolver = resolver(
        StaticNameLookup::empty()
            .with_name("AAPL", "Apple Inc.")
            .with_failure("TSLA", LookupError::NetworkUnreachable("connection reset".into())),
    );

    let out = run("ticker\nAAPL\nTSLA\n", Market::Us, &resolver, &store).unwrap();

    assert_eq!(out.created, 2);
    assert_eq!(
        out.diagnostics
            .iter()
            .map(|d| d.reason)
            .collect::<Vec<_>>(),
        vec![DiagnosticReason::EnrichmentFailed(EnrichmentFailure::Unavailable)]
    );
}

#[test]
fn header_without_ticker_alias_rejects_batch_with_zero_writes() {
    let store = FailingStore::default();
    let resolver = resolver(StaticNameLookup::empty());

    let err = run("price,volume\n100,2000\n", Market::Us, &resolver, &store).unwrap_err();

    assert!(matches!(
        err,
        IngestError::BatchRejected(BatchRejection::MissingTickerColumn { .. })
    ));
    assert_eq!(store.write_attempts.load(Ordering::SeqCst), 0);
}

#[test]
fn empty_and_non_utf8_files_are_rejected() {
    let store = MemoryRegistry::new();
    let resolver = resolver(StaticNameLookup::empty());
    let pipeline = IngestionPipeline::new(&resolver, &store);

    assert!(matches!(
        pipeline.run(b"", Market::Kospi),
        Err(IngestError::BatchRejected(BatchRejection::EmptyFile))
    ));
    assert!(matches!(
        pipeline.run(&[b'c', b'o', b'd', b'e', b'\n', 0xB1, 0xE8], Market::Kospi),
        Err(IngestError::BatchRejected(BatchRejection::InvalidEncoding { .. }))
    ));
    assert!(store.snapshot().is_empty());
}

#[test]
fn oversized_upload_is_rejected_before_parsing() {
    let store = MemoryRegistry::new();
    let resolver = resolver(StaticNameLookup::empty());
    let pipeline = IngestionPipeline::new(&resolver, &store).with_options(IngestOptions {
        max_file_bytes: 8,
        dry_run: false,
    });

    assert!(matches!(
        pipeline.run(b"ticker\nAAPL\n", Market::Us),
        Err(IngestError::BatchRejected(BatchRejection::TooLarge { size: 12, limit: 8 }))
    ));
}

#[test]
fn row_rejections_accumulate_and_batch_completes() {
    let store = MemoryRegistry::new();
    let resolver = resolver(StaticNameLookup::empty());

    let out = run(
        "ticker,name\nAAPL,Apple Inc.\n,Nameless\nGOOGLE,Alphabet\n   ,\nMSFT,Microsoft\n",
        Market::Us,
        &resolver,
        &store,
    )
    .unwrap();

    assert_eq!(out.total_rows, 5);
    assert_eq!(out.rejected, 3);
    assert_eq!(out.merged_rows, 2);
    assert_eq!(out.created, 2);

    let reasons: Vec<_> = out.diagnostics.iter().map(|d| (d.row, d.reason)).collect();
    assert_eq!(
        reasons,
        vec![
            (2, DiagnosticReason::Rejected(RowRejection::EmptyTicker)),
            (3, DiagnosticReason::Rejected(RowRejection::InvalidUsTickerFormat)),
            (4, DiagnosticReason::Rejected(RowRejection::EmptyTicker)),
        ]
    );
    assert_eq!(out.diagnostics[1].ticker.as_deref(), Some("GOOGLE"));
}

#[test]
fn header_only_file_completes_empty() {
    let store = MemoryRegistry::new();
    let resolver = resolver(StaticNameLookup::empty());

    let out = run("ticker,name\n", Market::Us, &resolver, &store).unwrap();
    assert_eq!(out.total_rows, 0);
    assert_eq!(out.created + out.updated + out.unchanged + out.rejected, 0);
}

#[test]
fn inactive_entries_are_reactivated_and_renamed() {
    let store = MemoryRegistry::with_entries([
        entry("000660.KS", "SK Hynix", Market::Kospi, false),
        entry("035420.KS", "NAVER", Market::Kospi, true),
        entry("051910.KS", "LG Chem", Market::Kospi, true),
    ]);
    let resolver = resolver(StaticNameLookup::empty());

    let out = run(
        "code,name\n000660,SK hynix Inc.\n035420,NAVER Corporation\n",
        Market::Kospi,
        &resolver,
        &store,
    )
    .unwrap();

    assert_eq!(out.updated, 2);
    assert_eq!(out.reactivated, 1);

    let all = store.read_market(Market::Kospi).unwrap();
    let hynix = all.iter().find(|e| e.ticker == "000660.KS").unwrap();
    assert!(hynix.active);
    assert_eq!(hynix.name, "SK hynix Inc.");
    assert_eq!(hynix.updated_at, t1());

    // Not in the batch: untouched.
    let lg = all.iter().find(|e| e.ticker == "051910.KS").unwrap();
    assert_eq!(lg.updated_at, t0());
    assert!(lg.active);
}

#[test]
fn blank_name_keeps_curated_registry_name() {
    let store = MemoryRegistry::with_entries([entry("AAPL", "Apple Inc.", Market::Us, true)]);
    let resolver = resolver(StaticNameLookup::empty().with_name("AAPL", "APPLE INC"));

    let out = run("ticker\nAAPL\n", Market::Us, &resolver, &store).unwrap();

    assert_eq!(out.unchanged, 1);
    assert_eq!(out.lookups, 0);
    assert_eq!(store.snapshot()[0].name, "Apple Inc.");
}

#[test]
fn persistence_failure_is_fatal_and_commits_nothing() {
    let store = FailingStore::default();
    let resolver = resolver(StaticNameLookup::empty());

    let err = run("ticker,name\nAAPL,Apple Inc.\n", Market::Us, &resolver, &store).unwrap_err();

    assert!(matches!(err, IngestError::Persistence(StoreError::Unavailable(_))));
    assert_eq!(store.write_attempts.load(Ordering::SeqCst), 1);
    assert!(store.inner.snapshot().is_empty());
}

#[test]
fn dry_run_reports_without_writing() {
    let store = MemoryRegistry::new();
    let resolver = resolver(StaticNameLookup::empty());
    let pipeline = IngestionPipeline::new(&resolver, &store).with_options(IngestOptions {
        dry_run: true,
        ..IngestOptions::default()
    });

    let out = pipeline.run(b"ticker,name\nAAPL,Apple Inc.\n", Market::Us).unwrap();

    assert!(out.dry_run);
    assert_eq!(out.created, 1);
    assert_eq!(out.written.len(), 1);
    assert!(store.snapshot().is_empty());
}

#[test]
fn outcome_serializes_for_the_upload_caller() {
    let store = MemoryRegistry::new();
    let resolver = resolver(StaticNameLookup::empty());

    let out = run("ticker\n\nZZZZ\n", Market::Us, &resolver, &store).unwrap();
    let json = serde_json::to_value(&out).unwrap();

    assert_eq!(json["market"], "US");
    assert_eq!(json["created"], 1);
    assert_eq!(json["diagnostics"][0]["reason"]["kind"], "enrichment_failed");
    assert_eq!(json["diagnostics"][0]["reason"]["reason"], "not_found");
    assert_eq!(json["batch_hash"].as_str().unwrap().len(), 64);
}

#[test]
fn superseded_blank_rows_trigger_no_lookup() {
    let store = MemoryRegistry::new();
    let lookup = Arc::new(StaticNameLookup::empty().with_name("AAPL", "APPLE INC"));
    let resolver = CompanyNameResolver::new(lookup.clone(), 4, None);

    let out = run(
        "ticker,name\nAAPL,\nAAPL,Apple Inc.\n",
        Market::Us,
        &resolver,
        &store,
    )
    .unwrap();

    assert_eq!(out.lookups, 0);
    assert!(lookup.calls().is_empty());
    assert_eq!(out.merged_rows, 2);
    assert_eq!(store.snapshot()[0].name, "Apple Inc.");
}
