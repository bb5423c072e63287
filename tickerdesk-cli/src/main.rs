//! Tickerdesk CLI: ticker list ingestion and registry commands.
//!
//! Commands:
//! - `ingest`: ingest a CSV ticker list for one market
//! - `list`: show or export registry entries for a market
//! - `deactivate`: soft-remove one registry entry
//! - `config`: print the effective configuration as TOML

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tickerdesk_core::config::LookupProvider;
use tickerdesk_core::ingest::normalize::canonical_ticker;
use tickerdesk_core::ingest::{DiagnosticReason, IngestionOutcome, IngestionPipeline};
use tickerdesk_core::lookup::{NameLookup, StaticNameLookup};
use tickerdesk_core::registry::{write_csv, RegistryStore};
use tickerdesk_core::{Market, TickerdeskConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_FILE: &str = "tickerdesk.toml";

#[derive(Parser)]
#[command(
    name = "tickerdesk",
    about = "Tickerdesk CLI: curate newsletter ticker lists from CSV uploads"
)]
struct Cli {
    /// Path to a TOML config file. Defaults to ./tickerdesk.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Registry file, overriding `[registry] path`.
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a CSV ticker list into the registry.
    Ingest {
        /// CSV file with a ticker column (ticker / symbol / code).
        file: PathBuf,

        /// Market of every row: KOSPI, KOSDAQ or US.
        #[arg(long)]
        market: Market,

        /// Skip external name lookups.
        #[arg(long, default_value_t = false)]
        offline: bool,

        /// Compute the outcome without writing the registry.
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Print the outcome as JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List registry entries for a market.
    List {
        #[arg(long)]
        market: Market,

        /// Include deactivated entries.
        #[arg(long, default_value_t = false)]
        all: bool,

        #[arg(long, default_value_t = false)]
        json: bool,

        /// Write `ticker,company_name` CSV that can be ingested again.
        #[arg(long, default_value_t = false, conflicts_with = "json")]
        csv: bool,
    },
    /// Soft-remove a ticker from a market's list.
    Deactivate {
        /// Ticker as listed or as uploaded, e.g. 005930, 005930.KS or aapl.
        ticker: String,

        #[arg(long)]
        market: Market,
    },
    /// Print the effective configuration as TOML.
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(path) = cli.registry {
        config.registry.path = path;
    }
    init_logging(&config)?;

    match cli.command {
        Commands::Ingest {
            file,
            market,
            offline,
            dry_run,
            json,
        } => run_ingest(&config, &file, market, offline, dry_run, json),
        Commands::List {
            market,
            all,
            json,
            csv,
        } => run_list(&config, market, all, json, csv),
        Commands::Deactivate { ticker, market } => run_deactivate(&config, &ticker, market),
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<TickerdeskConfig> {
    match path {
        Some(path) => TickerdeskConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            Ok(TickerdeskConfig::from_file(Path::new(DEFAULT_CONFIG_FILE))?)
        }
        None => Ok(TickerdeskConfig::default()),
    }
}

/// Logs go to stderr so `--json` output on stdout stays machine-readable.
fn init_logging(config: &TickerdeskConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.logging.filter)
            .with_context(|| format!("invalid log filter '{}'", config.logging.filter))?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn run_ingest(
    config: &TickerdeskConfig,
    file: &Path,
    market: Market,
    offline: bool,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let input = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;

    let lookup: Arc<dyn NameLookup> =
        if offline || config.enrichment.provider == LookupProvider::None {
            Arc::new(StaticNameLookup::empty())
        } else {
            config.build_lookup()?
        };
    let resolver = config.build_resolver(lookup);
    let store = config.open_registry();
    info!(
        provider = resolver.provider_name(),
        registry = %store.path().display(),
        "starting ingestion"
    );

    let outcome = IngestionPipeline::new(&resolver, &store)
        .with_options(config.ingest_options(dry_run))
        .run(&input, market)
        .with_context(|| format!("ingesting {}", file.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }
    Ok(())
}

fn print_outcome(outcome: &IngestionOutcome) {
    println!("Market:      {}", outcome.market);
    println!("Batch:       {}", &outcome.batch_hash[..16]);
    println!("Rows:        {}", outcome.total_rows);
    println!("Created:     {}", outcome.created);
    println!(
        "Updated:     {} ({} reactivated)",
        outcome.updated, outcome.reactivated
    );
    println!("Unchanged:   {}", outcome.unchanged);
    println!("Rejected:    {}", outcome.rejected);
    println!("Lookups:     {}", outcome.lookups);
    if outcome.dry_run {
        println!("Dry run:     {} entries not written", outcome.written.len());
    }

    if outcome.diagnostics.is_empty() {
        return;
    }
    println!();
    println!("{:>6}  {:<14} {}", "Row", "Ticker", "Issue");
    println!("{}", "-".repeat(48));
    for diag in &outcome.diagnostics {
        let ticker = diag.ticker.as_deref().unwrap_or("-");
        let marker = match diag.reason {
            DiagnosticReason::Rejected(_) => "rejected",
            DiagnosticReason::EnrichmentFailed(_) => "no name",
        };
        println!("{:>6}  {:<14} {marker}: {}", diag.row, ticker, diag.reason);
    }
}

fn run_list(
    config: &TickerdeskConfig,
    market: Market,
    all: bool,
    json: bool,
    csv: bool,
) -> Result<()> {
    let store = config.open_registry();
    let entries = if all {
        store.read_market(market)?
    } else {
        store.read_active(market)?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if csv {
        write_csv(&entries, std::io::stdout().lock()).context("writing CSV export")?;
        return Ok(());
    }
    if entries.is_empty() {
        println!("No {market} entries in {}", store.path().display());
        return Ok(());
    }

    println!(
        "{:<12} {:<40} {:<8} {}",
        "Ticker", "Name", "Active", "Updated"
    );
    println!("{}", "-".repeat(82));
    for entry in &entries {
        println!(
            "{:<12} {:<40} {:<8} {}",
            entry.ticker,
            entry.name,
            if entry.active { "yes" } else { "no" },
            entry.updated_at.format("%Y-%m-%d %H:%M UTC")
        );
    }
    println!();
    println!("{} entries", entries.len());
    Ok(())
}

fn run_deactivate(config: &TickerdeskConfig, ticker: &str, market: Market) -> Result<()> {
    let key = registry_key(ticker, market)?;
    let store = config.open_registry();
    let entry = store
        .deactivate(market, &key)
        .with_context(|| format!("deactivating {key} in {market}"))?;
    println!("Deactivated {} ({}) in {}", entry.ticker, entry.name, entry.market);
    Ok(())
}

/// Canonical registry ticker, so `005930` finds `005930.KS` under KOSPI.
fn registry_key(ticker: &str, market: Market) -> Result<String> {
    canonical_ticker(ticker, market)
        .map_err(|reason| anyhow!("'{ticker}' is not a valid {market} ticker ({reason})"))
}
