//! TOML configuration.
//!
//! ```toml
//! [ingest]
//! max_file_bytes = 16777216
//!
//! [enrichment]
//! provider = "yahoo"          # or "none" for offline runs
//! timeout_secs = 30
//! request_timeout_secs = 10
//! max_concurrent_lookups = 4
//! breaker_cooldown_secs = 1800
//! breaker_failure_threshold = 3
//!
//! [registry]
//! path = "data/registry.json"
//!
//! [logging]
//! filter = "info"
//! json = false
//! ```
//!
//! Every section and key is optional; missing values take the defaults above.

use crate::ingest::{CompanyNameResolver, IngestOptions, DEFAULT_MAX_FILE_BYTES};
use crate::lookup::{CachedNameLookup, CircuitBreaker, NameLookup, StaticNameLookup, YahooNameLookup};
use crate::registry::JsonFileRegistry;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickerdeskConfig {
    pub ingest: IngestSection,
    pub enrichment: EnrichmentSection,
    pub registry: RegistrySection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSection {
    pub max_file_bytes: usize,
}

impl Default for IngestSection {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupProvider {
    /// Yahoo Finance chart API.
    Yahoo,
    /// No external calls; blank names stay blank.
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentSection {
    pub provider: LookupProvider,
    /// Bound on the whole enrichment phase of a batch. 0 disables the bound.
    pub timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_concurrent_lookups: usize,
    pub breaker_cooldown_secs: u64,
    pub breaker_failure_threshold: u32,
}

impl Default for EnrichmentSection {
    fn default() -> Self {
        Self {
            provider: LookupProvider::Yahoo,
            timeout_secs: 30,
            request_timeout_secs: 10,
            max_concurrent_lookups: 4,
            breaker_cooldown_secs: 30 * 60,
            breaker_failure_threshold: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySection {
    pub path: PathBuf,
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/registry.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` wins when set.
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            filter: "info".into(),
            json: false,
        }
    }
}

impl TickerdeskConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ingest.max_file_bytes == 0 {
            return Err(ConfigError::Invalid("ingest.max_file_bytes must be > 0".into()));
        }
        if self.enrichment.max_concurrent_lookups == 0 {
            return Err(ConfigError::Invalid(
                "enrichment.max_concurrent_lookups must be > 0".into(),
            ));
        }
        if self.enrichment.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "enrichment.request_timeout_secs must be > 0".into(),
            ));
        }
        Ok(())
    }

    pub fn ingest_options(&self, dry_run: bool) -> IngestOptions {
        IngestOptions {
            max_file_bytes: self.ingest.max_file_bytes,
            dry_run,
        }
    }

    pub fn enrichment_timeout(&self) -> Option<Duration> {
        match self.enrichment.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Build the configured lookup provider.
    pub fn build_lookup(&self) -> Result<Arc<dyn NameLookup>, ConfigError> {
        let e = &self.enrichment;
        match e.provider {
            LookupProvider::None => Ok(Arc::new(StaticNameLookup::empty())),
            LookupProvider::Yahoo => {
                let breaker = Arc::new(CircuitBreaker::new(
                    Duration::from_secs(e.breaker_cooldown_secs),
                    e.breaker_failure_threshold,
                ));
                let yahoo =
                    YahooNameLookup::new(breaker, Duration::from_secs(e.request_timeout_secs))
                        .map_err(|err| ConfigError::Invalid(err.to_string()))?;
                Ok(Arc::new(CachedNameLookup::new(yahoo)))
            }
        }
    }

    pub fn build_resolver(&self, lookup: Arc<dyn NameLookup>) -> CompanyNameResolver {
        CompanyNameResolver::new(
            lookup,
            self.enrichment.max_concurrent_lookups,
            self.enrichment_timeout(),
        )
    }

    pub fn open_registry(&self) -> JsonFileRegistry {
        JsonFileRegistry::new(&self.registry.path)
    }
}
