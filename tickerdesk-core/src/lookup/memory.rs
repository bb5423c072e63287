//! In-memory name lookup.
//!
//! Backs offline runs (`provider = "none"` resolves nothing) and gives tests a
//! deterministic provider that records every call it receives.

use super::provider::{LookupError, NameLookup};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Default)]
pub struct StaticNameLookup {
    names: HashMap<String, String>,
    failures: HashMap<String, LookupError>,
    delay: Duration,
    calls: Mutex<Vec<String>>,
}

impl StaticNameLookup {
    /// A provider that knows no tickers; every lookup is `NotFound`.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, ticker: impl Into<String>, name: impl Into<String>) -> Self {
        self.names.insert(ticker.into(), name.into());
        self
    }

    /// Make lookups for `ticker` fail with `error`.
    pub fn with_failure(mut self, ticker: impl Into<String>, error: LookupError) -> Self {
        self.failures.insert(ticker.into(), error);
        self
    }

    /// Sleep this long inside every lookup.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Tickers looked up so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

impl NameLookup for StaticNameLookup {
    fn name(&self) -> &str {
        "static"
    }

    fn resolve(&self, ticker: &str) -> Result<String, LookupError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(ticker.to_string());
        }
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        if let Some(err) = self.failures.get(ticker) {
            return Err(err.clone());
        }
        self.names
            .get(ticker)
            .cloned()
            .ok_or_else(|| LookupError::NotFound {
                symbol: ticker.to_string(),
            })
    }
}
