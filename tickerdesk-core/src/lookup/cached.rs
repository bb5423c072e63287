//! Process-wide memo in front of another lookup.
//!
//! Company names change rarely, so resolved names and definitive `NotFound`
//! answers are kept for the lifetime of the process. Transient failures
//! (timeouts, throttling, outages) are not cached and will be retried by the
//! next batch.

use super::provider::{LookupError, NameLookup};
use std::collections::HashMap;
use std::sync::RwLock;

pub struct CachedNameLookup<L> {
    inner: L,
    entries: RwLock<HashMap<String, Option<String>>>,
}

impl<L: NameLookup> CachedNameLookup<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<L: NameLookup> NameLookup for CachedNameLookup<L> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn resolve(&self, ticker: &str) -> Result<String, LookupError> {
        if let Some(hit) = self.entries.read().ok().and_then(|e| e.get(ticker).cloned()) {
            return hit.ok_or_else(|| LookupError::NotFound {
                symbol: ticker.to_string(),
            });
        }

        let result = self.inner.resolve(ticker);
        let cacheable = match &result {
            Ok(name) => Some(Some(name.clone())),
            Err(LookupError::NotFound { .. }) => Some(None),
            Err(_) => None,
        };
        if let (Some(value), Ok(mut entries)) = (cacheable, self.entries.write()) {
            entries.insert(ticker.to_string(), value);
        }
        result
    }
}
