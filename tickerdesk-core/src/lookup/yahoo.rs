//! Yahoo Finance name lookup.
//!
//! Reads `meta.longName` (falling back to `meta.shortName`) from the v8 chart
//! API, which answers for US symbols and suffixed KRX codes alike
//! (`005930.KS`, `247540.KQ`).
//!
//! Yahoo Finance has no official API and is subject to unannounced format
//! changes; every failure here degrades to an enrichment flag, never a batch
//! failure.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{LookupError, NameLookup};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    long_name: Option<String>,
    short_name: Option<String>,
}

pub struct YahooNameLookup {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    base_url: String,
}

impl YahooNameLookup {
    pub fn new(
        circuit_breaker: Arc<CircuitBreaker>,
        request_timeout: Duration,
    ) -> Result<Self, LookupError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(request_timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| LookupError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the provider at a different host (mirrors, local fakes).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn chart_url(&self, ticker: &str) -> String {
        format!(
            "{}/v8/finance/chart/{ticker}?range=1d&interval=1d",
            self.base_url.trim_end_matches('/')
        )
    }

    fn parse_response(ticker: &str, resp: ChartResponse) -> Result<String, LookupError> {
        let not_found = || LookupError::NotFound {
            symbol: ticker.to_string(),
        };

        let result = match (resp.chart.result, resp.chart.error) {
            (Some(result), _) => result,
            (None, Some(err)) if err.code == "Not Found" => return Err(not_found()),
            (None, Some(err)) => {
                return Err(LookupError::ResponseFormatChanged(format!(
                    "{}: {}",
                    err.code, err.description
                )))
            }
            (None, None) => {
                return Err(LookupError::ResponseFormatChanged(
                    "empty result with no error".into(),
                ))
            }
        };

        let meta = result.into_iter().next().ok_or_else(not_found)?.meta;
        [meta.long_name, meta.short_name]
            .into_iter()
            .flatten()
            .map(|name| name.trim().to_string())
            .find(|name| !name.is_empty())
            .ok_or_else(not_found)
    }
}

impl NameLookup for YahooNameLookup {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn resolve(&self, ticker: &str) -> Result<String, LookupError> {
        if !self.circuit_breaker.is_allowed() {
            debug!(
                %ticker,
                cooldown = ?self.circuit_breaker.remaining_cooldown(),
                "circuit open, skipping lookup"
            );
            return Err(LookupError::CircuitOpen);
        }

        let url = self.chart_url(ticker);
        debug!(%ticker, %url, "resolving company name");

        let resp = match self.client.get(&url).send() {
            Ok(resp) => resp,
            Err(e) if e.is_timeout() => {
                self.circuit_breaker.record_failure();
                return Err(LookupError::Timeout);
            }
            Err(e) => {
                self.circuit_breaker.record_failure();
                return Err(LookupError::NetworkUnreachable(e.to_string()));
            }
        };

        let status = resp.status();
        if status == reqwest::StatusCode::FORBIDDEN {
            self.circuit_breaker.trip();
            return Err(LookupError::CircuitOpen);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            self.circuit_breaker.record_failure();
            let retry_after_secs = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(LookupError::RateLimited { retry_after_secs });
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            // Yahoo answers 404 with a JSON body for unknown symbols.
            self.circuit_breaker.record_success();
            return Err(LookupError::NotFound {
                symbol: ticker.to_string(),
            });
        }
        if !status.is_success() {
            self.circuit_breaker.record_failure();
            return Err(LookupError::Other(format!("HTTP {status} for {ticker}")));
        }

        let chart: ChartResponse = resp.json().map_err(|e| {
            LookupError::ResponseFormatChanged(format!("failed to parse response for {ticker}: {e}"))
        })?;
        self.circuit_breaker.record_success();
        Self::parse_response(ticker, chart)
    }
}
