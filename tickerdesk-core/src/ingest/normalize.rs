//! Ticker canonicalization per market.
//!
//! - KOSPI / KOSDAQ: bare 6-digit KRX codes get the exchange suffix
//!   (`.KS` / `.KQ`). Anything else passes through as-is.
//! - US: no suffix; 1–5 alphanumerics with an optional share-class suffix
//!   (`BRK.B`). Anything else is rejected.

use super::error::RowRejection;
use crate::domain::{CanonicalRow, Market, NormalizedRecord};

/// Stateless normalizer bound to the market selected for the batch.
#[derive(Debug, Clone, Copy)]
pub struct TickerNormalizer {
    market: Market,
}

impl TickerNormalizer {
    pub fn new(market: Market) -> Self {
        Self { market }
    }

    /// Canonicalize one row. The name is carried through verbatim.
    pub fn normalize(&self, row: CanonicalRow) -> Result<NormalizedRecord, RowRejection> {
        let ticker = canonical_ticker(&row.ticker_raw, self.market)?;
        Ok(NormalizedRecord {
            row: row.row,
            ticker,
            market: self.market,
            name: row.name_raw.unwrap_or_default(),
        })
    }
}

/// Canonical registry key for a raw ticker in the given market.
pub fn canonical_ticker(raw: &str, market: Market) -> Result<String, RowRejection> {
    let ticker = raw.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(RowRejection::EmptyTicker);
    }

    match market.krx_suffix() {
        Some(suffix) if is_krx_code(&ticker) => Ok(format!("{ticker}{suffix}")),
        Some(_) => Ok(ticker),
        None if is_us_symbol(&ticker) => Ok(ticker),
        None => Err(RowRejection::InvalidUsTickerFormat),
    }
}

/// Exactly six ASCII digits, e.g. `005930`.
pub fn is_krx_code(ticker: &str) -> bool {
    ticker.len() == 6 && ticker.bytes().all(|b| b.is_ascii_digit())
}

/// `[A-Z0-9]{1,5}` optionally followed by `.` and one or two letters.
pub fn is_us_symbol(ticker: &str) -> bool {
    let (base, class) = match ticker.split_once('.') {
        Some((base, class)) => (base, Some(class)),
        None => (ticker, None),
    };

    let base_ok = (1..=5).contains(&base.len()) && base.bytes().all(|b| b.is_ascii_alphanumeric());
    let class_ok = class.map_or(true, |c| {
        (1..=2).contains(&c.len()) && c.bytes().all(|b| b.is_ascii_alphabetic())
    });

    base_ok && class_ok
}
