//! Header alias resolution.
//!
//! Uploaded files come from spreadsheets exported by hand, so the ticker and
//! company-name columns show up under several spellings. All accepted spellings
//! live in [`ALIASES`]; matching ignores case and whitespace.

use super::error::{BatchRejection, RowRejection};
use crate::domain::{CanonicalRow, RawRow};

/// Canonical column a header can map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalColumn {
    Ticker,
    Name,
}

/// Alias table, keyed by the folded header form (lowercase, no whitespace).
pub const ALIASES: &[(&str, CanonicalColumn)] = &[
    ("ticker", CanonicalColumn::Ticker),
    ("symbol", CanonicalColumn::Ticker),
    ("code", CanonicalColumn::Ticker),
    ("name", CanonicalColumn::Name),
    ("company_name", CanonicalColumn::Name),
    ("company", CanonicalColumn::Name),
    ("companyname", CanonicalColumn::Name),
    ("longname", CanonicalColumn::Name),
];

/// Fold a header for alias lookup: drop whitespace, lowercase.
fn fold(header: &str) -> String {
    header
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Look up which canonical column a raw header names, if any.
pub fn classify_header(header: &str) -> Option<CanonicalColumn> {
    let folded = fold(header);
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == folded)
        .map(|(_, column)| *column)
}

/// Column positions resolved once from the header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub ticker: usize,
    pub name: Option<usize>,
}

impl ColumnMap {
    /// Resolve the header row. The first matching column in header order wins.
    ///
    /// Fails the whole batch when no ticker alias is present.
    pub fn resolve<'a, I>(headers: I) -> Result<Self, BatchRejection>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut ticker = None;
        let mut name = None;
        let mut seen = Vec::new();

        for (idx, header) in headers.into_iter().enumerate() {
            seen.push(header.to_string());
            match classify_header(header) {
                Some(CanonicalColumn::Ticker) if ticker.is_none() => ticker = Some(idx),
                Some(CanonicalColumn::Name) if name.is_none() => name = Some(idx),
                _ => {}
            }
        }

        match ticker {
            Some(ticker) => Ok(Self { ticker, name }),
            None => Err(BatchRejection::MissingTickerColumn { headers: seen }),
        }
    }

    /// Extract the canonical fields of one data row.
    ///
    /// Missing trailing cells read as empty.
    pub fn canonical_row(&self, row: usize, raw: &RawRow) -> Result<CanonicalRow, RowRejection> {
        let ticker_raw = raw.get(self.ticker).unwrap_or("").trim();
        if ticker_raw.is_empty() {
            return Err(RowRejection::EmptyTicker);
        }

        let name_raw = self
            .name
            .and_then(|idx| raw.get(idx))
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(String::from);

        Ok(CanonicalRow {
            row,
            ticker_raw: ticker_raw.to_string(),
            name_raw,
        })
    }
}
