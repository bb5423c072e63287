//! CSV export of a market's curated list.
//!
//! The header is `ticker,company_name`, both ingestion aliases, so an export
//! can be edited in a spreadsheet and uploaded again as-is.

use crate::domain::RegistryEntry;
use std::io;

pub const EXPORT_HEADER: [&str; 2] = ["ticker", "company_name"];

/// Write `entries` as CSV, one row per entry, in the given order.
pub fn write_csv<W: io::Write>(entries: &[RegistryEntry], writer: W) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(EXPORT_HEADER)?;
    for entry in entries {
        wtr.write_record([entry.ticker.as_str(), entry.name.as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}
