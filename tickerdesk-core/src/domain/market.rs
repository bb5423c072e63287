//! Markets a ticker list can be curated for.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Target market for a batch, selected by the administrator at upload time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Market {
    Kospi,
    Kosdaq,
    Us,
}

impl Market {
    /// Canonical label, as stored in the registry.
    pub fn as_str(&self) -> &'static str {
        match self {
            Market::Kospi => "KOSPI",
            Market::Kosdaq => "KOSDAQ",
            Market::Us => "US",
        }
    }

    /// Exchange suffix appended to bare 6-digit KRX codes.
    pub fn krx_suffix(&self) -> Option<&'static str> {
        match self {
            Market::Kospi => Some(".KS"),
            Market::Kosdaq => Some(".KQ"),
            Market::Us => None,
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown market '{0}' (expected KOSPI, KOSDAQ or US)")]
pub struct MarketParseError(pub String);

impl FromStr for Market {
    type Err = MarketParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "KOSPI" => Ok(Market::Kospi),
            "KOSDAQ" => Ok(Market::Kosdaq),
            "US" => Ok(Market::Us),
            _ => Err(MarketParseError(s.to_string())),
        }
    }
}
