//! Domain types shared by the pipeline, lookup providers and registry stores.

pub mod market;
pub mod record;
pub mod registry_entry;

pub use market::{Market, MarketParseError};
pub use record::{
    CanonicalRow, EnrichedRecord, EnrichmentFailure, NameSource, NormalizedRecord, RawRow,
};
pub use registry_entry::RegistryEntry;
