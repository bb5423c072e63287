//! Company-name lookup providers.

pub mod cached;
pub mod circuit_breaker;
pub mod memory;
pub mod provider;
pub mod yahoo;

pub use cached::CachedNameLookup;
pub use circuit_breaker::CircuitBreaker;
pub use memory::StaticNameLookup;
pub use provider::{LookupError, NameLookup};
pub use yahoo::YahooNameLookup;
