//! Persistent ticker registry: store trait, implementations and CSV export.

pub mod export;
pub mod json_file;
pub mod memory;
pub mod store;

pub use export::write_csv;
pub use json_file::JsonFileRegistry;
pub use memory::MemoryRegistry;
pub use store::{RegistryStore, StoreError};
