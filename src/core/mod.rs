//! Core abstractions shared by sources, stores and the loader

pub mod config;
pub mod error;
pub mod log;
pub mod record;
pub mod source;
pub mod store;

// Re-export main types for cleaner imports
pub use error::{DecodeError, FetchError, LoadError, StoreError, SyncError};
pub use record::{ExchangeRate, RateTable, Record, User};
pub use source::{Batch, Skipped, Source};
pub use store::Store;
