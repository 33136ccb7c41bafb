//! Price Store
//!
//! In-memory daily price series per market. Data is ingested from CSV into an
//! immutable [`PriceSnapshot`]; [`PriceStore`] swaps whole snapshots so that
//! readers always see one consistent version.

pub mod error;
pub mod loader;
pub mod snapshot;
pub mod store;

pub use error::StoreError;
pub use loader::{load_csv, parse_csv, LoadedRecords};
pub use snapshot::{PriceSnapshot, SnapshotStats};
pub use store::PriceStore;

#[cfg(test)]
mod tests;
