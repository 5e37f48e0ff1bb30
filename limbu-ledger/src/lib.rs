//! limbu-ledger: record persistence and CSV export

pub mod export;
pub mod store;

pub use export::{export_history_csv, history_rows, write_history_csv};
pub use store::{JsonFileStore, MemoryStore, RecordStore, StoreError, StoreResult, Upserted, STORE_FILE};
