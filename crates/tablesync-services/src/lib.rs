//! tablesync services layer
//!
//! Orchestrates the single-table workflow on top of the driver and the CSV
//! interchange crates.
//!
//! ```text
//! CredentialSet ─→ DatabaseTableSync::create ─→ PostgresConnection
//!                        │
//!                        ├─ extract()        SELECT * FROM <table>  → Table
//!                        ├─ export_to_csv()  extract + write_csv    → ExportSummary
//!                        └─ import_from_csv() read_csv              → Table
//! ```
//!
//! # Services
//!
//! - [`DatabaseTableSync`] - async component owning one connection
//! - [`BlockingTableSync`] - the same operations for synchronous callers

mod blocking;
mod table_sync;

pub use blocking::BlockingTableSync;
pub use table_sync::{DatabaseTableSync, SyncOptions, quote_identifier};

pub use tablesync_interchange::{
    CsvOptions, ExportError, ExportSummary, ImportError, ValueInference, read_csv,
};
