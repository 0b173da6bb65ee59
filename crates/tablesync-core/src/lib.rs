//! tablesync core - shared abstractions for the table sync workspace
//!
//! This crate provides the types every other tablesync crate depends on:
//!
//! - `CredentialSet` / `CredentialLoader` - validated database credentials
//! - `Connection` - trait for a live database session
//! - `Table` - rectangular, column-ordered result data
//! - `Value` - a single scalar cell
//! - Error taxonomy for configuration, connection and query failures

mod connection;
mod credentials;
mod error;
pub mod security;
mod table;
mod types;

pub use connection::*;
pub use credentials::*;
pub use error::*;
pub use security::TlsMode;
pub use table::*;
pub use types::*;
