//! PostgreSQL driver implementation

mod connection;
mod decode;
mod driver;
mod tls;

pub use connection::{PostgresCancelHandle, PostgresConnection};
pub use driver::{ConnectOptions, PostgresDriver};
pub use tls::{PostgresTlsConnector, TlsError};
