//! Datasources that compiled filters can run against.

pub mod directory;
pub mod error;
pub mod sql;

pub use directory::MemoryDirectory;
pub use error::ConnectorError;
pub use sql::sqlite::SqliteDatasource;
