// MSSQL module - the SQL Server provider
//
// This module is split into several sub-modules:
// - dialect: pure SQL Server text generation and catalog decoding
// - typemap: native type table
// - script: literals and the debug script
// - config: connection options and ADO connection strings
// - client: opening and closing connections
// - params: value conversion between ParamValue and tiberius
// - query: batch preparation and result collection
// - executor: the DbProvider implementation
// - transaction: connection-owning transactions

pub mod client;
pub mod config;
pub mod dialect;
pub mod executor;
mod params;
mod query;
mod script;
pub mod transaction;
pub mod typemap;

pub use client::{MssqlClient, open_connection};
pub use config::{MssqlOptions, MssqlOptionsBuilder};
pub use dialect::{MssqlDialect, RETURN_VALUE_NAME};
pub use executor::MssqlProvider;
pub use query::PRIMARY_KEY_VIOLATION;
pub use transaction::MssqlTransaction;
pub use typemap::SqlDbType;
