//! Connection-agnostic database provider contract.
//!
//! Application code builds [`DbCommand`]s through a [`SqlDialect`] and runs them through a
//! [`DbProvider`]; neither trait exposes the driver underneath. The `mssql` feature (on by
//! default) supplies the SQL Server implementation on top of `tiberius`.
//!
//! ```rust
//! use sql_provider::prelude::*;
//!
//! let dialect = MssqlDialect;
//! let command = dialect
//!     .build_text_command(
//!         "select name from dbo.users where id = @id",
//!         &[dialect.create_input_parameter("id", GenericType::Int32, ParamValue::Int(7))],
//!     )
//!     .unwrap();
//! assert_eq!(command.parameters.get("@id").unwrap().value(), &ParamValue::Int(7));
//! assert_eq!(
//!     dialect.debug_script(&command),
//!     "declare @id int\nset @id = 7\nselect name from dbo.users where id = @id"
//! );
//! ```

pub mod command;
pub mod config;
pub mod error;
pub mod fragments;
pub mod logging;
pub mod parameters;
pub mod prelude;
pub mod provider;
pub mod results;
pub mod schema;
pub mod types;

#[cfg(feature = "mssql")]
pub mod mssql;

pub use command::{DEFAULT_COMMAND_TIMEOUT, DbCommand};
pub use error::{NativeError, ProviderError};
pub use parameters::{DbParameter, ParameterCollection};
pub use provider::{DbProvider, DbTransaction, SqlDialect};
