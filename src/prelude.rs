//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and traits
//! to make it easier to get started with the library.

pub use crate::command::{DEFAULT_COMMAND_TIMEOUT, DbCommand};
pub use crate::config::ProviderConfig;
pub use crate::error::{NativeError, ProviderError};
pub use crate::fragments::{DateInterval, DateOffset, DateStart, RowLimit};
pub use crate::logging::{LogPriority, LogSink, TracingLogSink};
pub use crate::parameters::{DbParameter, ParameterCollection};
pub use crate::provider::{
    DbProvider, DbTransaction, DialectDescriptor, ServerIdentity, SqlDialect,
};
pub use crate::results::{DataSet, DbRow, ResultSet};
pub use crate::schema::{DbColumn, DbIndex};
pub use crate::types::{
    BackendName, CommandType, DateTimeKind, GenericType, ParamValue, ParameterDirection,
    ProviderFamily, RowVersion, RuntimeType, TypeFamily,
};

#[cfg(feature = "mssql")]
pub use crate::mssql::{
    MssqlDialect, MssqlOptions, MssqlOptionsBuilder, MssqlProvider, MssqlTransaction,
    SqlDbType,
};
