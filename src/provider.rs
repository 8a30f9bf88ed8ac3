//! The provider contract.
//!
//! [`SqlDialect`] carries every operation that only produces values or text: the dialect
//! descriptor, parameter lifecycle, type mapping, SQL fragments and debug scripts.
//! [`DbProvider`] adds everything that talks to a server. Callers depend on these traits
//! only; a backend supplies one implementation of each.

use async_trait::async_trait;
use serde::Serialize;

use crate::command::DbCommand;
use crate::error::ProviderError;
use crate::fragments::{DateInterval, DateOffset, DateStart, RowLimit};
use crate::parameters::{DbParameter, ParameterCollection};
use crate::results::{DataSet, ResultSet};
use crate::schema::{DbColumn, DbIndex};
use crate::types::{
    BackendName, GenericType, ParamValue, ParameterDirection, ProviderFamily, RuntimeType,
    TypeFamily,
};

/// Lexical conventions of a dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DialectDescriptor {
    pub no_op_text: &'static str,
    pub default_table_alias: &'static str,
    pub parameter_prefix: &'static str,
    pub bind_value_prefix: &'static str,
}

impl DialectDescriptor {
    /// Conventions shared by most back-ends.
    pub const COMMON: DialectDescriptor = DialectDescriptor {
        no_op_text: "--",
        default_table_alias: "T",
        parameter_prefix: "@",
        bind_value_prefix: "@",
    };
}

impl Default for DialectDescriptor {
    fn default() -> Self {
        Self::COMMON
    }
}

/// Server facts captured once when a provider is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ServerIdentity {
    pub host: String,
    pub version: String,
    pub database: String,
}

/// Pure, text-producing half of the provider contract.
pub trait SqlDialect: Send + Sync {
    fn family(&self) -> ProviderFamily;

    fn backend(&self) -> BackendName;

    fn no_op_text(&self) -> &'static str {
        DialectDescriptor::COMMON.no_op_text
    }

    fn default_table_alias(&self) -> &'static str {
        DialectDescriptor::COMMON.default_table_alias
    }

    fn parameter_prefix(&self) -> &'static str {
        DialectDescriptor::COMMON.parameter_prefix
    }

    fn bind_value_prefix(&self) -> &'static str {
        DialectDescriptor::COMMON.bind_value_prefix
    }

    fn descriptor(&self) -> DialectDescriptor {
        DialectDescriptor {
            no_op_text: self.no_op_text(),
            default_table_alias: self.default_table_alias(),
            parameter_prefix: self.parameter_prefix(),
            bind_value_prefix: self.bind_value_prefix(),
        }
    }

    /// Prefix `name` with the parameter prefix unless it already starts with it.
    fn build_parameter_name(&self, name: &str) -> String {
        with_prefix(name, self.parameter_prefix())
    }

    /// Prefix `name` with the bind-variable prefix unless it already starts with it.
    fn build_bind_variable_name(&self, name: &str) -> String {
        with_prefix(name, self.bind_value_prefix())
    }

    /// Case-insensitive lookup of a native type name.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::UnmappedType` for names missing from the mapping table.
    fn generic_type_from_native(&self, native_type: &str) -> Result<GenericType, ProviderError>;

    /// Native type name used when a parameter only declares a generic type.
    fn native_type_from_generic(&self, generic_type: GenericType) -> &'static str;

    fn runtime_type(&self, generic_type: GenericType) -> RuntimeType {
        generic_type.runtime_type()
    }

    /// Build a parameter.
    ///
    /// The name gets the dialect prefix, a missing value becomes `DbNull` with the declared
    /// type kept, and `max_length` only sticks for `Output`/`InputOutput` parameters. When
    /// `native_type` is `None` the generic type's default native type is used.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::UnmappedType` if `native_type` is not a known native type.
    fn create_parameter(
        &self,
        name: &str,
        generic_type: GenericType,
        native_type: Option<&str>,
        max_length: Option<usize>,
        direction: ParameterDirection,
        value: Option<ParamValue>,
    ) -> Result<DbParameter, ProviderError> {
        let native_type = match native_type {
            Some(native) => {
                self.generic_type_from_native(native)?;
                native.trim().to_ascii_lowercase()
            }
            None => self.native_type_from_generic(generic_type).to_string(),
        };
        let parameter = DbParameter::new(
            self.build_parameter_name(name),
            generic_type,
            native_type,
            direction,
        )
        .with_value(value.unwrap_or_default())
        .with_size(max_length);
        Ok(apply_size_rule(parameter))
    }

    /// Input parameter with the generic type's default native type.
    fn create_input_parameter(
        &self,
        name: &str,
        generic_type: GenericType,
        value: ParamValue,
    ) -> DbParameter {
        let parameter = DbParameter::new(
            self.build_parameter_name(name),
            generic_type,
            self.native_type_from_generic(generic_type),
            ParameterDirection::Input,
        );
        parameter.with_value(value)
    }

    /// Deep copy of `parameter` with the size rule re-applied.
    fn clone_parameter(&self, parameter: &DbParameter) -> DbParameter {
        apply_size_rule(parameter.clone())
    }

    /// Insert a clone of `parameter` into `target`, returning the inserted instance.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::DuplicateParameter` if `target` already holds that name;
    /// `target` is unchanged. Use [`ParameterCollection::set_value`] to update.
    fn copy_to_collection<'c>(
        &self,
        target: &'c mut ParameterCollection,
        parameter: &DbParameter,
    ) -> Result<&'c DbParameter, ProviderError> {
        target.push(self.clone_parameter(parameter))
    }

    /// Type-aware value comparison; see [`parameters_equal`].
    fn compare_equality(&self, left: &DbParameter, right: &DbParameter) -> bool {
        parameters_equal(left, right)
    }

    /// Deep copy of a command, cloning every parameter through [`Self::clone_parameter`].
    fn clone_command(&self, command: &DbCommand) -> DbCommand {
        let mut copy = command.clone();
        for parameter in copy.parameters.iter_mut() {
            *parameter = self.clone_parameter(parameter);
        }
        copy
    }

    /// Ad hoc SQL command holding clones of `parameters`.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::DuplicateParameter` if two parameters share a name.
    fn build_text_command(
        &self,
        sql: &str,
        parameters: &[DbParameter],
    ) -> Result<DbCommand, ProviderError> {
        let mut command = DbCommand::text(sql);
        for parameter in parameters {
            self.copy_to_collection(&mut command.parameters, parameter)?;
        }
        Ok(command)
    }

    fn build_no_op_command(&self) -> DbCommand {
        DbCommand::text(self.no_op_text())
    }

    /// Statement storing the previous statement's affected-row count in `parameter_name`.
    fn row_count_fragment(&self, parameter_name: &str) -> String;

    /// Cap the rows returned by `sql` without touching its columns, joins or ordering.
    fn max_rows_rewrite(&self, sql: &str, limit: &RowLimit) -> String;

    /// [`Self::max_rows_rewrite`] for a loosely typed buffer size.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::InvalidArgument` unless `buffer_size` is null, an integer or
    /// text.
    fn max_rows_rewrite_value(
        &self,
        sql: &str,
        buffer_size: &ParamValue,
    ) -> Result<String, ProviderError> {
        let limit = RowLimit::try_from(buffer_size)?;
        Ok(self.max_rows_rewrite(sql, &limit))
    }

    /// Date-add expression combining `interval`, `offset` and `start`.
    fn date_math(&self, interval: DateInterval, offset: DateOffset, start: DateStart) -> String;

    /// `counter` only labels the statement; nesting is tracked by the caller.
    fn transaction_begin(&self, counter: u32) -> String;

    fn transaction_commit(&self, counter: u32) -> String;

    fn transaction_rollback(&self, counter: u32) -> String;

    /// Call text for a stored procedure, arguments in collection order.
    fn stored_procedure_call_text(&self, name: &str, parameters: &ParameterCollection) -> String;

    /// Runnable script reproducing `command` for interactive troubleshooting. Never fails.
    fn debug_script(&self, command: &DbCommand) -> String;
}

/// A transaction owning the connection it runs on.
#[async_trait]
pub trait DbTransaction: Send {
    /// # Errors
    ///
    /// Returns `ProviderError::Execution` if the commit statement fails.
    async fn commit(self) -> Result<(), ProviderError>;

    /// # Errors
    ///
    /// Returns `ProviderError::Execution` if the rollback statement fails.
    async fn rollback(self) -> Result<(), ProviderError>;
}

/// Server-facing half of the provider contract.
///
/// Every execution primitive opens a dedicated connection for the call (or runs on the
/// supplied transaction's connection), writes output parameter values back into the
/// command, and releases the connection before returning.
#[async_trait]
pub trait DbProvider: Send + Sync {
    type Dialect: SqlDialect;
    type Transaction: DbTransaction;

    fn dialect(&self) -> &Self::Dialect;

    fn connection_string(&self) -> &str;

    fn identity(&self) -> &ServerIdentity;

    async fn begin_transaction(&self) -> Result<Self::Transaction, ProviderError>;

    /// Stored-procedure command with parameters derived from the server catalog.
    async fn build_stored_procedure_command(&self, name: &str)
    -> Result<DbCommand, ProviderError>;

    async fn build_stored_procedure_command_tx(
        &self,
        name: &str,
        transaction: &mut Self::Transaction,
    ) -> Result<DbCommand, ProviderError>;

    /// First column of the first row, or `DbNull`.
    async fn execute_scalar(&self, command: &mut DbCommand) -> Result<ParamValue, ProviderError>;

    async fn execute_scalar_tx(
        &self,
        command: &mut DbCommand,
        transaction: &mut Self::Transaction,
    ) -> Result<ParamValue, ProviderError>;

    /// Rows affected.
    async fn execute_non_query(&self, command: &mut DbCommand) -> Result<u64, ProviderError>;

    async fn execute_non_query_tx(
        &self,
        command: &mut DbCommand,
        transaction: &mut Self::Transaction,
    ) -> Result<u64, ProviderError>;

    /// First result set.
    async fn execute_reader(&self, command: &mut DbCommand) -> Result<ResultSet, ProviderError>;

    async fn execute_reader_tx(
        &self,
        command: &mut DbCommand,
        transaction: &mut Self::Transaction,
    ) -> Result<ResultSet, ProviderError>;

    /// XML document produced by a `FOR XML` query.
    async fn execute_xml_reader(&self, command: &mut DbCommand) -> Result<String, ProviderError>;

    async fn execute_xml_reader_tx(
        &self,
        command: &mut DbCommand,
        transaction: &mut Self::Transaction,
    ) -> Result<String, ProviderError>;

    /// Every result set.
    async fn execute_data_set(&self, command: &mut DbCommand) -> Result<DataSet, ProviderError>;

    async fn execute_data_set_tx(
        &self,
        command: &mut DbCommand,
        transaction: &mut Self::Transaction,
    ) -> Result<DataSet, ProviderError>;

    async fn table_indexes(&self, schema: &str, table: &str)
    -> Result<Vec<DbIndex>, ProviderError>;

    async fn table_columns(&self, schema: &str, table: &str)
    -> Result<Vec<DbColumn>, ProviderError>;

    /// Whether `error` is the back-end's primary-key violation.
    fn is_primary_key_violation(&self, error: &ProviderError) -> bool;
}

fn with_prefix(name: &str, prefix: &str) -> String {
    if name.starts_with(prefix) {
        name.to_string()
    } else {
        format!("{prefix}{name}")
    }
}

/// Only output parameters keep a declared size; inputs are sized by their value.
pub(crate) fn apply_size_rule(mut parameter: DbParameter) -> DbParameter {
    if !matches!(
        parameter.direction(),
        ParameterDirection::Output | ParameterDirection::InputOutput
    ) {
        parameter.set_size(None);
    }
    parameter
}

/// Compare two parameter values by their type family.
///
/// Output and return-value parameters never compare equal: their value is not known yet.
/// Parameters of the same family compare through the family's widest coercion (decimal,
/// 64-bit integer, double, case-insensitive text, date-time); anything else, including a
/// failed coercion, falls back to plain value equality. The result is symmetric.
#[must_use]
pub fn parameters_equal(left: &DbParameter, right: &DbParameter) -> bool {
    let unknown = |p: &DbParameter| {
        matches!(
            p.direction(),
            ParameterDirection::Output | ParameterDirection::ReturnValue
        )
    };
    if unknown(left) || unknown(right) {
        return false;
    }

    let family = left.generic_type().family();
    let (l, r) = (left.value(), right.value());
    if family != right.generic_type().family() {
        return l == r;
    }

    let coerced = match family {
        TypeFamily::Exact => both(l.as_decimal(), r.as_decimal()),
        TypeFamily::Integer => both(l.as_i64(), r.as_i64()),
        TypeFamily::Approximate => both(l.as_f64(), r.as_f64()),
        TypeFamily::Text => match (l.as_text(), r.as_text()) {
            (Some(a), Some(b)) => Some(a.to_lowercase() == b.to_lowercase()),
            _ => None,
        },
        TypeFamily::Temporal => both(l.as_datetime(), r.as_datetime()),
        _ => None,
    };
    coerced.unwrap_or_else(|| l == r)
}

fn both<T: PartialEq>(left: Option<T>, right: Option<T>) -> Option<bool> {
    Some(left? == right?)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn param(generic: GenericType, value: ParamValue) -> DbParameter {
        DbParameter::new("@p", generic, "", ParameterDirection::Input).with_value(value)
    }

    #[test]
    fn prefixing_is_idempotent() {
        assert_eq!(with_prefix("id", "@"), "@id");
        assert_eq!(with_prefix("@id", "@"), "@id");
        assert_eq!(with_prefix("a@b", "@"), "@a@b");
    }

    #[test]
    fn size_rule_drops_size_for_inputs() {
        let input = DbParameter::new("@a", GenericType::String, "nvarchar", ParameterDirection::Input)
            .with_size(Some(10));
        let output =
            DbParameter::new("@b", GenericType::String, "nvarchar", ParameterDirection::Output)
                .with_size(Some(10));
        assert_eq!(apply_size_rule(input).size(), None);
        assert_eq!(apply_size_rule(output).size(), Some(10));
    }

    #[test]
    fn equality_widens_numeric_families() {
        let cases = [
            (
                param(GenericType::Int32, ParamValue::Int(5)),
                param(GenericType::Int16, ParamValue::SmallInt(5)),
                true,
            ),
            (
                param(GenericType::Int64, ParamValue::BigInt(5)),
                param(GenericType::Byte, ParamValue::Text("5".into())),
                true,
            ),
            (
                param(GenericType::Decimal, ParamValue::Decimal(Decimal::new(150, 2))),
                param(GenericType::Currency, ParamValue::Float(1.5)),
                true,
            ),
            (
                param(GenericType::Double, ParamValue::Real(0.5)),
                param(GenericType::Single, ParamValue::Float(0.25)),
                false,
            ),
            (
                param(GenericType::String, ParamValue::Text("Hello".into())),
                param(GenericType::AnsiString, ParamValue::Text("hELLO".into())),
                true,
            ),
            (
                param(GenericType::DateTime, ParamValue::Text("2024-01-02 03:04:05".into())),
                param(
                    GenericType::DateTime2,
                    ParamValue::DateTime(
                        chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
                            .unwrap()
                            .and_hms_opt(3, 4, 5)
                            .unwrap(),
                    ),
                ),
                true,
            ),
            (
                param(GenericType::Int32, ParamValue::Int(1)),
                param(GenericType::String, ParamValue::Text("1".into())),
                false,
            ),
            (
                param(GenericType::Guid, ParamValue::DbNull),
                param(GenericType::Guid, ParamValue::DbNull),
                true,
            ),
            (
                param(GenericType::Int32, ParamValue::DbNull),
                param(GenericType::Int32, ParamValue::Int(0)),
                false,
            ),
        ];
        for (a, b, expected) in cases {
            assert_eq!(parameters_equal(&a, &b), expected, "{a:?} vs {b:?}");
            assert_eq!(parameters_equal(&b, &a), expected, "{b:?} vs {a:?}");
        }
    }

    #[test]
    fn output_parameters_never_equal() {
        let a = DbParameter::new("@o", GenericType::Int32, "int", ParameterDirection::Output)
            .with_value(1);
        let b = param(GenericType::Int32, ParamValue::Int(1));
        assert!(!parameters_equal(&a, &b));
        assert!(!parameters_equal(&b, &a));
        assert!(!parameters_equal(&a, &a.clone()));
    }
}
