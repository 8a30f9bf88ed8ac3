//! Batch preparation and result collection.
//!
//! Every parameter becomes a local variable of the batch, declared with its native type
//! and initialised from a positional `@Pn` argument when it carries an input value. Output
//! values are read back through a trailing single-row result set.

use futures_util::TryStreamExt;
use tiberius::{Query, QueryItem};

use super::client::MssqlClient;
use super::dialect::MssqlDialect;
use super::params::{bind_value, column_value};
use super::script::type_declaration;
use crate::command::DbCommand;
use crate::error::{NativeError, ProviderError};
use crate::parameters::DbParameter;
use crate::provider::SqlDialect;
use crate::results::ResultSet;
use crate::types::ParameterDirection;

const ORIGIN: &str = "MssqlProvider";
const ROWS_VARIABLE: &str = "@__rows";
const ROWS_COLUMN: &str = "__rows";

/// Server error number of a primary-key or unique-constraint violation.
pub const PRIMARY_KEY_VIOLATION: u32 = 2627;

/// How the batch results are consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    NonQuery,
    Rows,
}

/// A command rendered as one parameterised batch.
pub(crate) struct PreparedBatch {
    query: Query<'static>,
    has_outputs: bool,
}

#[derive(Debug, Default)]
pub(crate) struct BatchOutput {
    pub(crate) tables: Vec<ResultSet>,
    pub(crate) rows_affected: u64,
    pub(crate) outputs: Option<ResultSet>,
}

impl PreparedBatch {
    pub(crate) fn prepare(
        dialect: &MssqlDialect,
        command: &DbCommand,
    ) -> Result<Self, ProviderError> {
        let (sql, bound) = batch_text(dialect, command)?;
        let has_outputs = command.parameters.iter().any(|p| p.direction().is_output());
        let mut query = Query::new(sql);
        for parameter in bound {
            bind_value(&mut query, parameter);
        }
        Ok(Self { query, has_outputs })
    }

    pub(crate) async fn run(
        self,
        client: &mut MssqlClient,
        mode: Mode,
    ) -> Result<BatchOutput, ProviderError> {
        if mode == Mode::NonQuery && !self.has_outputs {
            let result = self.query.execute(client).await.map_err(classify)?;
            return Ok(BatchOutput {
                rows_affected: result.rows_affected().iter().sum(),
                ..BatchOutput::default()
            });
        }

        let mut tables = collect_results(self.query, client).await?;
        let outputs = if self.has_outputs { tables.pop() } else { None };
        let rows_affected = outputs
            .as_ref()
            .and_then(|set| set.first())
            .and_then(|row| row.get(ROWS_COLUMN))
            .and_then(|v| v.as_i64())
            .and_then(|n| u64::try_from(n).ok())
            .unwrap_or_default();
        Ok(BatchOutput {
            tables,
            rows_affected,
            outputs,
        })
    }
}

/// SQL text of the batch plus the parameters bound to `@P1..@Pn`, in order.
pub(crate) fn batch_text<'c>(
    dialect: &MssqlDialect,
    command: &'c DbCommand,
) -> Result<(String, Vec<&'c DbParameter>), ProviderError> {
    let mut sql = String::new();
    let mut bound = Vec::new();
    for parameter in &command.parameters {
        let declaration = type_declaration(parameter)?;
        if parameter.direction().is_input() {
            bound.push(parameter);
            sql.push_str(&format!(
                "declare {} {declaration} = @P{};\n",
                parameter.name(),
                bound.len()
            ));
        } else {
            sql.push_str(&format!("declare {} {declaration};\n", parameter.name()));
        }
    }

    let outputs: Vec<&DbParameter> = command
        .parameters
        .iter()
        .filter(|p| p.direction().is_output())
        .collect();
    if !outputs.is_empty() {
        sql.push_str(&format!("declare {ROWS_VARIABLE} int;\n"));
    }

    if command.is_stored_procedure() {
        sql.push_str(&execute_text(command));
    } else {
        sql.push_str(&command.text);
    }
    sql.push('\n');

    if !outputs.is_empty() {
        sql.push_str(&dialect.row_count_fragment(ROWS_VARIABLE));
        sql.push('\n');
        let columns: Vec<String> = outputs
            .iter()
            .map(|p| format!("{} as {}", p.name(), bracket(p.name())))
            .collect();
        sql.push_str(&format!(
            "select {ROWS_VARIABLE} as [{ROWS_COLUMN}], {};",
            columns.join(", ")
        ));
    }
    Ok((sql, bound))
}

/// Procedure call with named arguments so the server matches them regardless of order.
fn execute_text(command: &DbCommand) -> String {
    let mut text = String::from("execute ");
    if let Some(rv) = command
        .parameters
        .iter()
        .find(|p| p.direction() == ParameterDirection::ReturnValue)
    {
        text.push_str(&format!("{} = ", rv.name()));
    }
    text.push_str(&command.text);
    let args: Vec<String> = command
        .parameters
        .iter()
        .filter(|p| p.direction() != ParameterDirection::ReturnValue)
        .map(|p| {
            if p.direction().is_output() {
                format!("{0} = {0} output", p.name())
            } else {
                format!("{0} = {0}", p.name())
            }
        })
        .collect();
    if !args.is_empty() {
        text.push(' ');
        text.push_str(&args.join(", "));
    }
    text.push(';');
    text
}

fn bracket(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// Drain a query stream into one [`ResultSet`] per metadata token.
pub(crate) async fn collect_results(
    query: Query<'_>,
    client: &mut MssqlClient,
) -> Result<Vec<ResultSet>, ProviderError> {
    let mut stream = query.query(client).await.map_err(classify)?;
    let mut tables: Vec<ResultSet> = Vec::new();
    while let Some(item) = stream.try_next().await.map_err(classify)? {
        match item {
            QueryItem::Metadata(meta) => {
                let columns = meta
                    .columns()
                    .iter()
                    .map(|col| col.name().to_string())
                    .collect();
                tables.push(ResultSet::new(columns));
            }
            QueryItem::Row(row) => {
                let values = row
                    .into_iter()
                    .map(|data| column_value(&data))
                    .collect::<Result<Vec<_>, _>>()?;
                match tables.last_mut() {
                    Some(table) => table.add_row_values(values),
                    None => {
                        return Err(ProviderError::execution(
                            ORIGIN,
                            "row received before column metadata",
                        ));
                    }
                }
            }
        }
    }
    Ok(tables)
}

/// Copy output values from the trailing result set back into the command.
pub(crate) fn apply_outputs(command: &mut DbCommand, outputs: &ResultSet) {
    let Some(row) = outputs.first() else {
        return;
    };
    for parameter in command.parameters.iter_mut() {
        if !parameter.direction().is_output() {
            continue;
        }
        if let Some(value) = row.get(parameter.name()) {
            parameter.set_value(value.clone());
        }
    }
}

/// Wrap a driver error, singling out constraint violations.
pub(crate) fn classify(err: tiberius::error::Error) -> ProviderError {
    let source = NativeError::from(err);
    if source.server_code() == Some(PRIMARY_KEY_VIOLATION) {
        ProviderError::ConstraintViolation {
            origin: ORIGIN,
            source,
        }
    } else {
        ProviderError::Execution {
            origin: ORIGIN,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::types::{GenericType, ParamValue};

    fn proc_command() -> DbCommand {
        let dialect = MssqlDialect;
        let mut command = DbCommand::stored_procedure("dbo.add_order");
        command
            .parameters
            .push(DbParameter::new(
                "@RETURN_VALUE",
                GenericType::Int32,
                "int",
                ParameterDirection::ReturnValue,
            ))
            .unwrap();
        command
            .parameters
            .push(dialect.create_input_parameter("customer", GenericType::Int32, ParamValue::Int(7)))
            .unwrap();
        command
            .parameters
            .push(
                dialect
                    .create_parameter(
                        "order_id",
                        GenericType::Int64,
                        None,
                        None,
                        ParameterDirection::Output,
                        None,
                    )
                    .unwrap(),
            )
            .unwrap();
        command
    }

    #[test]
    fn procedure_batch_declares_binds_and_selects_outputs() {
        let command = proc_command();
        let (sql, bound) = batch_text(&MssqlDialect, &command).unwrap();
        assert_eq!(
            sql,
            "declare @RETURN_VALUE int;\n\
             declare @customer int = @P1;\n\
             declare @order_id bigint;\n\
             declare @__rows int;\n\
             execute @RETURN_VALUE = dbo.add_order @customer = @customer, @order_id = @order_id output;\n\
             set @__rows = @@ROWCOUNT;\n\
             select @__rows as [__rows], @RETURN_VALUE as [@RETURN_VALUE], @order_id as [@order_id];"
        );
        assert_eq!(bound.len(), 1);
        assert_eq!(bound[0].name(), "@customer");
    }

    #[test]
    fn text_batch_without_outputs_is_plain() {
        let mut command = DbCommand::text("update t set a = 1 where id = @id");
        command
            .parameters
            .push(MssqlDialect.create_input_parameter("id", GenericType::Int32, ParamValue::Int(3)))
            .unwrap();
        let (sql, _) = batch_text(&MssqlDialect, &command).unwrap();
        assert_eq!(
            sql,
            "declare @id int = @P1;\nupdate t set a = 1 where id = @id\n"
        );
    }

    #[test]
    fn inputs_are_declared_wide_enough_for_their_values() {
        let dialect = MssqlDialect;
        let mut command = DbCommand::text("insert into t (price, code, bin) values (@price, @code, @bin)");
        command
            .parameters
            .push(dialect.create_input_parameter(
                "price",
                GenericType::Decimal,
                ParamValue::Decimal(Decimal::new(1234, 2)),
            ))
            .unwrap();
        command
            .parameters
            .push(dialect.create_input_parameter(
                "code",
                GenericType::AnsiStringFixedLength,
                "ABC".into(),
            ))
            .unwrap();
        command
            .parameters
            .push(
                dialect
                    .create_parameter(
                        "bin",
                        GenericType::Binary,
                        Some("binary"),
                        Some(16),
                        ParameterDirection::Input,
                        Some(ParamValue::Binary(vec![1, 2, 3])),
                    )
                    .unwrap(),
            )
            .unwrap();

        let (sql, bound) = batch_text(&dialect, &command).unwrap();
        assert_eq!(
            sql,
            "declare @price decimal(38,2) = @P1;\n\
             declare @code char(3) = @P2;\n\
             declare @bin binary(3) = @P3;\n\
             insert into t (price, code, bin) values (@price, @code, @bin)\n"
        );
        assert_eq!(bound.len(), 3);

        let script = dialect.debug_script(&command);
        assert!(script.contains("declare @code char(3)\n"));
        assert!(script.contains("declare @price decimal(38,2)\n"));
        assert!(script.contains("set @price = 12.34\n"));
    }

    #[test]
    fn outputs_are_written_back() {
        let mut command = proc_command();
        let mut outputs = ResultSet::new(vec![
            ROWS_COLUMN.to_string(),
            "@RETURN_VALUE".to_string(),
            "@order_id".to_string(),
        ]);
        outputs.add_row_values(vec![
            ParamValue::Int(1),
            ParamValue::Int(0),
            ParamValue::BigInt(42),
        ]);
        apply_outputs(&mut command, &outputs);
        assert_eq!(
            command.parameters.get("@order_id").unwrap().value(),
            &ParamValue::BigInt(42)
        );
        assert_eq!(
            command.parameters.get("@RETURN_VALUE").unwrap().value(),
            &ParamValue::Int(0)
        );
        assert_eq!(
            command.parameters.get("@customer").unwrap().value(),
            &ParamValue::Int(7)
        );
    }
}
