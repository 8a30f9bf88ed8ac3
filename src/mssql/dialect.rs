use lazy_static::lazy_static;
use regex::Regex;

use super::script;
use super::typemap::{default_native, lookup_native};
use crate::command::DbCommand;
use crate::error::ProviderError;
use crate::fragments::{DateInterval, DateOffset, DateStart, RowLimit};
use crate::parameters::{DbParameter, ParameterCollection};
use crate::provider::{SqlDialect, apply_size_rule};
use crate::results::{DbRow, ResultSet};
use crate::schema::{DbColumn, DbIndex};
use crate::types::{
    BackendName, DateTimeKind, GenericType, ParamValue, ParameterDirection, ProviderFamily,
};

const ORIGIN: &str = "MssqlDialect";

/// Name SQL Server gives a procedure's return status.
pub const RETURN_VALUE_NAME: &str = "@RETURN_VALUE";

lazy_static! {
    static ref LEADING_SELECT: Regex =
        Regex::new(r"(?is)^\s*select\s+(distinct\s+)?").expect("valid select regex");
    static ref EXISTING_TOP: Regex =
        Regex::new(r"(?is)^\s*select\s+(distinct\s+)?top\b").expect("valid top regex");
}

/// Transact-SQL dialect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MssqlDialect;

impl SqlDialect for MssqlDialect {
    fn family(&self) -> ProviderFamily {
        ProviderFamily::SqlServer
    }

    fn backend(&self) -> BackendName {
        BackendName::SqlClient
    }

    fn generic_type_from_native(&self, native_type: &str) -> Result<GenericType, ProviderError> {
        lookup_native(native_type)
            .map(|(_, generic)| generic)
            .ok_or_else(|| ProviderError::UnmappedType {
                origin: ORIGIN,
                type_name: native_type.to_string(),
            })
    }

    fn native_type_from_generic(&self, generic_type: GenericType) -> &'static str {
        default_native(generic_type).type_name()
    }

    fn row_count_fragment(&self, parameter_name: &str) -> String {
        format!("set {} = @@ROWCOUNT;", self.build_parameter_name(parameter_name))
    }

    fn max_rows_rewrite(&self, sql: &str, limit: &RowLimit) -> String {
        let cap = match limit {
            RowLimit::Unlimited => return sql.to_string(),
            RowLimit::Fixed(n) => n.to_string(),
            RowLimit::BindVariable(name) => self.build_bind_variable_name(name),
        };
        match LEADING_SELECT.find(sql) {
            Some(m) if !EXISTING_TOP.is_match(sql) => {
                format!("{}top ({cap}) {}", &sql[..m.end()], &sql[m.end()..])
            }
            _ => format!("set rowcount {cap};\n{sql}\nset rowcount 0;"),
        }
    }

    fn date_math(&self, interval: DateInterval, offset: DateOffset, start: DateStart) -> String {
        let unit = match interval {
            DateInterval::Year => "year",
            DateInterval::Quarter => "quarter",
            DateInterval::Month => "month",
            DateInterval::Week => "week",
            DateInterval::Day => "day",
            DateInterval::Hour => "hour",
            DateInterval::Minute => "minute",
            DateInterval::Second => "second",
            DateInterval::Millisecond => "millisecond",
        };
        let amount = match offset {
            DateOffset::Literal(n) => n.to_string(),
            DateOffset::BindVariable(name) => self.build_bind_variable_name(&name),
        };
        let origin = match start {
            DateStart::Now(DateTimeKind::Local) => "getdate()".to_string(),
            DateStart::Now(DateTimeKind::Utc) => "getutcdate()".to_string(),
            DateStart::Now(DateTimeKind::Unspecified) => "sysdatetime()".to_string(),
            DateStart::Column(column) => column,
        };
        format!("dateadd({unit}, {amount}, {origin})")
    }

    fn transaction_begin(&self, counter: u32) -> String {
        format!("begin transaction tran{counter};")
    }

    fn transaction_commit(&self, counter: u32) -> String {
        format!("commit transaction tran{counter};")
    }

    fn transaction_rollback(&self, counter: u32) -> String {
        format!("rollback transaction tran{counter};")
    }

    fn stored_procedure_call_text(&self, name: &str, parameters: &ParameterCollection) -> String {
        let mut text = String::from("execute ");
        if let Some(rv) = parameters
            .iter()
            .find(|p| p.direction() == ParameterDirection::ReturnValue)
        {
            text.push_str(rv.name());
            text.push_str(" = ");
        }
        text.push_str(name);

        let args: Vec<String> = parameters
            .iter()
            .filter(|p| p.direction() != ParameterDirection::ReturnValue)
            .map(|p| {
                if p.direction().is_output() {
                    format!("{} out", p.name())
                } else {
                    p.name().to_string()
                }
            })
            .collect();
        if !args.is_empty() {
            text.push(' ');
            text.push_str(&args.join(", "));
        }
        text
    }

    fn debug_script(&self, command: &DbCommand) -> String {
        script::debug_script(self, command)
    }
}

impl MssqlDialect {
    /// Catalog batch describing the parameters of the procedure named by `@procedure`.
    ///
    /// The first result set holds the object id (null for an unknown procedure), the second
    /// one row per parameter in declaration order.
    #[must_use]
    pub fn derive_parameters_query(&self) -> &'static str {
        "select object_id(@procedure) as [object_id];
select p.name as [name], type_name(p.system_type_id) as [type_name], p.max_length as [max_length],
       p.precision as [precision], p.scale as [scale], p.is_output as [is_output]
from sys.parameters p
where p.object_id = object_id(@procedure) and p.parameter_id > 0
order by p.parameter_id;"
    }

    /// Decode the parameter rows of [`Self::derive_parameters_query`].
    ///
    /// A leading `@RETURN_VALUE` int parameter is always present; output parameters come
    /// back as `InputOutput` since the catalog does not distinguish the two.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::UnmappedType` for parameter types without a mapping, or
    /// `ProviderError::Execution` for rows missing catalog columns.
    pub fn parameters_from_signature(
        &self,
        rows: &ResultSet,
    ) -> Result<ParameterCollection, ProviderError> {
        let mut parameters = ParameterCollection::new();
        parameters.push(DbParameter::new(
            RETURN_VALUE_NAME,
            GenericType::Int32,
            "int",
            ParameterDirection::ReturnValue,
        ))?;

        for row in &rows.rows {
            let name = text(row, "name")?;
            let type_name = text(row, "type_name")?;
            let (native, generic) =
                lookup_native(&type_name).ok_or_else(|| ProviderError::UnmappedType {
                    origin: ORIGIN,
                    type_name: type_name.clone(),
                })?;
            let direction = if flag(row, "is_output") {
                ParameterDirection::InputOutput
            } else {
                ParameterDirection::Input
            };
            let size = match integer(row, "max_length") {
                _ if !native.is_sized() => None,
                Some(len) if len > 0 => {
                    let len = usize::try_from(len).unwrap_or_default();
                    Some(if native.is_wide() { len / 2 } else { len })
                }
                _ => None,
            };

            let mut parameter = DbParameter::new(
                self.build_parameter_name(&name),
                generic,
                type_name.to_ascii_lowercase(),
                direction,
            )
            .with_size(size);
            if generic == GenericType::Decimal {
                parameter = parameter.with_precision(small(row, "precision"), small(row, "scale"));
            }
            parameters.push(apply_size_rule(parameter))?;
        }
        Ok(parameters)
    }

    /// Index catalog query over the `@schema` and `@table` variables.
    #[must_use]
    pub fn index_metadata_query(&self) -> &'static str {
        "select i.name as [index_name], s.name as [schema_name], t.name as [table_name],
       i.is_unique as [is_unique], cast(case when i.type = 1 then 1 else 0 end as bit) as [is_clustered],
       i.is_primary_key as [is_primary_key], c.name as [column_name],
       ic.is_included_column as [is_included_column]
from sys.indexes i
join sys.tables t on t.object_id = i.object_id
join sys.schemas s on s.schema_id = t.schema_id
join sys.index_columns ic on ic.object_id = i.object_id and ic.index_id = i.index_id
join sys.columns c on c.object_id = ic.object_id and c.column_id = ic.column_id
where s.name = @schema and t.name = @table and i.type > 0
order by i.index_id, ic.is_included_column, ic.key_ordinal, ic.index_column_id;"
    }

    /// Group index catalog rows into one [`DbIndex`] per index.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Execution` for rows missing catalog columns.
    pub fn indexes_from_rows(&self, rows: &ResultSet) -> Result<Vec<DbIndex>, ProviderError> {
        let mut indexes: Vec<DbIndex> = Vec::new();
        for row in &rows.rows {
            let name = text(row, "index_name")?;
            let column = text(row, "column_name")?;
            if indexes.last().is_none_or(|index| index.name != name) {
                let mut index =
                    DbIndex::new(name, text(row, "schema_name")?, text(row, "table_name")?);
                index.is_unique = flag(row, "is_unique");
                index.is_clustered = flag(row, "is_clustered");
                index.is_primary_key = flag(row, "is_primary_key");
                indexes.push(index);
            }
            let Some(current) = indexes.last_mut() else {
                continue;
            };
            if flag(row, "is_included_column") {
                current.included_columns.push(column);
            } else {
                current.columns.push(column);
            }
        }
        Ok(indexes)
    }

    /// Column catalog query over the `@schema` and `@table` variables.
    #[must_use]
    pub fn column_metadata_query(&self) -> &'static str {
        "select c.name as [column_name], c.column_id as [ordinal], type_name(c.system_type_id) as [type_name],
       c.max_length as [max_length], c.precision as [precision], c.scale as [scale],
       c.is_nullable as [is_nullable], c.is_identity as [is_identity]
from sys.columns c
join sys.tables t on t.object_id = c.object_id
join sys.schemas s on s.schema_id = t.schema_id
where s.name = @schema and t.name = @table
order by c.column_id;"
    }

    /// Decode column catalog rows. Types without a mapping surface as `Object`.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Execution` for rows missing catalog columns.
    pub fn columns_from_rows(&self, rows: &ResultSet) -> Result<Vec<DbColumn>, ProviderError> {
        rows.rows
            .iter()
            .map(|row| {
                let type_name = text(row, "type_name")?.to_ascii_lowercase();
                let mapped = lookup_native(&type_name);
                let max_length = match (mapped, integer(row, "max_length")) {
                    (Some((native, _)), Some(len)) if native.is_sized() && len > 0 => {
                        let len = usize::try_from(len).unwrap_or_default();
                        Some(if native.is_wide() { len / 2 } else { len })
                    }
                    _ => None,
                };
                Ok(DbColumn {
                    name: text(row, "column_name")?,
                    ordinal: integer(row, "ordinal")
                        .and_then(|v| i32::try_from(v).ok())
                        .unwrap_or_default(),
                    generic_type: mapped.map_or(GenericType::Object, |(_, generic)| generic),
                    native_type: type_name,
                    max_length,
                    precision: small(row, "precision"),
                    scale: small(row, "scale"),
                    is_nullable: flag(row, "is_nullable"),
                    is_identity: flag(row, "is_identity"),
                })
            })
            .collect()
    }
}

fn text(row: &DbRow, column: &str) -> Result<String, ProviderError> {
    row.get(column)
        .and_then(ParamValue::as_text)
        .map(str::to_string)
        .ok_or_else(|| {
            ProviderError::execution(ORIGIN, format!("catalog row has no text column {column}"))
        })
}

fn integer(row: &DbRow, column: &str) -> Option<i64> {
    row.get(column).and_then(ParamValue::as_i64)
}

fn small(row: &DbRow, column: &str) -> u8 {
    integer(row, column)
        .and_then(|v| u8::try_from(v).ok())
        .unwrap_or_default()
}

fn flag(row: &DbRow, column: &str) -> bool {
    row.get(column)
        .and_then(ParamValue::as_bool)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signature_row(
        rs: &mut ResultSet,
        name: &str,
        type_name: &str,
        max_length: i16,
        is_output: bool,
    ) {
        rs.add_row_values(vec![
            ParamValue::Text(name.into()),
            ParamValue::Text(type_name.into()),
            ParamValue::SmallInt(max_length),
            ParamValue::TinyInt(if type_name == "decimal" { 10 } else { 0 }),
            ParamValue::TinyInt(if type_name == "decimal" { 2 } else { 0 }),
            ParamValue::Bool(is_output),
        ]);
    }

    fn signature() -> ResultSet {
        ResultSet::new(
            ["name", "type_name", "max_length", "precision", "scale", "is_output"]
                .map(String::from)
                .to_vec(),
        )
    }

    #[test]
    fn top_goes_after_select_and_distinct() {
        let d = MssqlDialect;
        assert_eq!(
            d.max_rows_rewrite("select a, b from t order by a", &RowLimit::Fixed(10)),
            "select top (10) a, b from t order by a"
        );
        assert_eq!(
            d.max_rows_rewrite("  SELECT DISTINCT a from t", &RowLimit::from("max")),
            "  SELECT DISTINCT top (@max) a from t"
        );
        assert_eq!(
            d.max_rows_rewrite("select a from t", &RowLimit::Unlimited),
            "select a from t"
        );
    }

    #[test]
    fn non_select_statements_use_rowcount() {
        let d = MssqlDialect;
        assert_eq!(
            d.max_rows_rewrite("exec dbo.report", &RowLimit::Fixed(5)),
            "set rowcount 5;\nexec dbo.report\nset rowcount 0;"
        );
        assert_eq!(
            d.max_rows_rewrite("select top 3 a from t", &RowLimit::Fixed(5)),
            "set rowcount 5;\nselect top 3 a from t\nset rowcount 0;"
        );
    }

    #[test]
    fn date_math_variants() {
        let d = MssqlDialect;
        assert_eq!(
            d.date_math(DateInterval::Day, 3.into(), DateTimeKind::Local.into()),
            "dateadd(day, 3, getdate())"
        );
        assert_eq!(
            d.date_math(DateInterval::Hour, "n".into(), DateTimeKind::Utc.into()),
            "dateadd(hour, @n, getutcdate())"
        );
        assert_eq!(
            d.date_math(DateInterval::Month, "".into(), "o.created_at".into()),
            "dateadd(month, 0, o.created_at)"
        );
    }

    #[test]
    fn signature_decoding() {
        let mut rs = signature();
        signature_row(&mut rs, "@name", "nvarchar", 100, false);
        signature_row(&mut rs, "@total", "decimal", 9, true);
        signature_row(&mut rs, "@blob", "varbinary", -1, true);

        let params = MssqlDialect.parameters_from_signature(&rs).unwrap();
        let names: Vec<&str> = params.iter().map(DbParameter::name).collect();
        assert_eq!(names, [RETURN_VALUE_NAME, "@name", "@total", "@blob"]);

        let rv = params.get(RETURN_VALUE_NAME).unwrap();
        assert_eq!(rv.direction(), ParameterDirection::ReturnValue);

        let name = params.get("@name").unwrap();
        assert_eq!(name.direction(), ParameterDirection::Input);
        assert_eq!(name.size(), None);

        let total = params.get("@total").unwrap();
        assert_eq!(total.direction(), ParameterDirection::InputOutput);
        assert_eq!((total.precision(), total.scale()), (Some(10), Some(2)));
        assert_eq!(params.get("@blob").unwrap().size(), None);
    }

    #[test]
    fn signature_with_unmapped_type_fails() {
        let mut rs = signature();
        signature_row(&mut rs, "@shape", "geography", -1, false);
        let err = MssqlDialect.parameters_from_signature(&rs).unwrap_err();
        assert!(matches!(err, ProviderError::UnmappedType { ref type_name, .. } if type_name == "geography"));
    }

    #[test]
    fn index_rows_group_by_index() {
        let mut rs = ResultSet::new(
            [
                "index_name",
                "schema_name",
                "table_name",
                "is_unique",
                "is_clustered",
                "is_primary_key",
                "column_name",
                "is_included_column",
            ]
            .map(String::from)
            .to_vec(),
        );
        let row = |index: &str, pk: bool, column: &str, included: bool| {
            vec![
                ParamValue::Text(index.into()),
                ParamValue::Text("dbo".into()),
                ParamValue::Text("orders".into()),
                ParamValue::Bool(pk),
                ParamValue::Bool(pk),
                ParamValue::Bool(pk),
                ParamValue::Text(column.into()),
                ParamValue::Bool(included),
            ]
        };
        rs.add_row_values(row("pk_orders", true, "id", false));
        rs.add_row_values(row("ix_customer", false, "customer_id", false));
        rs.add_row_values(row("ix_customer", false, "placed_at", false));
        rs.add_row_values(row("ix_customer", false, "total", true));

        let indexes = MssqlDialect.indexes_from_rows(&rs).unwrap();
        assert_eq!(indexes.len(), 2);
        assert!(indexes[0].is_primary_key && indexes[0].is_clustered);
        assert_eq!(indexes[1].columns, ["customer_id", "placed_at"]);
        assert_eq!(indexes[1].included_columns, ["total"]);
    }

    #[test]
    fn column_rows_halve_wide_lengths() {
        let mut rs = ResultSet::new(
            [
                "column_name",
                "ordinal",
                "type_name",
                "max_length",
                "precision",
                "scale",
                "is_nullable",
                "is_identity",
            ]
            .map(String::from)
            .to_vec(),
        );
        rs.add_row_values(vec![
            ParamValue::Text("title".into()),
            ParamValue::Int(2),
            ParamValue::Text("nvarchar".into()),
            ParamValue::SmallInt(200),
            ParamValue::TinyInt(0),
            ParamValue::TinyInt(0),
            ParamValue::Bool(true),
            ParamValue::Bool(false),
        ]);
        rs.add_row_values(vec![
            ParamValue::Text("shape".into()),
            ParamValue::Int(3),
            ParamValue::Text("geography".into()),
            ParamValue::SmallInt(-1),
            ParamValue::TinyInt(0),
            ParamValue::TinyInt(0),
            ParamValue::Bool(true),
            ParamValue::Bool(false),
        ]);
        let columns = MssqlDialect.columns_from_rows(&rs).unwrap();
        assert_eq!(columns[0].max_length, Some(100));
        assert_eq!(columns[0].generic_type, GenericType::String);
        assert_eq!(columns[1].generic_type, GenericType::Object);
        assert_eq!(columns[1].max_length, None);
    }
}
