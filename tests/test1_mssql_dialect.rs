#![cfg(feature = "mssql")]

use sql_provider::mssql::RETURN_VALUE_NAME;
use sql_provider::prelude::*;

fn add_order_command(dialect: &MssqlDialect) -> Result<DbCommand, ProviderError> {
    let mut command = DbCommand::stored_procedure("dbo.add_order");
    command.parameters.push(DbParameter::new(
        RETURN_VALUE_NAME,
        GenericType::Int32,
        "int",
        ParameterDirection::ReturnValue,
    ))?;
    command.parameters.push(dialect.create_input_parameter(
        "customer",
        GenericType::Int32,
        ParamValue::Int(7),
    ))?;
    command.parameters.push(dialect.create_parameter(
        "order_id",
        GenericType::Int64,
        None,
        None,
        ParameterDirection::Output,
        None,
    )?)?;
    Ok(command)
}

#[test]
fn test1_descriptor_and_prefixing() {
    let dialect = MssqlDialect;
    assert_eq!(dialect.family(), ProviderFamily::SqlServer);
    assert_eq!(dialect.backend().as_str(), "SqlClient");
    assert_eq!(dialect.descriptor(), DialectDescriptor::default());
    assert_eq!(dialect.build_parameter_name("id"), "@id");
    assert_eq!(dialect.build_parameter_name("@id"), "@id");
    assert_eq!(dialect.build_bind_variable_name("maxrows"), "@maxrows");
    assert_eq!(dialect.build_no_op_command().text, "--");
}

#[test]
fn test1_parameter_lifecycle() -> Result<(), Box<dyn std::error::Error>> {
    let dialect = MssqlDialect;

    let name = dialect.create_parameter(
        "name",
        GenericType::String,
        Some("NVARCHAR"),
        Some(50),
        ParameterDirection::Input,
        None,
    )?;
    assert_eq!(name.name(), "@name");
    assert_eq!(name.native_type(), "nvarchar");
    assert!(name.value().is_null());
    assert_eq!(name.size(), None);

    let out = dialect.create_parameter(
        "total",
        GenericType::String,
        None,
        Some(50),
        ParameterDirection::InputOutput,
        Some(ParamValue::Text("x".into())),
    )?;
    assert_eq!(out.size(), Some(50));

    let err = dialect
        .create_parameter(
            "bad",
            GenericType::String,
            Some("hierarchyid"),
            None,
            ParameterDirection::Input,
            None,
        )
        .unwrap_err();
    assert!(matches!(err, ProviderError::UnmappedType { .. }));

    let mut target = ParameterCollection::new();
    let inserted = dialect.copy_to_collection(&mut target, &name)?;
    assert_eq!(inserted.name(), "@name");
    let dup = dialect.copy_to_collection(&mut target, &name).unwrap_err();
    assert!(matches!(dup, ProviderError::DuplicateParameter { .. }));
    assert_eq!(target.len(), 1);

    target.set_value("@NAME", ParamValue::Text("alice".into()))?;
    assert_eq!(name.value(), &ParamValue::DbNull);
    assert_eq!(
        target.get("@name").and_then(|p| p.value().as_text()),
        Some("alice")
    );
    Ok(())
}

#[test]
fn test1_type_aware_equality() {
    let dialect = MssqlDialect;
    let int = dialect.create_input_parameter("a", GenericType::Int32, ParamValue::Int(5));
    let big = dialect.create_input_parameter("b", GenericType::Int64, ParamValue::BigInt(5));
    assert!(dialect.compare_equality(&int, &big));
    assert!(dialect.compare_equality(&big, &int));

    let upper = dialect.create_input_parameter("c", GenericType::String, "ABC".into());
    let lower = dialect.create_input_parameter("d", GenericType::String, "abc".into());
    assert!(dialect.compare_equality(&upper, &lower));

    let other = dialect.create_input_parameter("e", GenericType::Int32, ParamValue::Int(6));
    assert!(!dialect.compare_equality(&int, &other));
}

#[test]
fn test1_fragments() -> Result<(), Box<dyn std::error::Error>> {
    let dialect = MssqlDialect;
    assert_eq!(dialect.row_count_fragment("n"), "set @n = @@ROWCOUNT;");
    assert_eq!(
        dialect.max_rows_rewrite_value("select a from t", &ParamValue::Int(10))?,
        "select top (10) a from t"
    );
    assert_eq!(
        dialect.max_rows_rewrite_value("select a from t", &ParamValue::Text("maxrows".into()))?,
        "select top (@maxrows) a from t"
    );
    assert_eq!(
        dialect.max_rows_rewrite_value("select a from t", &ParamValue::Int(0))?,
        "select a from t"
    );
    assert_eq!(
        dialect.max_rows_rewrite_value("select a from t", &ParamValue::Text("  ".into()))?,
        "select a from t"
    );
    assert!(
        dialect
            .max_rows_rewrite_value("select a from t", &ParamValue::Float(1.5))
            .is_err()
    );
    assert_eq!(
        dialect.date_math(
            DateInterval::Day,
            DateOffset::from("days"),
            DateStart::Now(DateTimeKind::Utc)
        ),
        "dateadd(day, @days, getutcdate())"
    );
    assert_eq!(dialect.transaction_begin(1), "begin transaction tran1;");
    assert_eq!(dialect.transaction_commit(1), "commit transaction tran1;");
    assert_eq!(dialect.transaction_rollback(1), "rollback transaction tran1;");

    let command = add_order_command(&dialect)?;
    assert_eq!(
        dialect.stored_procedure_call_text(&command.text, &command.parameters),
        "execute @RETURN_VALUE = dbo.add_order @customer, @order_id out"
    );
    Ok(())
}

#[test]
fn test1_debug_script_for_procedure() -> Result<(), Box<dyn std::error::Error>> {
    let dialect = MssqlDialect;
    let command = add_order_command(&dialect)?;
    assert_eq!(
        dialect.debug_script(&command),
        "declare @customer int\n\
         declare @order_id bigint\n\
         declare @RETURN_VALUE int\n\
         set @customer = 7\n\
         execute @RETURN_VALUE = dbo.add_order @customer, @order_id out"
    );

    let clone = dialect.clone_command(&command);
    assert_eq!(clone, command);
    Ok(())
}

#[test]
fn test1_debug_script_with_sized_output() -> Result<(), Box<dyn std::error::Error>> {
    let dialect = MssqlDialect;
    let mut command = DbCommand::stored_procedure("myproc");
    command.parameters.push(dialect.create_parameter(
        "id",
        GenericType::Int32,
        None,
        None,
        ParameterDirection::Input,
        Some(ParamValue::Int(5)),
    )?)?;
    command.parameters.push(dialect.create_parameter(
        "out",
        GenericType::String,
        None,
        Some(10),
        ParameterDirection::Output,
        None,
    )?)?;

    assert_eq!(
        dialect.stored_procedure_call_text(&command.text, &command.parameters),
        "execute myproc @id, @out out"
    );
    let script = dialect.debug_script(&command);
    assert_eq!(
        script,
        "declare @id int\n\
         declare @out nvarchar(10)\n\
         set @id = 5\n\
         execute myproc @id, @out out"
    );
    assert!(!script.contains("set @out"));
    Ok(())
}

#[test]
fn test1_debug_script_never_fails() {
    let dialect = MssqlDialect;
    let mut command = DbCommand::text("select @x");
    command
        .parameters
        .push(
            DbParameter::new("@x", GenericType::Int32, "int", ParameterDirection::Input)
                .with_value(ParamValue::Text("not a number".into())),
        )
        .unwrap();
    let script = dialect.debug_script(&command);
    assert!(script.starts_with("/*"));
    assert!(script.ends_with("*/\nselect @x"));
}
