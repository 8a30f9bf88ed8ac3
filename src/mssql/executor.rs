use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use super::client::{MssqlClient, close_connection, open_connection};
use super::dialect::MssqlDialect;
use super::query::{BatchOutput, Mode, PRIMARY_KEY_VIOLATION, PreparedBatch, apply_outputs};
use super::transaction::MssqlTransaction;
use crate::command::DbCommand;
use crate::config::ProviderConfig;
use crate::error::{NativeError, ProviderError};
use crate::provider::{DbProvider, ServerIdentity, SqlDialect};
use crate::results::{DataSet, ResultSet};
use crate::schema::{DbColumn, DbIndex};
use crate::types::{BackendName, GenericType, ParamValue, ProviderFamily};

const ORIGIN: &str = "MssqlProvider";

const IDENTITY_QUERY: &str = "select cast(@@SERVERNAME as nvarchar(128)) as [host], \
     cast(SERVERPROPERTY('ProductVersion') as nvarchar(128)) as [version], \
     cast(DB_NAME() as nvarchar(128)) as [database]";

/// SQL Server provider.
///
/// Construction verifies the target by opening a connection and recording the server
/// identity. Every execution call then opens its own connection, or runs on the
/// connection of the transaction it is given.
pub struct MssqlProvider {
    connection_string: String,
    identity: ServerIdentity,
    dialect: MssqlDialect,
}

impl std::fmt::Debug for MssqlProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MssqlProvider")
            .field("connection_string", &"<redacted>")
            .field("identity", &self.identity)
            .finish()
    }
}

/// Where a call runs: a connection opened for it, or a transaction's.
enum Connection<'t> {
    Owned(MssqlClient),
    Borrowed(&'t mut MssqlClient),
}

impl Connection<'_> {
    fn client(&mut self) -> &mut MssqlClient {
        match self {
            Connection::Owned(client) => client,
            Connection::Borrowed(client) => client,
        }
    }

    async fn release(self) {
        if let Connection::Owned(client) = self {
            close_connection(client).await;
        }
    }
}

impl MssqlProvider {
    /// Connect to the server described by an ADO.NET-style connection string.
    ///
    /// # Arguments
    ///
    /// * `connection_string` - ADO.NET-style string, kept for every later call
    ///
    /// # Returns
    ///
    /// A provider whose [`ServerIdentity`] records the host name, product version and
    /// database reported by the server.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Connectivity` if the server cannot be reached, refuses the
    /// login, or does not answer the identity query.
    pub async fn connect(connection_string: &str) -> Result<Self, ProviderError> {
        let mut client = open_connection(connection_string).await?;
        let identity = read_identity(&mut client).await;
        close_connection(client).await;
        let identity = identity?;
        tracing::debug!(
            host = %identity.host,
            version = %identity.version,
            database = %identity.database,
            "connected to sql server"
        );
        Ok(Self {
            connection_string: connection_string.to_string(),
            identity,
            dialect: MssqlDialect,
        })
    }

    /// Build a provider from a [`ProviderConfig`].
    ///
    /// # Arguments
    ///
    /// * `config` - Must name the SQL Server family and a non-blank connection string
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Config` unless the configuration targets SQL Server, or
    /// `ProviderError::Connectivity` if connecting fails.
    pub async fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        config.validate()?;
        config.require_family(ProviderFamily::SqlServer)?;
        Self::connect(&config.connection_string).await
    }

    /// Provider family served, always `SqlServer`.
    #[must_use]
    pub fn family(&self) -> ProviderFamily {
        self.dialect.family()
    }

    /// Client library the provider stands in for.
    #[must_use]
    pub fn backend(&self) -> BackendName {
        self.dialect.backend()
    }

    /// Run `command` on a connection opened for the call, or on the transaction's.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Connectivity` if no connection can be opened,
    /// `ProviderError::Execution` on failure or timeout, or
    /// `ProviderError::ConstraintViolation` for primary-key violations.
    async fn execute(
        &self,
        command: &mut DbCommand,
        transaction: Option<&mut MssqlTransaction>,
        mode: Mode,
    ) -> Result<BatchOutput, ProviderError> {
        let batch = PreparedBatch::prepare(&self.dialect, command)?;
        let mut connection = match transaction {
            Some(tx) => Connection::Borrowed(tx.client()),
            None => Connection::Owned(open_connection(&self.connection_string).await?),
        };
        let result = with_timeout(command.timeout, batch.run(connection.client(), mode)).await;
        connection.release().await;

        let output = result?;
        if let Some(outputs) = &output.outputs {
            apply_outputs(command, outputs);
        }
        Ok(output)
    }

    /// Stored-procedure command with parameters read from `sys.parameters`.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::InvalidArgument` if the procedure does not exist, or
    /// `ProviderError::UnmappedType` for a parameter type without a mapping.
    async fn derive(
        &self,
        name: &str,
        transaction: Option<&mut MssqlTransaction>,
    ) -> Result<DbCommand, ProviderError> {
        let mut lookup = self.dialect.build_text_command(
            self.dialect.derive_parameters_query(),
            &[self
                .dialect
                .create_input_parameter("procedure", GenericType::String, name.into())],
        )?;
        let output = self.execute(&mut lookup, transaction, Mode::Rows).await?;

        let exists = output
            .tables
            .first()
            .is_some_and(|table| !table.scalar().is_null());
        if !exists {
            return Err(ProviderError::invalid_argument(
                ORIGIN,
                format!("stored procedure {name} does not exist"),
            ));
        }
        let signature = output.tables.get(1).ok_or_else(|| {
            ProviderError::execution(ORIGIN, "parameter catalog returned no result set")
        })?;
        let parameters = self.dialect.parameters_from_signature(signature)?;
        Ok(DbCommand::stored_procedure(name).with_parameters(parameters))
    }

    async fn catalog(
        &self,
        sql: &str,
        schema: &str,
        table: &str,
    ) -> Result<ResultSet, ProviderError> {
        let mut command = self.dialect.build_text_command(
            sql,
            &[
                self.dialect
                    .create_input_parameter("schema", GenericType::String, schema.into()),
                self.dialect
                    .create_input_parameter("table", GenericType::String, table.into()),
            ],
        )?;
        let output = self.execute(&mut command, None, Mode::Rows).await?;
        Ok(output.tables.into_iter().next().unwrap_or_default())
    }
}

async fn read_identity(client: &mut MssqlClient) -> Result<ServerIdentity, ProviderError> {
    let connectivity = |e: tiberius::error::Error| ProviderError::connectivity(ORIGIN, e);
    let row = client
        .simple_query(IDENTITY_QUERY)
        .await
        .map_err(connectivity)?
        .into_row()
        .await
        .map_err(connectivity)?
        .ok_or_else(|| ProviderError::connectivity(ORIGIN, "identity query returned no row"))?;

    let column = |idx: usize| -> Result<String, ProviderError> {
        Ok(row
            .try_get::<&str, _>(idx)
            .map_err(connectivity)?
            .unwrap_or_default()
            .to_string())
    };
    Ok(ServerIdentity {
        host: column(0)?,
        version: column(1)?,
        database: column(2)?,
    })
}

async fn with_timeout<T>(
    timeout: Duration,
    call: impl Future<Output = Result<T, ProviderError>>,
) -> Result<T, ProviderError> {
    if timeout.is_zero() {
        return call.await;
    }
    tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| ProviderError::execution(ORIGIN, NativeError::Timeout(timeout)))?
}

fn xml_document(tables: Vec<ResultSet>) -> String {
    tables
        .into_iter()
        .next()
        .map(|table| {
            table
                .rows
                .iter()
                .filter_map(|row| row.get_by_index(0).and_then(ParamValue::as_text))
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl DbProvider for MssqlProvider {
    type Dialect = MssqlDialect;
    type Transaction = MssqlTransaction;

    fn dialect(&self) -> &MssqlDialect {
        &self.dialect
    }

    fn connection_string(&self) -> &str {
        &self.connection_string
    }

    fn identity(&self) -> &ServerIdentity {
        &self.identity
    }

    async fn begin_transaction(&self) -> Result<MssqlTransaction, ProviderError> {
        let client = open_connection(&self.connection_string).await?;
        MssqlTransaction::begin(client, self.dialect).await
    }

    async fn build_stored_procedure_command(
        &self,
        name: &str,
    ) -> Result<DbCommand, ProviderError> {
        self.derive(name, None).await
    }

    async fn build_stored_procedure_command_tx(
        &self,
        name: &str,
        transaction: &mut MssqlTransaction,
    ) -> Result<DbCommand, ProviderError> {
        self.derive(name, Some(transaction)).await
    }

    async fn execute_scalar(&self, command: &mut DbCommand) -> Result<ParamValue, ProviderError> {
        let output = self.execute(command, None, Mode::Rows).await?;
        Ok(output.tables.first().map(ResultSet::scalar).unwrap_or_default())
    }

    async fn execute_scalar_tx(
        &self,
        command: &mut DbCommand,
        transaction: &mut MssqlTransaction,
    ) -> Result<ParamValue, ProviderError> {
        let output = self.execute(command, Some(transaction), Mode::Rows).await?;
        Ok(output.tables.first().map(ResultSet::scalar).unwrap_or_default())
    }

    async fn execute_non_query(&self, command: &mut DbCommand) -> Result<u64, ProviderError> {
        let output = self.execute(command, None, Mode::NonQuery).await?;
        Ok(output.rows_affected)
    }

    async fn execute_non_query_tx(
        &self,
        command: &mut DbCommand,
        transaction: &mut MssqlTransaction,
    ) -> Result<u64, ProviderError> {
        let output = self
            .execute(command, Some(transaction), Mode::NonQuery)
            .await?;
        Ok(output.rows_affected)
    }

    async fn execute_reader(&self, command: &mut DbCommand) -> Result<ResultSet, ProviderError> {
        let output = self.execute(command, None, Mode::Rows).await?;
        Ok(output.tables.into_iter().next().unwrap_or_default())
    }

    async fn execute_reader_tx(
        &self,
        command: &mut DbCommand,
        transaction: &mut MssqlTransaction,
    ) -> Result<ResultSet, ProviderError> {
        let output = self.execute(command, Some(transaction), Mode::Rows).await?;
        Ok(output.tables.into_iter().next().unwrap_or_default())
    }

    async fn execute_xml_reader(&self, command: &mut DbCommand) -> Result<String, ProviderError> {
        let output = self.execute(command, None, Mode::Rows).await?;
        Ok(xml_document(output.tables))
    }

    async fn execute_xml_reader_tx(
        &self,
        command: &mut DbCommand,
        transaction: &mut MssqlTransaction,
    ) -> Result<String, ProviderError> {
        let output = self.execute(command, Some(transaction), Mode::Rows).await?;
        Ok(xml_document(output.tables))
    }

    async fn execute_data_set(&self, command: &mut DbCommand) -> Result<DataSet, ProviderError> {
        let output = self.execute(command, None, Mode::Rows).await?;
        Ok(DataSet::new(output.tables))
    }

    async fn execute_data_set_tx(
        &self,
        command: &mut DbCommand,
        transaction: &mut MssqlTransaction,
    ) -> Result<DataSet, ProviderError> {
        let output = self.execute(command, Some(transaction), Mode::Rows).await?;
        Ok(DataSet::new(output.tables))
    }

    async fn table_indexes(
        &self,
        schema: &str,
        table: &str,
    ) -> Result<Vec<DbIndex>, ProviderError> {
        let rows = self
            .catalog(self.dialect.index_metadata_query(), schema, table)
            .await?;
        self.dialect.indexes_from_rows(&rows)
    }

    async fn table_columns(
        &self,
        schema: &str,
        table: &str,
    ) -> Result<Vec<DbColumn>, ProviderError> {
        let rows = self
            .catalog(self.dialect.column_metadata_query(), schema, table)
            .await?;
        self.dialect.columns_from_rows(&rows)
    }

    fn is_primary_key_violation(&self, error: &ProviderError) -> bool {
        is_primary_key_violation(error)
    }
}

pub(crate) fn is_primary_key_violation(error: &ProviderError) -> bool {
    match error {
        ProviderError::ConstraintViolation { .. } => true,
        other => other
            .native()
            .and_then(NativeError::server_code)
            .is_some_and(|code| code == PRIMARY_KEY_VIOLATION),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xml_chunks_are_concatenated() {
        let mut table = ResultSet::new(vec!["XML_F52E2B61-18A1-11d1-B105-00805F49916B".into()]);
        table.add_row_values(vec![ParamValue::Text("<row id=\"1\"/>".into())]);
        table.add_row_values(vec![ParamValue::Text("<row id=\"2\"/>".into())]);
        assert_eq!(
            xml_document(vec![table]),
            "<row id=\"1\"/><row id=\"2\"/>"
        );
        assert_eq!(xml_document(Vec::new()), "");
    }

    #[test]
    fn only_constraint_violations_are_primary_key_violations() {
        let violation = ProviderError::ConstraintViolation {
            origin: ORIGIN,
            source: NativeError::Message("dup".into()),
        };
        assert!(is_primary_key_violation(&violation));
        assert!(!is_primary_key_violation(&ProviderError::execution(
            ORIGIN, "deadlock"
        )));
        assert!(!is_primary_key_violation(&ProviderError::invalid_argument(
            ORIGIN, "x"
        )));
    }

    #[tokio::test]
    async fn zero_timeout_disables_the_limit() {
        let slow = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok::<_, ProviderError>(1)
        };
        assert_eq!(with_timeout(Duration::ZERO, slow).await.unwrap(), 1);

        let stuck = std::future::pending::<Result<(), ProviderError>>();
        let err = with_timeout(Duration::from_millis(10), stuck)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProviderError::Execution {
                source: NativeError::Timeout(_),
                ..
            }
        ));
    }
}
