use async_trait::async_trait;

use super::client::{MssqlClient, close_connection};
use super::dialect::MssqlDialect;
use super::query::classify;
use crate::error::ProviderError;
use crate::provider::{DbTransaction, SqlDialect};

/// A SQL Server transaction owning its connection.
///
/// Dropping an `MssqlTransaction` without calling [`commit`](DbTransaction::commit) or
/// [`rollback`](DbTransaction::rollback) drops the connection, and the server rolls the
/// work back. Always finish the transaction explicitly.
pub struct MssqlTransaction {
    client: MssqlClient,
    dialect: MssqlDialect,
    counter: u32,
}

impl std::fmt::Debug for MssqlTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MssqlTransaction")
            .field("client", &"<MssqlClient>")
            .field("counter", &self.counter)
            .finish()
    }
}

impl MssqlTransaction {
    /// Issue the begin statement on `client`; the connection is closed if that fails.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Execution` if the server rejects the begin statement.
    pub(crate) async fn begin(
        mut client: MssqlClient,
        dialect: MssqlDialect,
    ) -> Result<Self, ProviderError> {
        let counter = 1;
        let sql = dialect.transaction_begin(counter);
        if let Err(err) = run_batch(&mut client, &sql).await {
            close_connection(client).await;
            return Err(err);
        }
        tracing::debug!(counter, "sql server transaction started");
        Ok(Self {
            client,
            dialect,
            counter,
        })
    }

    pub(crate) fn client(&mut self) -> &mut MssqlClient {
        &mut self.client
    }

    async fn finish(self, sql: String) -> Result<(), ProviderError> {
        let mut client = self.client;
        let result = run_batch(&mut client, &sql).await;
        close_connection(client).await;
        result
    }
}

/// Send `sql` as a plain batch.
///
/// Parameterised queries run inside `sp_executesql`, whose scope must leave the transaction
/// count unchanged, so transaction statements go through `simple_query`.
async fn run_batch(client: &mut MssqlClient, sql: &str) -> Result<(), ProviderError> {
    client
        .simple_query(sql)
        .await
        .map_err(classify)?
        .into_results()
        .await
        .map_err(classify)?;
    Ok(())
}

#[async_trait]
impl DbTransaction for MssqlTransaction {
    async fn commit(self) -> Result<(), ProviderError> {
        let sql = self.dialect.transaction_commit(self.counter);
        self.finish(sql).await
    }

    async fn rollback(self) -> Result<(), ProviderError> {
        let sql = self.dialect.transaction_rollback(self.counter);
        self.finish(sql).await
    }
}
