use tiberius::{Client, Config, SqlBrowser};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use crate::error::ProviderError;

const ORIGIN: &str = "MssqlProvider";

/// Type alias for SQL Server client
pub type MssqlClient = Client<Compat<TcpStream>>;

/// Open a dedicated connection described by an ADO.NET-style connection string.
///
/// A login redirected by the server (Azure SQL gateways) is followed once.
///
/// # Arguments
///
/// * `connection_string` - ADO.NET-style string, e.g. `server=tcp:host,1433;database=app`
///
/// # Returns
///
/// A connected client; close it with [`close_connection`].
///
/// # Errors
///
/// Returns `ProviderError::Connectivity` if the string cannot be parsed or the server
/// cannot be reached or refuses the login.
pub async fn open_connection(connection_string: &str) -> Result<MssqlClient, ProviderError> {
    let config = Config::from_ado_string(connection_string)
        .map_err(|e| ProviderError::connectivity(ORIGIN, e))?;

    match connect_with(config.clone()).await {
        // Azure SQL may redirect the login to another node.
        Err(tiberius::error::Error::Routing { host, port }) => {
            tracing::debug!(%host, port, "sql server redirected connection");
            let mut config = config;
            config.host(&host);
            config.port(port);
            connect_with(config)
                .await
                .map_err(|e| ProviderError::connectivity(ORIGIN, e))
        }
        other => other.map_err(|e| ProviderError::connectivity(ORIGIN, e)),
    }
}

async fn connect_with(config: Config) -> Result<MssqlClient, tiberius::error::Error> {
    let tcp = TcpStream::connect_named(&config).await?;
    tcp.set_nodelay(true)?;
    Client::connect(config, tcp.compat_write()).await
}

/// Close a connection; the outcome of the call it served is already decided.
///
/// # Arguments
///
/// * `client` - The connection to close
///
/// Close failures are reported as `tracing` debug events, never returned.
pub async fn close_connection(client: MssqlClient) {
    if let Err(err) = client.close().await {
        tracing::debug!(error = %err, "closing sql server connection failed");
    } else {
        tracing::trace!("sql server connection closed");
    }
}
