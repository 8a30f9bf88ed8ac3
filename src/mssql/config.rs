use super::executor::MssqlProvider;
use crate::error::ProviderError;

const DEFAULT_PORT: u16 = 1433;

/// Options describing a SQL Server connection target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MssqlOptions {
    pub server: String,
    pub database: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub port: Option<u16>,
    pub instance_name: Option<String>,
    pub trust_server_certificate: bool,
    pub application_name: Option<String>,
}

impl MssqlOptions {
    #[must_use]
    pub fn new(server: String, database: String) -> Self {
        Self {
            server,
            database,
            user: None,
            password: None,
            port: None,
            instance_name: None,
            trust_server_certificate: false,
            application_name: None,
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, user: String, password: String) -> Self {
        self.user = Some(user);
        self.password = Some(password);
        self
    }

    #[must_use]
    pub fn with_port(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_instance_name(mut self, instance_name: Option<String>) -> Self {
        self.instance_name = instance_name;
        self
    }

    /// Render the ADO.NET-style connection string understood by
    /// [`MssqlProvider::connect`].
    #[must_use]
    pub fn to_connection_string(&self) -> String {
        let mut server = format!("tcp:{}", self.server);
        if let Some(instance) = &self.instance_name {
            server.push('\\');
            server.push_str(instance);
        }
        match (self.port, &self.instance_name) {
            (Some(port), _) => server.push_str(&format!(",{port}")),
            (None, None) => server.push_str(&format!(",{DEFAULT_PORT}")),
            (None, Some(_)) => {}
        }

        let mut parts = vec![
            format!("server={}", ado_value(&server)),
            format!("database={}", ado_value(&self.database)),
        ];
        if let Some(user) = &self.user {
            parts.push(format!("user id={}", ado_value(user)));
        }
        if let Some(password) = &self.password {
            parts.push(format!("password={}", ado_value(password)));
        }
        if self.trust_server_certificate {
            parts.push("TrustServerCertificate=true".to_string());
        }
        if let Some(app) = &self.application_name {
            parts.push(format!("Application Name={}", ado_value(app)));
        }
        parts.join(";")
    }
}

/// Quote a connection-string value when it would otherwise be misparsed.
fn ado_value(value: &str) -> String {
    let needs_quotes = value.contains([';', '\'', '"', '='])
        || value.starts_with(char::is_whitespace)
        || value.ends_with(char::is_whitespace);
    if needs_quotes {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Fluent builder for MSSQL options.
#[derive(Debug, Clone)]
pub struct MssqlOptionsBuilder {
    opts: MssqlOptions,
}

impl MssqlOptionsBuilder {
    #[must_use]
    pub fn new(server: String, database: String) -> Self {
        Self {
            opts: MssqlOptions::new(server, database),
        }
    }

    #[must_use]
    pub fn credentials(mut self, user: String, password: String) -> Self {
        self.opts = self.opts.with_credentials(user, password);
        self
    }

    #[must_use]
    pub fn port(mut self, port: Option<u16>) -> Self {
        self.opts.port = port;
        self
    }

    #[must_use]
    pub fn instance_name(mut self, instance_name: Option<String>) -> Self {
        self.opts.instance_name = instance_name;
        self
    }

    #[must_use]
    pub fn trust_server_certificate(mut self, trust: bool) -> Self {
        self.opts.trust_server_certificate = trust;
        self
    }

    #[must_use]
    pub fn application_name(mut self, name: Option<String>) -> Self {
        self.opts.application_name = name;
        self
    }

    #[must_use]
    pub fn finish(self) -> MssqlOptions {
        self.opts
    }

    /// Build the options and connect a provider with them.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Connectivity` if the server cannot be reached.
    pub async fn connect(self) -> Result<MssqlProvider, ProviderError> {
        MssqlProvider::connect(&self.finish().to_connection_string()).await
    }
}
