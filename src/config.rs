use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::types::ProviderFamily;

const ORIGIN: &str = "ProviderConfig";

/// Which provider to build and where it connects.
///
/// Loading this from a settings file is the caller's concern; [`ProviderConfig::from_json`]
/// accepts the JSON form:
/// ```rust
/// use sql_provider::prelude::*;
///
/// let cfg = ProviderConfig::from_json(
///     r#"{"family":"sqlserver","connection_string":"server=tcp:db,1433;database=app"}"#,
/// )
/// .unwrap();
/// assert_eq!(cfg.family, ProviderFamily::SqlServer);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub family: ProviderFamily,
    pub connection_string: String,
}

impl ProviderConfig {
    pub fn new(family: ProviderFamily, connection_string: impl Into<String>) -> Self {
        Self {
            family,
            connection_string: connection_string.into(),
        }
    }

    /// Parse and validate a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Config` if the document is malformed or the connection
    /// string is blank.
    pub fn from_json(json: &str) -> Result<Self, ProviderError> {
        let config: ProviderConfig = serde_json::from_str(json)
            .map_err(|e| ProviderError::config(ORIGIN, format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns `ProviderError::Config` if the connection string is blank.
    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.connection_string.trim().is_empty() {
            return Err(ProviderError::config(ORIGIN, "connection string is empty"));
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `ProviderError::Config` unless the configuration targets `family`.
    pub fn require_family(&self, family: ProviderFamily) -> Result<(), ProviderError> {
        if self.family == family {
            Ok(())
        } else {
            Err(ProviderError::config(
                ORIGIN,
                format!("expected a {family:?} configuration, got {:?}", self.family),
            ))
        }
    }
}
