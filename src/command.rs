use std::time::Duration;

use crate::parameters::ParameterCollection;
use crate::types::CommandType;

/// Timeout applied when a command does not set one.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// One unit of work: ad hoc SQL or a stored-procedure invocation.
///
/// `Clone` is a deep copy, so a cached template can be cloned per call and the clone's
/// parameters mutated freely:
/// ```rust
/// use sql_provider::prelude::*;
///
/// let template = DbCommand::stored_procedure("dbo.next_id");
/// let mut call = template.clone();
/// call.timeout = std::time::Duration::from_secs(5);
/// assert_eq!(template.timeout, DEFAULT_COMMAND_TIMEOUT);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DbCommand {
    /// SQL text, or the procedure name for stored procedures
    pub text: String,
    pub command_type: CommandType,
    /// Zero disables the timeout
    pub timeout: Duration,
    pub parameters: ParameterCollection,
}

impl DbCommand {
    pub fn new(text: impl Into<String>, command_type: CommandType) -> Self {
        Self {
            text: text.into(),
            command_type,
            timeout: DEFAULT_COMMAND_TIMEOUT,
            parameters: ParameterCollection::new(),
        }
    }

    pub fn text(sql: impl Into<String>) -> Self {
        Self::new(sql, CommandType::Text)
    }

    pub fn stored_procedure(name: impl Into<String>) -> Self {
        Self::new(name, CommandType::StoredProcedure)
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_parameters(mut self, parameters: ParameterCollection) -> Self {
        self.parameters = parameters;
        self
    }

    #[must_use]
    pub fn is_stored_procedure(&self) -> bool {
        self.command_type == CommandType::StoredProcedure
    }
}
