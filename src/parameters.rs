use serde::Serialize;

use crate::error::ProviderError;
use crate::types::{GenericType, ParamValue, ParameterDirection, RowVersion};

const ORIGIN: &str = "ParameterCollection";

/// A named, typed command parameter.
///
/// Build parameters through [`SqlDialect::create_parameter`](crate::provider::SqlDialect::create_parameter)
/// so the name carries the dialect prefix and the size rule is applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DbParameter {
    name: String,
    generic_type: GenericType,
    native_type: String,
    direction: ParameterDirection,
    size: Option<usize>,
    precision: Option<u8>,
    scale: Option<u8>,
    value: ParamValue,
    source_column: Option<String>,
    source_version: RowVersion,
    source_column_nullable: bool,
}

impl DbParameter {
    /// Raw constructor; does not prefix the name or validate the native type.
    pub fn new(
        name: impl Into<String>,
        generic_type: GenericType,
        native_type: impl Into<String>,
        direction: ParameterDirection,
    ) -> Self {
        Self {
            name: name.into(),
            generic_type,
            native_type: native_type.into(),
            direction,
            size: None,
            precision: None,
            scale: None,
            value: ParamValue::DbNull,
            source_column: None,
            source_version: RowVersion::default(),
            source_column_nullable: false,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn generic_type(&self) -> GenericType {
        self.generic_type
    }

    /// Lower-case native type name, e.g. `nvarchar`.
    #[must_use]
    pub fn native_type(&self) -> &str {
        &self.native_type
    }

    #[must_use]
    pub fn direction(&self) -> ParameterDirection {
        self.direction
    }

    #[must_use]
    pub fn size(&self) -> Option<usize> {
        self.size
    }

    #[must_use]
    pub fn precision(&self) -> Option<u8> {
        self.precision
    }

    #[must_use]
    pub fn scale(&self) -> Option<u8> {
        self.scale
    }

    #[must_use]
    pub fn value(&self) -> &ParamValue {
        &self.value
    }

    #[must_use]
    pub fn source_column(&self) -> Option<&str> {
        self.source_column.as_deref()
    }

    #[must_use]
    pub fn source_version(&self) -> RowVersion {
        self.source_version
    }

    #[must_use]
    pub fn source_column_nullable(&self) -> bool {
        self.source_column_nullable
    }

    pub fn set_value(&mut self, value: impl Into<ParamValue>) {
        self.value = value.into();
    }

    pub fn set_size(&mut self, size: Option<usize>) {
        self.size = size;
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<ParamValue>) -> Self {
        self.value = value.into();
        self
    }

    #[must_use]
    pub fn with_size(mut self, size: Option<usize>) -> Self {
        self.size = size;
        self
    }

    #[must_use]
    pub fn with_precision(mut self, precision: u8, scale: u8) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    #[must_use]
    pub fn with_source_column(
        mut self,
        column: impl Into<String>,
        version: RowVersion,
        nullable: bool,
    ) -> Self {
        self.source_column = Some(column.into());
        self.source_version = version;
        self.source_column_nullable = nullable;
        self
    }
}

/// Ordered parameter list with case-insensitive unique names.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParameterCollection {
    items: Vec<DbParameter>,
}

impl ParameterCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DbParameter> {
        self.position(name).map(|idx| &self.items[idx])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut DbParameter> {
        self.position(name).map(move |idx| &mut self.items[idx])
    }

    /// Append a parameter, returning the stored instance.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::DuplicateParameter` if the name is already present; the
    /// collection is left unchanged.
    pub fn push(&mut self, parameter: DbParameter) -> Result<&DbParameter, ProviderError> {
        if self.contains(parameter.name()) {
            return Err(ProviderError::DuplicateParameter {
                origin: ORIGIN,
                name: parameter.name().to_string(),
            });
        }
        self.items.push(parameter);
        let idx = self.items.len() - 1;
        Ok(&self.items[idx])
    }

    /// Update the value of an existing parameter.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::InvalidArgument` if no parameter has that name.
    pub fn set_value(
        &mut self,
        name: &str,
        value: impl Into<ParamValue>,
    ) -> Result<(), ProviderError> {
        match self.get_mut(name) {
            Some(parameter) => {
                parameter.set_value(value);
                Ok(())
            }
            None => Err(ProviderError::invalid_argument(
                ORIGIN,
                format!("no parameter named {name}"),
            )),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<DbParameter> {
        self.position(name).map(|idx| self.items.remove(idx))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DbParameter> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, DbParameter> {
        self.items.iter_mut()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.items
            .iter()
            .position(|p| p.name().eq_ignore_ascii_case(name))
    }
}

impl<'a> IntoIterator for &'a ParameterCollection {
    type Item = &'a DbParameter;
    type IntoIter = std::slice::Iter<'a, DbParameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl IntoIterator for ParameterCollection {
    type Item = DbParameter;
    type IntoIter = std::vec::IntoIter<DbParameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
