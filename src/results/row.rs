use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::types::ParamValue;

/// A row from a database query result
///
/// Column names and the name lookup index are shared across all rows of a result set.
#[derive(Debug, Clone, Serialize)]
pub struct DbRow {
    #[serde(skip)]
    pub(crate) column_names: Arc<Vec<String>>,
    #[serde(skip)]
    pub(crate) column_index: Arc<HashMap<String, usize>>,
    /// The values for this row
    pub values: Vec<ParamValue>,
}

impl DbRow {
    /// Create a standalone row, building its own column index.
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, values: Vec<ParamValue>) -> Self {
        let column_index = Arc::new(build_column_index(&column_names));
        Self {
            column_names,
            column_index,
            values,
        }
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Get the index of a column by name
    ///
    /// Exact matches win; otherwise names are compared case-insensitively, the way
    /// SQL Server resolves identifiers.
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        if let Some(&idx) = self.column_index.get(column_name) {
            return Some(idx);
        }
        self.column_names
            .iter()
            .position(|col| col.eq_ignore_ascii_case(column_name))
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&ParamValue> {
        self.get_column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&ParamValue> {
        self.values.get(index)
    }
}

pub(crate) fn build_column_index(column_names: &[String]) -> HashMap<String, usize> {
    column_names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), i))
        .collect()
}
