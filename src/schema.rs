//! Index and column metadata records returned by the catalog helpers.

use serde::{Deserialize, Serialize};

use crate::types::GenericType;

/// An index on a table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DbIndex {
    pub name: String,
    pub schema: String,
    pub table: String,
    pub is_unique: bool,
    pub is_clustered: bool,
    pub is_primary_key: bool,
    /// Key columns in key order
    pub columns: Vec<String>,
    pub included_columns: Vec<String>,
}

impl DbIndex {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            schema: schema.into(),
            table: table.into(),
            ..Self::default()
        }
    }

    /// Whether `column` is a key column of this index.
    #[must_use]
    pub fn covers(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c.eq_ignore_ascii_case(column))
    }
}

/// A table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbColumn {
    pub name: String,
    pub ordinal: i32,
    /// Lower-case native type name
    pub native_type: String,
    pub generic_type: GenericType,
    /// `None` for `(max)` columns and fixed-size types
    pub max_length: Option<usize>,
    pub precision: u8,
    pub scale: u8,
    pub is_nullable: bool,
    pub is_identity: bool,
}
