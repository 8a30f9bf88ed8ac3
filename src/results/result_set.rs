use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use super::row::{DbRow, build_column_index};
use crate::types::ParamValue;

/// Materialized rows of one result set.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResultSet {
    /// Column names shared by all rows (to avoid duplicating in each row)
    pub columns: Arc<Vec<String>>,
    #[serde(skip)]
    column_index: Arc<HashMap<String, usize>>,
    /// The rows returned by the query
    pub rows: Vec<DbRow>,
}

impl ResultSet {
    #[must_use]
    pub fn new(column_names: Vec<String>) -> Self {
        let column_index = Arc::new(build_column_index(&column_names));
        Self {
            columns: Arc::new(column_names),
            column_index,
            rows: Vec::new(),
        }
    }

    /// Append a row of values in column order.
    pub fn add_row_values(&mut self, values: Vec<ParamValue>) {
        self.rows.push(DbRow {
            column_names: Arc::clone(&self.columns),
            column_index: Arc::clone(&self.column_index),
            values,
        });
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn first(&self) -> Option<&DbRow> {
        self.rows.first()
    }

    /// First column of the first row, or `DbNull` for an empty set.
    #[must_use]
    pub fn scalar(&self) -> ParamValue {
        self.first()
            .and_then(|row| row.get_by_index(0))
            .cloned()
            .unwrap_or_default()
    }
}

/// Every result set produced by one command, in order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DataSet {
    pub tables: Vec<ResultSet>,
}

impl DataSet {
    #[must_use]
    pub fn new(tables: Vec<ResultSet>) -> Self {
        Self { tables }
    }

    #[must_use]
    pub fn table(&self, index: usize) -> Option<&ResultSet> {
        self.tables.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    #[must_use]
    pub fn into_tables(self) -> Vec<ResultSet> {
        self.tables
    }
}
