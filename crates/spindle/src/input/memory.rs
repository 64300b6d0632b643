//! In-memory table, for programmatic input and tests.

use crate::error::Result;

use super::TableReader;

/// A table whose rows live in memory.
#[derive(Debug, Clone)]
pub struct MemoryTable {
    name: String,
    column_names: Vec<String>,
    rows: std::vec::IntoIter<Vec<Option<String>>>,
}

impl MemoryTable {
    pub fn new(
        name: impl Into<String>,
        column_names: Vec<String>,
        rows: Vec<Vec<Option<String>>>,
    ) -> Self {
        Self {
            name: name.into(),
            column_names,
            rows: rows.into_iter(),
        }
    }

    /// Convenience constructor for a single-column table.
    pub fn single_column(
        table: impl Into<String>,
        column: impl Into<String>,
        values: Vec<Option<String>>,
    ) -> Self {
        Self::new(
            table,
            vec![column.into()],
            values.into_iter().map(|v| vec![v]).collect(),
        )
    }
}

impl TableReader for MemoryTable {
    fn table_name(&self) -> &str {
        &self.name
    }

    fn column_names(&self) -> &[String] {
        &self.column_names
    }

    fn next_row(&mut self) -> Result<Option<Vec<Option<String>>>> {
        Ok(self.rows.next())
    }
}
