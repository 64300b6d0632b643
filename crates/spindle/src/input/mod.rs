//! Table input: the row-reader contract and the bundled readers.

mod csv;
mod memory;

pub use csv::{CsvReaderConfig, CsvTableReader};
pub use memory::MemoryTable;

use crate::error::Result;

/// A source table: a name, an ordered list of column names, and rows of
/// nullable string fields produced until exhaustion.
///
/// Readers are opened by the caller, fully drained by the ingestion phase,
/// and release their resources on drop.
pub trait TableReader {
    fn table_name(&self) -> &str;

    fn column_names(&self) -> &[String];

    /// Produce the next row, or `None` once the table is exhausted. A row
    /// may carry fewer fields than there are columns; the missing trailing
    /// fields are treated as nulls.
    fn next_row(&mut self) -> Result<Option<Vec<Option<String>>>>;
}
