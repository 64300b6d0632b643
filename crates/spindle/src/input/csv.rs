//! CSV/TSV table reader built on the `csv` crate.

use std::fs::File;
use std::path::Path;

use crate::error::{Result, SpindleError};

use super::TableReader;

/// Reader configuration.
#[derive(Debug, Clone)]
pub struct CsvReaderConfig {
    /// Field delimiter.
    pub delimiter: u8,
    /// Quote character.
    pub quote: u8,
    /// Whether the file has a header row. Without one, columns are named
    /// `column_1` .. `column_n`.
    pub has_header: bool,
    /// Fields equal to this token are read as null.
    pub null_token: String,
}

impl Default for CsvReaderConfig {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            has_header: true,
            null_token: String::new(),
        }
    }
}

/// Streams one CSV file as a table. The table name is the file stem.
pub struct CsvTableReader {
    table_name: String,
    column_names: Vec<String>,
    reader: csv::Reader<File>,
    record: csv::StringRecord,
    null_token: String,
}

impl CsvTableReader {
    /// Open a CSV file with the default configuration.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_config(path, CsvReaderConfig::default())
    }

    /// Open a CSV file with a custom configuration.
    pub fn with_config(path: impl AsRef<Path>, config: CsvReaderConfig) -> Result<Self> {
        let path = path.as_ref();
        let table_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "table".to_string());

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(config.delimiter)
            .quote(config.quote)
            .has_headers(config.has_header)
            .flexible(true)
            .from_path(path)
            .map_err(|e| SpindleError::Ingestion {
                table: table_name.clone(),
                message: e.to_string(),
            })?;

        // With headers disabled the csv crate still exposes the first record
        // here and will yield it again from read_record.
        let first = reader.headers()?;
        let column_names: Vec<String> = if config.has_header {
            first.iter().map(|s| s.to_string()).collect()
        } else {
            (1..=first.len()).map(|i| format!("column_{i}")).collect()
        };

        Ok(Self {
            table_name,
            column_names,
            reader,
            record: csv::StringRecord::new(),
            null_token: config.null_token,
        })
    }
}

impl TableReader for CsvTableReader {
    fn table_name(&self) -> &str {
        &self.table_name
    }

    fn column_names(&self) -> &[String] {
        &self.column_names
    }

    fn next_row(&mut self) -> Result<Option<Vec<Option<String>>>> {
        if !self.reader.read_record(&mut self.record)? {
            return Ok(None);
        }
        let row = self
            .record
            .iter()
            .map(|field| {
                if field == self.null_token {
                    None
                } else {
                    Some(field.to_string())
                }
            })
            .collect();
        Ok(Some(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn drain(reader: &mut CsvTableReader) -> Vec<Vec<Option<String>>> {
        let mut rows = Vec::new();
        while let Some(row) = reader.next_row().unwrap() {
            rows.push(row);
        }
        rows
    }

    #[test]
    fn test_read_with_header() {
        let file = csv_file("id,name\n1,alice\n2,\n");
        let mut reader = CsvTableReader::open(file.path()).unwrap();

        assert_eq!(reader.column_names(), &["id", "name"]);
        let rows = drain(&mut reader);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][1].as_deref(), Some("alice"));
        assert_eq!(rows[1][1], None); // empty field reads as null
    }

    #[test]
    fn test_read_without_header() {
        let file = csv_file("1,alice\n2,bob\n");
        let config = CsvReaderConfig {
            has_header: false,
            ..CsvReaderConfig::default()
        };
        let mut reader = CsvTableReader::with_config(file.path(), config).unwrap();

        assert_eq!(reader.column_names(), &["column_1", "column_2"]);
        assert_eq!(drain(&mut reader).len(), 2);
    }

    #[test]
    fn test_custom_null_token() {
        let file = csv_file("a,b\nNA,1\n");
        let config = CsvReaderConfig {
            null_token: "NA".to_string(),
            ..CsvReaderConfig::default()
        };
        let mut reader = CsvTableReader::with_config(file.path(), config).unwrap();
        let rows = drain(&mut reader);
        assert_eq!(rows[0][0], None);
        assert_eq!(rows[0][1].as_deref(), Some("1"));
    }

    #[test]
    fn test_short_rows_surface_as_missing_fields() {
        let file = csv_file("a,b,c\n1,2\n");
        let mut reader = CsvTableReader::open(file.path()).unwrap();
        let rows = drain(&mut reader);
        // The flexible reader passes the short row through; ingestion treats
        // the missing trailing field as null.
        assert_eq!(rows[0].len(), 2);
    }

    #[test]
    fn test_missing_file_is_ingestion_error() {
        let err = CsvTableReader::open("/nonexistent/table.csv").err().unwrap();
        assert!(matches!(err, SpindleError::Ingestion { .. }));
    }
}
