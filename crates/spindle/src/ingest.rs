//! Ingestion: fan each table's rows out into one value file per column.

use std::path::{Path, PathBuf};

use log::debug;

use crate::column::Column;
use crate::error::Result;
use crate::input::TableReader;
use crate::policy::NullHandling;
use crate::pool::map_queue;
use crate::value_file::{FieldValue, ValueWriter};

/// One unit of ingestion work: a table plus the dense id of its first column.
pub(crate) struct TableTask {
    pub offset: usize,
    pub reader: Box<dyn TableReader + Send>,
}

/// Ingest every table on the worker pool, one table per worker at a time,
/// and return the columns ordered by id.
pub(crate) fn ingest_tables(
    tasks: Vec<TableTask>,
    workers: usize,
    temp_dir: &Path,
    null_handling: NullHandling,
) -> Result<Vec<Column>> {
    let groups = map_queue(tasks, workers, |task| {
        ingest_table(task, temp_dir, null_handling)
    })?;
    let mut columns: Vec<Column> = groups.into_iter().flatten().collect();
    columns.sort_by_key(|column| column.id);
    Ok(columns)
}

pub(crate) fn value_file_path(temp_dir: &Path, id: usize) -> PathBuf {
    temp_dir.join(format!("attribute_{id}.txt"))
}

/// Read one table to completion: every field lands in its column's value
/// file, nulls bump the null counter. Under `Equality` a null is also
/// written out, since that mode treats null as an ordinary value.
fn ingest_table(
    task: TableTask,
    temp_dir: &Path,
    null_handling: NullHandling,
) -> Result<Vec<Column>> {
    let mut reader = task.reader;
    let table_name = reader.table_name().to_string();

    let mut columns: Vec<Column> = reader
        .column_names()
        .iter()
        .enumerate()
        .map(|(index, name)| {
            let id = task.offset + index;
            Column::new(id, value_file_path(temp_dir, id), table_name.clone(), name)
        })
        .collect();

    let mut writers: Vec<ValueWriter> = columns
        .iter()
        .map(|column| ValueWriter::create(&column.path))
        .collect::<Result<_>>()?;

    let mut row_count = 0u64;
    while let Some(row) = reader.next_row()? {
        row_count += 1;
        for (index, writer) in writers.iter_mut().enumerate() {
            match row.get(index).and_then(|field| field.as_deref()) {
                Some(value) => writer.append(&FieldValue::Text(value.to_string()))?,
                None => {
                    columns[index].null_count += 1;
                    if null_handling == NullHandling::Equality {
                        writer.append(&FieldValue::Null)?;
                    }
                }
            }
        }
    }

    for (column, writer) in columns.iter_mut().zip(writers) {
        column.row_count = row_count;
        writer.finish()?;
    }
    debug!(
        "ingested table '{}': {} rows over {} columns",
        table_name,
        row_count,
        columns.len()
    );
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::MemoryTable;
    use crate::value_file::ValueReader;
    use tempfile::tempdir;

    fn text(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    fn raw_values(column: &Column) -> Vec<FieldValue> {
        let mut reader = ValueReader::open(&column.path).unwrap();
        let mut out = Vec::new();
        while let Some(value) = reader.next_value().unwrap() {
            out.push(value);
        }
        out
    }

    #[test]
    fn test_fans_rows_out_per_column() {
        let dir = tempdir().unwrap();
        let table = MemoryTable::new(
            "people",
            vec!["id".to_string(), "city".to_string()],
            vec![
                vec![text("1"), text("berlin")],
                vec![text("2"), None],
                vec![text("3"), text("berlin")],
            ],
        );
        let columns = ingest_tables(
            vec![TableTask {
                offset: 0,
                reader: Box::new(table),
            }],
            2,
            dir.path(),
            NullHandling::Subset,
        )
        .unwrap();

        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].row_count, 3);
        assert_eq!(columns[0].null_count, 0);
        assert_eq!(columns[1].null_count, 1);
        // Nulls are not written under Subset.
        assert_eq!(raw_values(&columns[1]).len(), 2);
    }

    #[test]
    fn test_equality_writes_null_marker() {
        let dir = tempdir().unwrap();
        let table = MemoryTable::single_column("t", "c", vec![text("a"), None]);
        let columns = ingest_tables(
            vec![TableTask {
                offset: 0,
                reader: Box::new(table),
            }],
            1,
            dir.path(),
            NullHandling::Equality,
        )
        .unwrap();

        assert_eq!(columns[0].null_count, 1);
        assert_eq!(
            raw_values(&columns[0]),
            vec![FieldValue::Text("a".to_string()), FieldValue::Null]
        );
    }

    #[test]
    fn test_short_rows_become_trailing_nulls() {
        let dir = tempdir().unwrap();
        let table = MemoryTable::new(
            "t",
            vec!["a".to_string(), "b".to_string()],
            vec![vec![text("1")], vec![text("2"), text("3")]],
        );
        let columns = ingest_tables(
            vec![TableTask {
                offset: 0,
                reader: Box::new(table),
            }],
            1,
            dir.path(),
            NullHandling::Subset,
        )
        .unwrap();

        assert_eq!(columns[1].null_count, 1);
        assert_eq!(columns[1].row_count, 2);
    }

    #[test]
    fn test_ids_are_dense_across_tables() {
        let dir = tempdir().unwrap();
        let t1 = MemoryTable::single_column("t1", "a", vec![text("x")]);
        let t2 = MemoryTable::single_column("t2", "b", vec![text("y")]);
        let columns = ingest_tables(
            vec![
                TableTask {
                    offset: 0,
                    reader: Box::new(t1),
                },
                TableTask {
                    offset: 1,
                    reader: Box::new(t2),
                },
            ],
            2,
            dir.path(),
            NullHandling::Subset,
        )
        .unwrap();

        assert_eq!(columns[0].id, 0);
        assert_eq!(columns[0].table_name, "t1");
        assert_eq!(columns[1].id, 1);
        assert_eq!(columns[1].table_name, "t2");
    }
}
