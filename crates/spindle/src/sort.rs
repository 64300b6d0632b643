//! Two-phase multiway merge sort over a column's raw value file.
//!
//! Phase one streams the raw file into an in-memory value→count map,
//! spilling the map as a sorted chunk whenever it outgrows its key budget.
//! Phase two k-way-merges the chunks with a min-heap, summing occurrence
//! counts of equal values across chunks so the merged stream is globally
//! deduplicated. The sorted run-length stream replaces the raw file in
//! place.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::column::Column;
use crate::error::{Result, SpindleError};
use crate::policy::DuplicateHandling;
use crate::pool::map_queue;
use crate::value_file::{FieldValue, RunReader, RunWriter, ValueReader};

/// Sort every column on the worker pool and fix its violation budget.
/// Returns the columns re-ordered by id.
pub(crate) fn sort_columns(
    columns: Vec<Column>,
    workers: usize,
    key_budget: u64,
    check_interval: u64,
    threshold: f64,
    duplicates: DuplicateHandling,
) -> Result<Vec<Column>> {
    let mut sorted = map_queue(columns, workers, |mut column| {
        let budget = key_budget.min(column.row_count.max(1));
        ExternalSorter::new(budget, check_interval).sort(&mut column)?;
        column.assign_budget(threshold, duplicates);
        Ok(column)
    })?;
    sorted.sort_by_key(|column| column.id);
    Ok(sorted)
}

/// Sorts and deduplicates a single column with a bounded in-memory key
/// budget. Columns are independent; each failure aborts only its own column.
pub struct ExternalSorter {
    key_budget: u64,
    check_interval: u64,
}

impl ExternalSorter {
    /// `key_budget` is the maximum number of distinct values held in memory;
    /// the budget is consulted after every `check_interval` newly seen keys.
    pub fn new(key_budget: u64, check_interval: u64) -> Self {
        Self {
            key_budget: key_budget.max(1),
            check_interval: check_interval.max(1),
        }
    }

    pub fn sort(&self, column: &mut Column) -> Result<()> {
        self.run(column).map_err(|e| match e {
            corrupt @ SpindleError::Corrupt { .. } => corrupt,
            other => SpindleError::Sort {
                id: column.id,
                name: format!("{}.{}", column.table_name, column.column_name),
                message: other.to_string(),
            },
        })
    }

    fn run(&self, column: &mut Column) -> Result<()> {
        let origin = column.path.clone();
        let interval = self.check_interval.min(self.key_budget);

        let mut values: HashMap<FieldValue, u64> = HashMap::new();
        let mut spills: Vec<PathBuf> = Vec::new();
        let mut new_keys_since_check = 0u64;

        let mut reader = ValueReader::open(&origin)?;
        while let Some(value) = reader.next_value()? {
            let count = values.entry(value).or_insert(0);
            *count += 1;
            if *count == 1 {
                new_keys_since_check += 1;
                if new_keys_since_check >= interval {
                    new_keys_since_check = 0;
                    if values.len() as u64 >= self.key_budget {
                        spill(&mut values, &origin, &mut spills)?;
                    }
                }
            }
        }
        drop(reader);

        if spills.is_empty() {
            // The map already holds the complete deduplicated column.
            column.distinct_count = values.len() as u64;
            write_sorted(&values, &origin)?;
        } else {
            if !values.is_empty() {
                spill(&mut values, &origin, &mut spills)?;
            }
            debug!("merging {} spill files for column {}", spills.len(), column.id);
            column.distinct_count = merge(&spills, &origin)?;
        }

        column.spill_count = spills.len();
        for spill_path in spills {
            if let Err(e) = fs::remove_file(&spill_path) {
                warn!("unable to delete spill file '{}': {e}", spill_path.display());
            }
        }
        Ok(())
    }
}

/// Flush the map as the next numbered sorted chunk and clear it.
fn spill(
    values: &mut HashMap<FieldValue, u64>,
    origin: &Path,
    spills: &mut Vec<PathBuf>,
) -> Result<()> {
    let path = PathBuf::from(format!("{}#{}", origin.display(), spills.len()));
    write_sorted(values, &path)?;
    spills.push(path);
    values.clear();
    Ok(())
}

fn write_sorted(values: &HashMap<FieldValue, u64>, path: &Path) -> Result<()> {
    let mut entries: Vec<(&FieldValue, u64)> =
        values.iter().map(|(value, &count)| (value, count)).collect();
    entries.sort_unstable_by(|a, b| a.0.cmp(b.0));

    let mut writer = RunWriter::create(path)?;
    for (value, count) in entries {
        writer.write_run(value, count)?;
    }
    writer.finish()
}

/// Head run of one spill reader inside the merge heap.
struct MergeHead {
    value: FieldValue,
    count: u64,
    reader: usize,
}

impl PartialEq for MergeHead {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.reader == other.reader
    }
}

impl Eq for MergeHead {}

impl Ord for MergeHead {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value
            .cmp(&other.value)
            .then_with(|| self.reader.cmp(&other.reader))
    }
}

impl PartialOrd for MergeHead {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// K-way merge of sorted chunks into `target`. Equal values across chunks
/// are summed into a single run, which is what guarantees per-column
/// deduplication. Returns the number of emitted runs.
fn merge(spills: &[PathBuf], target: &Path) -> Result<u64> {
    let mut readers: Vec<RunReader> = spills
        .iter()
        .map(RunReader::open)
        .collect::<Result<_>>()?;

    let mut heap: BinaryHeap<Reverse<MergeHead>> = BinaryHeap::with_capacity(readers.len());
    for (index, reader) in readers.iter_mut().enumerate() {
        if let Some((value, count)) = reader.next_run()? {
            heap.push(Reverse(MergeHead {
                value,
                count,
                reader: index,
            }));
        }
    }

    let mut writer = RunWriter::create(target)?;
    let mut distinct = 0u64;
    let mut pending: Option<(FieldValue, u64)> = None;

    while let Some(Reverse(head)) = heap.pop() {
        pending = match pending {
            Some((value, total)) if value == head.value => Some((value, total + head.count)),
            Some((value, total)) => {
                writer.write_run(&value, total)?;
                distinct += 1;
                Some((head.value.clone(), head.count))
            }
            None => Some((head.value.clone(), head.count)),
        };

        if let Some((value, count)) = readers[head.reader].next_run()? {
            heap.push(Reverse(MergeHead {
                value,
                count,
                reader: head.reader,
            }));
        }
    }

    if let Some((value, total)) = pending {
        writer.write_run(&value, total)?;
        distinct += 1;
    }
    writer.finish()?;
    Ok(distinct)
}
