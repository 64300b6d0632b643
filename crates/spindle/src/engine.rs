//! The discovery core loop: a priority queue of columns ordered by current
//! value, advanced group-by-group while candidate budgets are drained.

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap};

use log::info;

use crate::column::Column;
use crate::error::{Result, SpindleError};
use crate::policy::DuplicateHandling;
use crate::value_file::FieldValue;

/// Queue entry: a snapshot of a column's current value. Ties are broken by
/// id so the pop order is deterministic.
struct QueueEntry {
    value: FieldValue,
    id: usize,
}

impl QueueEntry {
    fn for_column(column: &Column) -> Option<Self> {
        column.current().map(|(value, _)| Self {
            value: value.clone(),
            id: column.id,
        })
    }
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.id == other.id
    }
}

impl Eq for QueueEntry {}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value
            .cmp(&other.value)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

type Queue = BinaryHeap<Reverse<QueueEntry>>;

/// Drain the queue, intersecting candidate sets at every shared value.
///
/// Single-threaded by design: the queue and the relationship maps are
/// mutated strictly sequentially, one value group at a time.
pub(crate) fn calculate(columns: &mut [Column], duplicates: DuplicateHandling) -> Result<()> {
    let mut queue: Queue = columns
        .iter()
        .filter(|column| column.has_runs())
        .filter_map(QueueEntry::for_column)
        .map(Reverse)
        .collect();
    info!("starting pIND calculation over {} active columns", queue.len());

    // id -> occurrence count of the shared value.
    let mut group: BTreeMap<usize, u64> = BTreeMap::new();

    while let Some(Reverse(first)) = queue.pop() {
        group.insert(first.id, occurrences_of(columns, &first)?);

        // Collect every column sharing the minimum value.
        while queue
            .peek()
            .is_some_and(|Reverse(entry)| entry.value == first.value)
        {
            if let Some(Reverse(entry)) = queue.pop() {
                group.insert(entry.id, occurrences_of(columns, &entry)?);
            }
        }

        for (&id, &occurrences) in &group {
            intersect(columns, id, duplicates.group_weight(occurrences), &group);
        }

        if group.len() == 1 {
            fast_forward(columns, first.id, &mut queue, duplicates)?;
        } else {
            for &id in group.keys() {
                let column = &mut columns[id];
                if column.advance()? && !column.is_finished() {
                    if let Some(entry) = QueueEntry::for_column(column) {
                        queue.push(Reverse(entry));
                    }
                }
            }
        }
        group.clear();
    }

    info!("finished pIND calculation");
    Ok(())
}

fn occurrences_of(columns: &[Column], entry: &QueueEntry) -> Result<u64> {
    match columns[entry.id].current() {
        Some((value, occurrences)) if *value == entry.value => Ok(*occurrences),
        _ => Err(SpindleError::Discovery(format!(
            "column {} no longer holds its queued value",
            entry.id
        ))),
    }
}

/// Charge `weight` against every candidate of `id` that does not share the
/// current value. A budget below zero retires the edge on both sides.
fn intersect(columns: &mut [Column], id: usize, weight: i64, group: &BTreeMap<usize, u64>) {
    let mut dropped = Vec::new();
    columns[id].referenced.retain(|candidate, budget| {
        if group.contains_key(candidate) {
            return true;
        }
        *budget -= weight;
        if *budget < 0 {
            dropped.push(*candidate);
            false
        } else {
            true
        }
    });
    for candidate in dropped {
        columns[candidate].dependent.remove(&id);
    }
}

/// A singleton group owns every value below the new queue minimum, so its
/// cursor can advance without the heap churn of re-insertion. Each skipped
/// run is still charged against all remaining candidates (none of which can
/// contain it), so the results are identical to advancing one run at a time.
fn fast_forward(
    columns: &mut [Column],
    id: usize,
    queue: &mut Queue,
    duplicates: DuplicateHandling,
) -> Result<()> {
    let frontier: Option<FieldValue> = queue.peek().map(|Reverse(entry)| entry.value.clone());
    let exempt = BTreeMap::new();

    loop {
        let column = &mut columns[id];
        if !column.advance()? || column.is_finished() {
            return Ok(());
        }
        let (value, occurrences) = match column.current() {
            Some((value, occurrences)) => (value.clone(), *occurrences),
            None => return Ok(()),
        };

        if let Some(frontier_value) = &frontier {
            if value >= *frontier_value {
                queue.push(Reverse(QueueEntry { value, id }));
                return Ok(());
            }
        }
        // Below the frontier (or the queue is empty): no other active column
        // can hold this value.
        intersect(columns, id, duplicates.group_weight(occurrences), &exempt);
    }
}
