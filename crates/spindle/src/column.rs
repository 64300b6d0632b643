//! The column entity: one unit of work for sorting and discovery.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use indexmap::IndexMap;

use crate::error::{Result, SpindleError};
use crate::policy::DuplicateHandling;
use crate::value_file::{FieldValue, RunReader};

/// A single source column together with its candidate-relationship state.
///
/// Identified by a dense integer id assigned table-by-table across the whole
/// run. Owns the value file on disk, a forward-only cursor over its sorted
/// run stream, and the two sides of the candidate graph:
///
/// - `referenced`: candidate referenced columns, mapped to the remaining
///   violation budget of the pair "self ⊆ candidate".
/// - `dependent`: columns that still hold *this* column as a referenced
///   candidate (the back-reference used to decide when this column has
///   become irrelevant).
///
/// An edge present in `referenced` of A pointing at B always has its mirror
/// in `dependent` of B, and the two are removed together.
pub struct Column {
    pub id: usize,
    pub table_name: String,
    pub column_name: String,
    pub(crate) path: PathBuf,

    pub row_count: u64,
    pub null_count: u64,
    pub distinct_count: u64,
    /// Number of spill files this column's sort produced.
    pub spill_count: usize,

    pub(crate) violation_budget: i64,
    pub(crate) referenced: IndexMap<usize, i64>,
    pub(crate) dependent: HashSet<usize>,

    cursor: Option<RunReader>,
    current: Option<(FieldValue, u64)>,
}

impl Column {
    pub fn new(
        id: usize,
        path: PathBuf,
        table_name: impl Into<String>,
        column_name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            table_name: table_name.into(),
            column_name: column_name.into(),
            path,
            row_count: 0,
            null_count: 0,
            distinct_count: 0,
            spill_count: 0,
            violation_budget: 0,
            referenced: IndexMap::new(),
            dependent: HashSet::new(),
            cursor: None,
            current: None,
        }
    }

    /// Fix the per-pair violation budget from the threshold. Must run after
    /// sorting, once `distinct_count` is known.
    pub fn assign_budget(&mut self, threshold: f64, duplicates: DuplicateHandling) {
        let basis = duplicates.budget_basis(self.row_count, self.distinct_count);
        self.violation_budget = ((1.0 - threshold) * basis as f64).floor() as i64;
    }

    /// Seed the candidate graph: every other column in the dense id range is
    /// both a referenced candidate (with this column's full budget) and a
    /// dependent back-reference.
    pub fn seed_candidates(&mut self, total_columns: usize) {
        self.referenced = (0..total_columns)
            .filter(|&other| other != self.id)
            .map(|other| (other, self.violation_budget))
            .collect();
        self.dependent = (0..total_columns)
            .filter(|&other| other != self.id)
            .collect();
    }

    /// Attach the cursor to the sorted value file and load the first run.
    pub fn open(&mut self) -> Result<()> {
        let mut reader = RunReader::open(&self.path)?;
        self.current = reader.next_run()?;
        self.cursor = Some(reader);
        Ok(())
    }

    /// Advance to the next run. Returns false once the stream is exhausted.
    pub fn advance(&mut self) -> Result<bool> {
        self.current = match &mut self.cursor {
            Some(reader) => reader.next_run()?,
            None => None,
        };
        Ok(self.current.is_some())
    }

    pub fn current(&self) -> Option<&(FieldValue, u64)> {
        self.current.as_ref()
    }

    pub fn has_runs(&self) -> bool {
        self.current.is_some()
    }

    /// A column is finished once nothing references it and it references
    /// nothing: it can leave the active queue permanently.
    pub fn is_finished(&self) -> bool {
        self.referenced.is_empty() && self.dependent.is_empty()
    }

    /// Release the cursor and delete the backing file.
    pub fn close(&mut self) -> Result<()> {
        self.cursor = None;
        self.current = None;
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| SpindleError::io(&self.path, e))?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn force_runs_for_test(&mut self) {
        self.current = Some((FieldValue::Text("x".to_string()), 1));
    }
}
