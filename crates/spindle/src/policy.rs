//! Null-handling and duplicate-handling policies.
//!
//! The discovery loop never branches on the configured modes directly: the
//! duplicate mode answers "how much does a value group cost" and "what is the
//! violation budget computed against", and the null mode is applied once,
//! after all cursors are open.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::column::Column;
use crate::error::SpindleError;

/// How null values participate in inclusion checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NullHandling {
    /// Null is an ordinary value: it must appear on the referenced side too.
    Equality,
    /// Every null differs from every other null; an all-null column can form
    /// no pIND at all.
    Inequality,
    /// An all-null column is trivially included in everything but can never
    /// itself be referenced.
    Subset,
    /// Like `Subset`, and additionally a referenced side may never contain
    /// nulls (foreign-key semantics).
    Foreign,
}

/// Whether violations are counted per row occurrence or per distinct value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateHandling {
    Aware,
    Unaware,
}

impl DuplicateHandling {
    /// Violation cost charged to a candidate that is missing the current value.
    pub fn group_weight(self, occurrences: u64) -> i64 {
        match self {
            DuplicateHandling::Aware => occurrences as i64,
            DuplicateHandling::Unaware => 1,
        }
    }

    /// The population the violation budget is computed against.
    pub fn budget_basis(self, row_count: u64, distinct_count: u64) -> u64 {
        match self {
            DuplicateHandling::Aware => row_count,
            DuplicateHandling::Unaware => distinct_count,
        }
    }
}

impl fmt::Display for NullHandling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NullHandling::Equality => "equality",
            NullHandling::Inequality => "inequality",
            NullHandling::Subset => "subset",
            NullHandling::Foreign => "foreign",
        };
        f.write_str(name)
    }
}

impl FromStr for NullHandling {
    type Err = SpindleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "equality" => Ok(NullHandling::Equality),
            "inequality" => Ok(NullHandling::Inequality),
            "subset" => Ok(NullHandling::Subset),
            "foreign" => Ok(NullHandling::Foreign),
            other => Err(SpindleError::Config(format!(
                "unknown null handling mode: {other}"
            ))),
        }
    }
}

impl fmt::Display for DuplicateHandling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DuplicateHandling::Aware => "aware",
            DuplicateHandling::Unaware => "unaware",
        };
        f.write_str(name)
    }
}

impl FromStr for DuplicateHandling {
    type Err = SpindleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aware" => Ok(DuplicateHandling::Aware),
            "unaware" => Ok(DuplicateHandling::Unaware),
            other => Err(SpindleError::Config(format!(
                "unknown duplicate handling mode: {other}"
            ))),
        }
    }
}

/// Apply the null disposition to every column whose cursor produced no runs,
/// plus the global referenced-side pass under `Foreign`.
///
/// Edges are always removed in pairs so the `referenced`/`dependent`
/// cross-links stay consistent.
pub(crate) fn apply_null_disposition(columns: &mut [Column], mode: NullHandling) {
    for id in 0..columns.len() {
        if columns[id].has_runs() {
            continue;
        }
        match mode {
            // Null was ingested as an ordinary value, so a column without
            // runs held zero rows and behaves as an empty sequence.
            NullHandling::Equality => {}
            NullHandling::Inequality => {
                let refs: Vec<usize> = columns[id].referenced.keys().copied().collect();
                for referenced in refs {
                    columns[referenced].dependent.remove(&id);
                }
                columns[id].referenced.clear();
                retire_incoming(columns, id);
            }
            NullHandling::Subset | NullHandling::Foreign => {
                // Trivially included in everything, but never a valid
                // referenced side.
                retire_incoming(columns, id);
            }
        }
    }

    if mode == NullHandling::Foreign {
        // A foreign-key target may not contain nulls at all, not just be
        // all-null. Pure edge deletions, so processing order is irrelevant.
        for id in 0..columns.len() {
            if columns[id].null_count > 0 {
                retire_incoming(columns, id);
            }
        }
    }
}

/// Remove every edge that holds `id` as the referenced side.
fn retire_incoming(columns: &mut [Column], id: usize) {
    let dependents: Vec<usize> = columns[id].dependent.iter().copied().collect();
    for dependent in dependents {
        columns[dependent].referenced.shift_remove(&id);
    }
    columns[id].dependent.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn column(id: usize, total: usize, null_count: u64) -> Column {
        let mut col = Column::new(id, PathBuf::from("unused"), "t", "c");
        col.null_count = null_count;
        col.seed_candidates(total);
        col
    }

    #[test]
    fn test_group_weight() {
        assert_eq!(DuplicateHandling::Aware.group_weight(7), 7);
        assert_eq!(DuplicateHandling::Unaware.group_weight(7), 1);
    }

    #[test]
    fn test_budget_basis() {
        assert_eq!(DuplicateHandling::Aware.budget_basis(100, 10), 100);
        assert_eq!(DuplicateHandling::Unaware.budget_basis(100, 10), 10);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("FOREIGN".parse::<NullHandling>().unwrap(), NullHandling::Foreign);
        assert_eq!("aware".parse::<DuplicateHandling>().unwrap(), DuplicateHandling::Aware);
        assert!("bogus".parse::<NullHandling>().is_err());
    }

    #[test]
    fn test_subset_retires_all_null_referenced_side() {
        // Column 0 has no runs (all-null); 1 and 2 hold values.
        let mut columns = vec![column(0, 3, 5), column(1, 3, 0), column(2, 3, 0)];
        columns[1].force_runs_for_test();
        columns[2].force_runs_for_test();
        apply_null_disposition(&mut columns, NullHandling::Subset);

        // Still claims inclusion in everything, but nobody references it.
        assert_eq!(columns[0].referenced.len(), 2);
        assert!(columns[0].dependent.is_empty());
        assert!(!columns[1].referenced.contains_key(&0));
        assert!(!columns[2].referenced.contains_key(&0));
    }

    #[test]
    fn test_inequality_isolates_all_null_column() {
        let mut columns = vec![column(0, 2, 3), column(1, 2, 0)];
        columns[1].force_runs_for_test();
        apply_null_disposition(&mut columns, NullHandling::Inequality);

        assert!(columns[0].referenced.is_empty());
        assert!(columns[0].dependent.is_empty());
        assert!(!columns[1].referenced.contains_key(&0));
        assert!(!columns[1].dependent.contains(&0));
    }

    #[test]
    fn test_foreign_removes_nullable_referenced_candidates() {
        let mut columns = vec![column(0, 3, 0), column(1, 3, 2), column(2, 3, 0)];
        // Pretend every cursor produced runs so only the global pass fires.
        for col in &mut columns {
            col.force_runs_for_test();
        }
        apply_null_disposition(&mut columns, NullHandling::Foreign);

        assert!(!columns[0].referenced.contains_key(&1));
        assert!(!columns[2].referenced.contains_key(&1));
        assert!(columns[1].dependent.is_empty());
        // Column 1 may still depend on the others.
        assert!(columns[1].referenced.contains_key(&0));
        assert!(columns[1].referenced.contains_key(&2));
    }
}
