//! Property-based tests for the discovery pipeline.
//!
//! Random small column sets are checked against a brute-force in-memory
//! oracle, which exercises the sorted-merge loop (including the singleton
//! fast-forward path) and the spill machinery on arbitrary inputs.

use std::collections::HashSet;

use proptest::prelude::*;
use tempfile::TempDir;

use spindle::{
    DiscoveryResult, DuplicateHandling, MemoryTable, NullHandling, Pind, Spindle, SpindleConfig,
    TableReader,
};

/// Run discovery over single-column tables named `c0`, `c1`, ...
fn run_discovery(
    columns: &[Vec<String>],
    threshold: f64,
    duplicates: DuplicateHandling,
    max_memory_bytes: u64,
    memory_check_interval: u64,
) -> DiscoveryResult {
    let scratch = TempDir::new().unwrap();
    let config = SpindleConfig {
        threshold,
        null_handling: NullHandling::Subset,
        duplicate_handling: duplicates,
        workers: 2,
        max_memory_bytes,
        memory_check_interval,
        temp_dir: Some(scratch.path().to_path_buf()),
        ..SpindleConfig::default()
    };
    let tables: Vec<Box<dyn TableReader + Send>> = columns
        .iter()
        .enumerate()
        .map(|(index, values)| {
            let name = format!("c{index}");
            Box::new(MemoryTable::single_column(
                name.clone(),
                name,
                values.iter().cloned().map(Some).collect(),
            )) as Box<dyn TableReader + Send>
        })
        .collect();
    Spindle::with_config(config).discover(tables).unwrap()
}

fn to_pairs(pinds: &[Pind]) -> HashSet<(usize, usize)> {
    pinds
        .iter()
        .map(|p| {
            (
                p.dependent_table[1..].parse().unwrap(),
                p.referenced_table[1..].parse().unwrap(),
            )
        })
        .collect()
}

/// Brute-force reference model over in-memory value sets.
fn oracle(
    columns: &[Vec<String>],
    threshold: f64,
    duplicates: DuplicateHandling,
) -> HashSet<(usize, usize)> {
    let mut expected = HashSet::new();
    for (dep_index, dep) in columns.iter().enumerate() {
        let distinct: HashSet<&String> = dep.iter().collect();
        let basis = match duplicates {
            DuplicateHandling::Aware => dep.len(),
            DuplicateHandling::Unaware => distinct.len(),
        };
        let budget = ((1.0 - threshold) * basis as f64).floor() as i64;

        for (ref_index, referenced) in columns.iter().enumerate() {
            if dep_index == ref_index {
                continue;
            }
            let available: HashSet<&String> = referenced.iter().collect();
            let violations: i64 = match duplicates {
                DuplicateHandling::Aware => dep
                    .iter()
                    .filter(|value| !available.contains(value))
                    .count() as i64,
                DuplicateHandling::Unaware => distinct
                    .iter()
                    .filter(|value| !available.contains(**value))
                    .count() as i64,
            };
            if violations <= budget {
                expected.insert((dep_index, ref_index));
            }
        }
    }
    expected
}

fn column_sets() -> impl Strategy<Value = Vec<Vec<String>>> {
    // Small alphabet so overlaps, ties, and singleton fast-forwards all
    // occur; every column is non-empty.
    prop::collection::vec(prop::collection::vec("[a-f]{1,2}", 1..12), 2..5)
}

fn thresholds() -> impl Strategy<Value = f64> {
    prop_oneof![Just(1.0), Just(0.9), Just(0.7), Just(0.5)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Discovery agrees with the brute-force oracle for both duplicate
    /// modes.
    #[test]
    fn prop_matches_oracle(columns in column_sets(), threshold in thresholds(), aware in any::<bool>()) {
        let duplicates = if aware {
            DuplicateHandling::Aware
        } else {
            DuplicateHandling::Unaware
        };
        let result = run_discovery(&columns, threshold, duplicates, 1 << 30, 100_000);
        prop_assert_eq!(to_pairs(&result.pinds), oracle(&columns, threshold, duplicates));
    }

    /// A one-key memory budget (maximum spilling) yields exactly the same
    /// result as an unbounded budget.
    #[test]
    fn prop_spill_count_is_invisible(columns in column_sets(), threshold in thresholds()) {
        let spilling = run_discovery(&columns, threshold, DuplicateHandling::Aware, 1, 1);
        let unbounded =
            run_discovery(&columns, threshold, DuplicateHandling::Aware, 1 << 30, 100_000);
        prop_assert_eq!(spilling.pinds, unbounded.pinds);
    }

    /// Identical input produces identical output, including confidences and
    /// ordering.
    #[test]
    fn prop_deterministic(columns in column_sets(), threshold in thresholds()) {
        let first = run_discovery(&columns, threshold, DuplicateHandling::Aware, 1 << 30, 100_000);
        let second = run_discovery(&columns, threshold, DuplicateHandling::Aware, 1 << 30, 100_000);
        prop_assert_eq!(first.pinds, second.pinds);
    }
}
