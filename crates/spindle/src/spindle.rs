//! Main Spindle struct and public API.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::column::Column;
use crate::engine;
use crate::error::{Result, SpindleError};
use crate::ingest::{self, TableTask};
use crate::input::TableReader;
use crate::policy::{self, DuplicateHandling, NullHandling};
use crate::sort;

/// Estimated in-memory cost of one accumulated value, including map
/// overhead, used to translate the byte budget into a key budget.
const ESTIMATED_ENTRY_BYTES: u64 = 400;

/// Configuration for a discovery run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpindleConfig {
    /// Fraction of rows/values that must be included, in (0, 1].
    pub threshold: f64,
    /// How nulls participate in inclusion checks.
    pub null_handling: NullHandling,
    /// Whether violations count row occurrences or distinct values.
    pub duplicate_handling: DuplicateHandling,
    /// Worker threads for the ingestion and sort phases.
    pub workers: usize,
    /// Distinct keys accumulated between in-memory budget checks.
    pub memory_check_interval: u64,
    /// Memory the sort phase may use across all workers, in bytes.
    pub max_memory_bytes: u64,
    /// Fraction of `max_memory_bytes` actually handed to the sorters.
    pub max_memory_fraction: f64,
    /// Scratch directory for value files. Defaults to a per-process
    /// directory under the system temp dir.
    pub temp_dir: Option<PathBuf>,
}

impl Default for SpindleConfig {
    fn default() -> Self {
        Self {
            threshold: 1.0,
            null_handling: NullHandling::Subset,
            duplicate_handling: DuplicateHandling::Aware,
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            memory_check_interval: 100_000,
            max_memory_bytes: 1 << 30,
            max_memory_fraction: 0.8,
            temp_dir: None,
        }
    }
}

impl SpindleConfig {
    fn validate(&self) -> Result<()> {
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(SpindleError::Config(format!(
                "threshold must be in (0, 1], got {}",
                self.threshold
            )));
        }
        if !(self.max_memory_fraction > 0.0 && self.max_memory_fraction <= 1.0) {
            return Err(SpindleError::Config(format!(
                "max_memory_fraction must be in (0, 1], got {}",
                self.max_memory_fraction
            )));
        }
        if self.workers == 0 {
            return Err(SpindleError::Config("workers must be at least 1".into()));
        }
        if self.memory_check_interval == 0 {
            return Err(SpindleError::Config(
                "memory_check_interval must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Per-column in-memory key budget for the sort phase, derived once
    /// before the phase starts so spill behavior is reproducible.
    fn key_budget(&self) -> u64 {
        let usable = self.max_memory_bytes as f64 * self.max_memory_fraction;
        let per_worker = usable / (self.workers as f64 * ESTIMATED_ENTRY_BYTES as f64);
        (per_worker.floor() as u64).max(1)
    }
}

/// A discovered partial inclusion dependency: the dependent column's values
/// are contained in the referenced column's values, up to the tolerated
/// violations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pind {
    pub dependent_table: String,
    pub dependent_column: String,
    pub referenced_table: String,
    pub referenced_column: String,
    /// Fraction of the dependent side (rows or distinct values, per the
    /// duplicate mode) found on the referenced side.
    pub confidence: f64,
}

/// Summary statistics for a discovery run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub table_count: usize,
    pub column_count: usize,
    pub pind_count: usize,
    /// Total spill files written during the sort phase.
    pub spill_files: usize,
    pub threshold: f64,
    pub null_handling: NullHandling,
    pub duplicate_handling: DuplicateHandling,
    pub workers: usize,
    pub ingest_ms: u64,
    pub sort_ms: u64,
    pub discovery_ms: u64,
    pub analyzed_at: DateTime<Utc>,
}

/// Result of a discovery run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryResult {
    pub pinds: Vec<Pind>,
    pub summary: RunSummary,
}

/// The discovery engine front end: ingest, sort, discover.
pub struct Spindle {
    config: SpindleConfig,
}

impl Spindle {
    /// Create a Spindle instance with default configuration.
    pub fn new() -> Self {
        Self::with_config(SpindleConfig::default())
    }

    /// Create a Spindle instance with custom configuration.
    pub fn with_config(config: SpindleConfig) -> Self {
        Self { config }
    }

    /// Run discovery over the given tables and return every surviving pIND.
    ///
    /// Either a complete result set is returned or the first fatal error;
    /// there is no partial delivery. Scratch files are removed before
    /// returning, on both paths.
    pub fn discover(
        &self,
        tables: Vec<Box<dyn TableReader + Send>>,
    ) -> Result<DiscoveryResult> {
        self.config.validate()?;

        let (temp_dir, owns_temp_dir) = match &self.config.temp_dir {
            Some(dir) => (dir.clone(), false),
            None => (
                std::env::temp_dir().join(format!("spindle-{}", std::process::id())),
                true,
            ),
        };
        fs::create_dir_all(&temp_dir).map_err(|e| SpindleError::io(&temp_dir, e))?;

        let result = self.run(tables, &temp_dir);
        if owns_temp_dir {
            if let Err(e) = fs::remove_dir_all(&temp_dir) {
                warn!("unable to clean temp dir '{}': {e}", temp_dir.display());
            }
        }
        result
    }

    fn run(
        &self,
        tables: Vec<Box<dyn TableReader + Send>>,
        temp_dir: &std::path::Path,
    ) -> Result<DiscoveryResult> {
        let analyzed_at = Utc::now();
        let table_count = tables.len();

        // Dense ids, assigned table-by-table.
        let mut tasks = Vec::with_capacity(tables.len());
        let mut offset = 0;
        for reader in tables {
            let width = reader.column_names().len();
            tasks.push(TableTask { offset, reader });
            offset += width;
        }
        info!("discovering pINDs over {offset} columns in {table_count} tables");

        let started = Instant::now();
        let columns = ingest::ingest_tables(
            tasks,
            self.config.workers,
            temp_dir,
            self.config.null_handling,
        )?;
        let ingest_ms = started.elapsed().as_millis() as u64;

        let started = Instant::now();
        let mut columns = sort::sort_columns(
            columns,
            self.config.workers,
            self.config.key_budget(),
            self.config.memory_check_interval,
            self.config.threshold,
            self.config.duplicate_handling,
        )?;
        let sort_ms = started.elapsed().as_millis() as u64;

        let started = Instant::now();
        let discovery = self.discover_columns(&mut columns);
        let discovery_ms = started.elapsed().as_millis() as u64;

        // Value files are released and deleted regardless of outcome.
        for column in &mut columns {
            if let Err(e) = column.close() {
                warn!("unable to close column {}: {e}", column.id);
            }
        }
        let pinds = discovery?;
        info!("discovered {} pINDs", pinds.len());

        let summary = RunSummary {
            table_count,
            column_count: columns.len(),
            pind_count: pinds.len(),
            spill_files: columns.iter().map(|c| c.spill_count).sum(),
            threshold: self.config.threshold,
            null_handling: self.config.null_handling,
            duplicate_handling: self.config.duplicate_handling,
            workers: self.config.workers,
            ingest_ms,
            sort_ms,
            discovery_ms,
            analyzed_at,
        };
        Ok(DiscoveryResult { pinds, summary })
    }

    fn discover_columns(&self, columns: &mut [Column]) -> Result<Vec<Pind>> {
        let total = columns.len();
        for column in columns.iter_mut() {
            column.seed_candidates(total);
        }
        for column in columns.iter_mut() {
            column.open()?;
        }
        policy::apply_null_disposition(columns, self.config.null_handling);

        engine::calculate(columns, self.config.duplicate_handling)?;
        Ok(self.collect_pinds(columns))
    }

    /// Every surviving referenced entry is a pIND. Output is ordered by
    /// dependent id, then referenced id.
    fn collect_pinds(&self, columns: &[Column]) -> Vec<Pind> {
        let mut pinds = Vec::new();
        for dependent in columns {
            if dependent.referenced.is_empty() {
                continue;
            }
            let basis = self
                .config
                .duplicate_handling
                .budget_basis(dependent.row_count, dependent.distinct_count);

            let mut edges: Vec<(usize, i64)> = dependent
                .referenced
                .iter()
                .map(|(&id, &remaining)| (id, remaining))
                .collect();
            edges.sort_unstable_by_key(|(id, _)| *id);

            for (referenced_id, remaining) in edges {
                let referenced = &columns[referenced_id];
                let spent = dependent.violation_budget - remaining;
                let confidence = if basis == 0 {
                    1.0
                } else {
                    1.0 - spent as f64 / basis as f64
                };
                pinds.push(Pind {
                    dependent_table: dependent.table_name.clone(),
                    dependent_column: dependent.column_name.clone(),
                    referenced_table: referenced.table_name.clone(),
                    referenced_column: referenced.column_name.clone(),
                    confidence,
                });
            }
        }
        pinds
    }
}

impl Default for Spindle {
    fn default() -> Self {
        Self::new()
    }
}
