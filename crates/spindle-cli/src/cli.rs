//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use spindle::{DuplicateHandling, NullHandling};

/// Discover partial inclusion dependencies across CSV tables.
#[derive(Parser)]
#[command(name = "spindle", version, about)]
pub struct Cli {
    /// CSV files to profile, one table per file.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Fraction of rows/values that must be included, in (0, 1].
    #[arg(long, default_value_t = 1.0)]
    pub threshold: f64,

    /// How null values participate in inclusion checks.
    #[arg(long, value_enum, default_value_t = NullMode::Subset)]
    pub nulls: NullMode,

    /// Count violations per row occurrence or per distinct value.
    #[arg(long, value_enum, default_value_t = DuplicateMode::Aware)]
    pub duplicates: DuplicateMode,

    /// Worker threads for ingestion and sorting (default: all cores).
    #[arg(long)]
    pub threads: Option<usize>,

    /// Field delimiter (default: comma).
    #[arg(long)]
    pub delimiter: Option<char>,

    /// Treat the first row as data instead of a header.
    #[arg(long)]
    pub no_header: bool,

    /// Field value read as null (default: empty string).
    #[arg(long)]
    pub null_token: Option<String>,

    /// Scratch directory for intermediate value files.
    #[arg(long)]
    pub temp_dir: Option<PathBuf>,

    /// Emit the full result as JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum NullMode {
    Equality,
    Inequality,
    Subset,
    Foreign,
}

impl From<NullMode> for NullHandling {
    fn from(mode: NullMode) -> Self {
        match mode {
            NullMode::Equality => NullHandling::Equality,
            NullMode::Inequality => NullHandling::Inequality,
            NullMode::Subset => NullHandling::Subset,
            NullMode::Foreign => NullHandling::Foreign,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum DuplicateMode {
    Aware,
    Unaware,
}

impl From<DuplicateMode> for DuplicateHandling {
    fn from(mode: DuplicateMode) -> Self {
        match mode {
            DuplicateMode::Aware => DuplicateHandling::Aware,
            DuplicateMode::Unaware => DuplicateHandling::Unaware,
        }
    }
}
