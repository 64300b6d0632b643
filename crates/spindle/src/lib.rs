//! Spindle: partial inclusion dependency discovery for tabular datasets.
//!
//! For every ordered pair of columns (A, B) across a set of tables, Spindle
//! determines whether A's values are contained in B's values up to a
//! configurable violation threshold. Columns are ingested into per-column
//! value files, sorted and deduplicated out-of-core with a bounded memory
//! budget, then merged through a priority queue that intersects candidate
//! sets one shared value at a time — so datasets far larger than main
//! memory stay tractable.
//!
//! # Example
//!
//! ```no_run
//! use spindle::{CsvTableReader, Spindle, TableReader};
//!
//! let orders = CsvTableReader::open("orders.csv").unwrap();
//! let customers = CsvTableReader::open("customers.csv").unwrap();
//! let tables: Vec<Box<dyn TableReader + Send>> =
//!     vec![Box::new(orders), Box::new(customers)];
//!
//! let result = Spindle::new().discover(tables).unwrap();
//! for pind in &result.pinds {
//!     println!(
//!         "{}.{} < {}.{}",
//!         pind.dependent_table, pind.dependent_column,
//!         pind.referenced_table, pind.referenced_column,
//!     );
//! }
//! ```

pub mod column;
pub mod error;
pub mod input;
pub mod policy;
pub mod sort;
pub mod value_file;

mod engine;
mod ingest;
mod pool;
mod spindle;

pub use crate::spindle::{DiscoveryResult, Pind, RunSummary, Spindle, SpindleConfig};
pub use column::Column;
pub use error::{Result, SpindleError};
pub use input::{CsvReaderConfig, CsvTableReader, MemoryTable, TableReader};
pub use policy::{DuplicateHandling, NullHandling};
