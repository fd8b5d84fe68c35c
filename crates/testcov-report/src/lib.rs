//! testcov Report
//!
//! Turns coverage records into summaries: per-file and total percentages,
//! a terminal table, and a JSON document for CI.
//!
//! # Example
//!
//! ```rust,ignore
//! use testcov_report::{render_table, report, TableOptions};
//!
//! let summary = report(&[store.load()?]);
//! print!("{}", render_table(&summary, TableOptions::default().with_show_missing(true)));
//! if !summary.meets(80.0) {
//!     // gate the build
//! }
//! ```

#![warn(unreachable_pub)]

mod json;
mod summary;
mod table;

pub use json::{to_json, write_json};
pub use summary::{percent, report, CoverageSummary, CoverageTotals, FileCoverage};
pub use table::{display_percent, render_table, rounded_percent, TableOptions};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
