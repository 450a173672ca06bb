//! Report formats.
//!
//! - [`json`]: scan output and the persisted JSON reports
//! - [`csv`]: one row per duplicate group member
//! - [`dashboard`]: coloured human-readable summaries
//!
//! ```no_run
//! use templopt::duplicates::group_duplicates;
//! use templopt::error::ExitCode;
//! use templopt::output::JsonOutput;
//! use templopt::scanner::{scan, WalkerConfig};
//! use std::path::Path;
//!
//! let outcome = scan(Path::new("templates"), &WalkerConfig::default()).unwrap();
//! let (groups, stats) = group_duplicates(&outcome.records);
//! let output = JsonOutput::new(&groups, &stats, 0, outcome.warnings.len(), ExitCode::Success);
//! output.write_to(&mut std::io::stdout()).unwrap();
//! ```

pub mod csv;
pub mod dashboard;
pub mod json;

pub use csv::CsvOutput;
pub use json::{
    read_report, write_report, JsonOutput, OptimizationReport, OptimizationStats, OutputError,
    OPTIMIZATION_REPORT_FILE,
};
