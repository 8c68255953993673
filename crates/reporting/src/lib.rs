//! Funnel health reporting: per-stage conversion metrics, drop-off flags
//! and benchmark comparison, plus stage-count import from CSV.

pub mod csv_import;
pub mod funnel;

pub use csv_import::{csv_template, parse_funnel_csv, read_funnel_csv};
pub use funnel::{validate_threshold, FunnelAnalyzer, BENCHMARKS};
