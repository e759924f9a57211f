#![forbid(unsafe_code)]

//! Core ingestion and merge logic for healthmerge.
//!
//! This crate provides:
//! - Record coercion for loosely typed CSV fields
//! - Source parsers (food diary, weight, exercise/meditation, strength)
//! - The daily outer-join merger
//! - Report writing and run summaries

pub mod types;
pub mod error;
pub mod coerce;
pub mod config;
pub mod logging;
pub mod sources;
pub mod merge;
pub mod report;
pub mod food_intake;
pub mod pipeline;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use merge::{merge_daily, MergedTable};
pub use pipeline::{run, RunOutput};
pub use report::RunSummary;
