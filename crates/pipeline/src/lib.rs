//! # LandShift Pipeline
//!
//! Runs the transition pipeline over whole datasets.
//!
//! This crate provides:
//! - `RunConfig`: TOML run configuration
//! - `discover_datasets`: dataset grouping from file names
//! - `Pipeline`: per-dataset stages with datasets in parallel on a bounded
//!   worker pool, cooperative cancellation and a JSON run summary

pub mod cancel;
pub mod config;
pub mod discover;
pub mod error;
pub mod run;
pub mod strategy;
pub mod summary;

pub use cancel::CancelFlag;
pub use config::{ConnectivitySetting, DatasetConfig, PeriodInput, RunConfig};
pub use discover::{discover_datasets, parse_stem};
pub use error::{Error, Result};
pub use run::{run_dataset, Pipeline};
pub use strategy::ProcessingMode;
pub use summary::{DatasetReport, DatasetStatus, PeriodReport, RunSummary, SkippedReport, SUMMARY_FILE};
