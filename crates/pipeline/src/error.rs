//! Error types for batch runs

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a run or a dataset
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] landshift_core::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Cannot parse configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Dataset name '{0}' is used more than once or collides with another dataset's output files")]
    DuplicateDataset(String),

    #[error("No datasets to process")]
    NoDatasets,

    #[error("Dataset '{0}' has no usable period")]
    NoUsablePeriods(String),

    #[error("Cannot create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot build worker pool: {0}")]
    WorkerPool(String),
}

impl Error {
    /// Whether the error is a cancellation request rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Core(landshift_core::Error::Cancelled))
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;
