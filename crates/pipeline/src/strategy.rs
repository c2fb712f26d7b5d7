//! Dataset-level parallelism
//!
//! Datasets are independent, so a run maps them over a bounded rayon pool.
//! Stages inside a dataset keep their own data parallelism, which runs on
//! the same pool.

use crate::error::{Error, Result};
use rayon::prelude::*;

/// How many datasets may run at once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    /// One dataset at a time on the calling thread
    Sequential,
    /// The global rayon pool, one worker per CPU
    #[default]
    Parallel,
    /// A dedicated pool with this many workers
    ParallelWith(usize),
}

impl ProcessingMode {
    /// Mode for a configured worker count (`None` = all CPUs)
    pub fn from_workers(workers: Option<usize>) -> Self {
        match workers {
            None => ProcessingMode::Parallel,
            Some(0) | Some(1) => ProcessingMode::Sequential,
            Some(n) => ProcessingMode::ParallelWith(n),
        }
    }

    /// Map `f` over `items`, preserving order
    pub fn map<I, T, F>(&self, items: &[I], f: F) -> Result<Vec<T>>
    where
        I: Sync,
        T: Send,
        F: Fn(&I) -> T + Sync + Send,
    {
        match self {
            ProcessingMode::Sequential => Ok(items.iter().map(f).collect()),
            ProcessingMode::Parallel => Ok(items.par_iter().map(f).collect()),
            ProcessingMode::ParallelWith(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(*threads)
                    .build()
                    .map_err(|e| Error::WorkerPool(e.to_string()))?;
                Ok(pool.install(|| items.par_iter().map(f).collect()))
            }
        }
    }

    /// Number of workers this mode uses
    pub fn workers(&self) -> usize {
        match self {
            ProcessingMode::Sequential => 1,
            ProcessingMode::Parallel => num_cpus(),
            ProcessingMode::ParallelWith(n) => *n,
        }
    }
}

/// Number of threads in the global rayon pool
pub fn num_cpus() -> usize {
    rayon::current_num_threads()
}
