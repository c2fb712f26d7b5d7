//! Run summary
//!
//! Written as `run_summary.json` next to the transition tables. It records
//! every dataset outcome, the periods that failed and the regions left out of
//! the overlay, so a partially failed run can be audited.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// File name of the run summary inside the output directory
pub const SUMMARY_FILE: &str = "run_summary.json";

/// Final state of a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetStatus {
    Completed,
    Failed,
    Cancelled,
}

/// How a period layer was produced
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodReport {
    pub period: i32,
    pub path: PathBuf,
    /// Period field in the transition table
    pub field: String,
    /// 1-based band used, for raster inputs
    pub band: Option<usize>,
    /// Class upper bounds, for raster inputs
    pub breaks: Vec<f64>,
    /// Range was constant and had to be widened
    pub degenerate: bool,
    pub regions: usize,
    pub area_ha: f64,
    /// Set when the period could not be loaded; it is then left out
    pub error: Option<String>,
}

/// A region excluded from the overlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedReport {
    pub layer: String,
    pub field: String,
    pub index: usize,
    pub reason: String,
}

/// Outcome of one dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetReport {
    pub name: String,
    pub status: DatasetStatus,
    pub periods: Vec<PeriodReport>,
    pub skipped: Vec<SkippedReport>,
    /// Unique class histories in the table
    pub histories: usize,
    pub total_area_ha: f64,
    pub transitions: Option<PathBuf>,
    pub fragments: Option<PathBuf>,
    pub error: Option<String>,
    pub elapsed_secs: f64,
}

impl DatasetReport {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: DatasetStatus::Failed,
            periods: Vec::new(),
            skipped: Vec::new(),
            histories: 0,
            total_area_ha: 0.0,
            transitions: None,
            fragments: None,
            error: None,
            elapsed_secs: 0.0,
        }
    }
}

/// Outcome of a whole run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub output_dir: PathBuf,
    pub workers: usize,
    pub datasets: Vec<DatasetReport>,
    pub elapsed_secs: f64,
}

impl RunSummary {
    fn count(&self, status: DatasetStatus) -> usize {
        self.datasets.iter().filter(|d| d.status == status).count()
    }

    pub fn completed(&self) -> usize {
        self.count(DatasetStatus::Completed)
    }

    pub fn failed(&self) -> usize {
        self.count(DatasetStatus::Failed)
    }

    pub fn cancelled(&self) -> usize {
        self.count(DatasetStatus::Cancelled)
    }

    /// Write as pretty-printed JSON
    pub fn write<P: AsRef<Path>>(&self, path: P) -> landshift_core::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Read a summary written by [`RunSummary::write`]
    pub fn read<P: AsRef<Path>>(path: P) -> landshift_core::Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_roundtrip() {
        let mut done = DatasetReport::new("Leste");
        done.status = DatasetStatus::Completed;
        let failed = DatasetReport::new("Oeste");
        let summary = RunSummary {
            output_dir: PathBuf::from("out"),
            workers: 2,
            datasets: vec![done, failed],
            elapsed_secs: 1.5,
        };
        assert_eq!(summary.completed(), 1);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.cancelled(), 0);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SUMMARY_FILE);
        summary.write(&path).unwrap();
        assert_eq!(RunSummary::read(&path).unwrap(), summary);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"status\": \"completed\""));
    }
}
