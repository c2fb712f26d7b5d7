//! Run configuration
//!
//! A run is described by a TOML file:
//!
//! ```toml
//! output_dir = "out"
//! classes = 5
//! band = "auto"          # or a 1-based band number
//! connectivity = "four"  # or "eight"
//! dissolve = true
//! field_prefix = "Class"
//! workers = 4
//! mask = "buffer.geojson"
//! min_area = 1e-9        # overlay slivers up to this size are dropped
//!
//! [[datasets]]
//! name = "Leste"
//! periods = [
//!     { period = 2010, path = "Leste_2010.tif" },
//!     { period = 2015, path = "Leste_2015.tif" },
//! ]
//! ```
//!
//! Relative paths are resolved against the directory of the file.

use crate::error::{Error, Result};
use landshift_algorithms::vector::{Connectivity, OverlayParams};
use landshift_core::raster::BandSelection;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Cell adjacency as written in the configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivitySetting {
    #[default]
    Four,
    Eight,
}

impl From<ConnectivitySetting> for Connectivity {
    fn from(setting: ConnectivitySetting) -> Self {
        match setting {
            ConnectivitySetting::Four => Connectivity::Four,
            ConnectivitySetting::Eight => Connectivity::Eight,
        }
    }
}

/// One period input of a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodInput {
    pub period: i32,
    /// GeoTIFF measurement raster, or GeoJSON layer already carrying `DN`
    pub path: PathBuf,
}

/// A named sequence of period inputs over the same area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub name: String,
    pub periods: Vec<PeriodInput>,
}

fn default_classes() -> usize {
    5
}

fn default_true() -> bool {
    true
}

fn default_prefix() -> String {
    "Class".to_string()
}

fn default_min_area() -> f64 {
    OverlayParams::default().min_area
}

/// File name component of a dataset's outputs
pub fn output_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect()
}

/// Whole-run settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub output_dir: PathBuf,
    #[serde(default = "default_classes")]
    pub classes: usize,
    #[serde(default)]
    pub band: BandSelection,
    #[serde(default)]
    pub connectivity: ConnectivitySetting,
    #[serde(default = "default_true")]
    pub dissolve: bool,
    #[serde(default = "default_prefix")]
    pub field_prefix: String,
    /// Datasets processed at once; all CPUs when unset
    #[serde(default)]
    pub workers: Option<usize>,
    /// Polygon mask applied to every measurement raster
    #[serde(default)]
    pub mask: Option<PathBuf>,
    /// Also write the overlay fragments as GeoJSON
    #[serde(default)]
    pub write_fragments: bool,
    /// Overlay pieces up to this area, in CRS units squared, are dropped
    #[serde(default = "default_min_area")]
    pub min_area: f64,
    #[serde(default)]
    pub datasets: Vec<DatasetConfig>,
}

impl RunConfig {
    /// Settings with defaults and no datasets
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            classes: default_classes(),
            band: BandSelection::default(),
            connectivity: ConnectivitySetting::default(),
            dissolve: true,
            field_prefix: default_prefix(),
            workers: None,
            mask: None,
            write_fragments: false,
            min_area: default_min_area(),
            datasets: Vec::new(),
        }
    }

    /// Load and validate a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(landshift_core::Error::from)?;
        let mut config = Self::from_toml_str(&contents)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration without validating it
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Make relative paths relative to `base`
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.output_dir);
        if let Some(mask) = self.mask.as_mut() {
            resolve(mask);
        }
        for dataset in &mut self.datasets {
            for input in &mut dataset.periods {
                resolve(&mut input.path);
            }
        }
    }

    /// Check the run-level invariants.
    ///
    /// # Errors
    /// - `NoDatasets` when there is nothing to process
    /// - `DuplicateDataset` when two datasets share a name or an output
    ///   stem (their outputs would collide)
    /// - `Config` for zero classes, zero workers, a negative or non-finite
    ///   `min_area`, an empty dataset, or a period listed twice in one
    ///   dataset
    pub fn validate(&self) -> Result<()> {
        if self.datasets.is_empty() {
            return Err(Error::NoDatasets);
        }
        if self.classes == 0 {
            return Err(Error::Config("classes must be at least 1".into()));
        }
        if self.workers == Some(0) {
            return Err(Error::Config("workers must be at least 1".into()));
        }
        if !(self.min_area.is_finite() && self.min_area >= 0.0) {
            return Err(Error::Config(format!("min_area must be >= 0, got {}", self.min_area)));
        }

        let mut stems = HashSet::new();
        for dataset in &self.datasets {
            if !stems.insert(output_stem(&dataset.name)) {
                return Err(Error::DuplicateDataset(dataset.name.clone()));
            }
            if dataset.periods.is_empty() {
                return Err(Error::Config(format!("dataset '{}' has no periods", dataset.name)));
            }
            let mut periods = HashSet::new();
            for input in &dataset.periods {
                if !periods.insert(input.period) {
                    return Err(Error::Config(format!(
                        "dataset '{}' lists period {} twice",
                        dataset.name, input.period
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
        output_dir = "out"
        band = 1
        connectivity = "eight"

        [[datasets]]
        name = "Leste"
        periods = [
            { period = 2015, path = "Leste_2015.tif" },
            { period = 2010, path = "/data/Leste_2010.tif" },
        ]
    "#;

    #[test]
    fn test_defaults() {
        let config = RunConfig::from_toml_str(CONFIG).unwrap();
        assert_eq!(config.classes, 5);
        assert!(config.dissolve);
        assert_eq!(config.field_prefix, "Class");
        assert_eq!(config.band, BandSelection::Index(1));
        assert_eq!(config.connectivity, ConnectivitySetting::Eight);
        assert!(config.workers.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_auto_band() {
        let config = RunConfig::from_toml_str("output_dir = 'o'\nband = 'auto'").unwrap();
        assert_eq!(config.band, BandSelection::Auto);
    }

    #[test]
    fn test_relative_paths_follow_config_file() {
        let mut config = RunConfig::from_toml_str(CONFIG).unwrap();
        config.resolve_paths(Path::new("/runs/a"));
        assert_eq!(config.output_dir, PathBuf::from("/runs/a/out"));
        let periods = &config.datasets[0].periods;
        assert_eq!(periods[0].path, PathBuf::from("/runs/a/Leste_2015.tif"));
        assert_eq!(periods[1].path, PathBuf::from("/data/Leste_2010.tif"));
    }

    #[test]
    fn test_duplicate_dataset_names() {
        let mut config = RunConfig::from_toml_str(CONFIG).unwrap();
        config.datasets.push(config.datasets[0].clone());
        assert!(matches!(config.validate(), Err(Error::DuplicateDataset(ref n)) if n == "Leste"));
    }

    #[test]
    fn test_colliding_output_stems() {
        assert_eq!(output_stem("a/b\\c"), "a_b_c");

        let mut config = RunConfig::from_toml_str(CONFIG).unwrap();
        let mut other = config.datasets[0].clone();
        config.datasets[0].name = "Leste/A".into();
        other.name = "Leste_A".into();
        config.datasets.push(other);
        assert!(matches!(config.validate(), Err(Error::DuplicateDataset(ref n)) if n == "Leste_A"));
    }

    #[test]
    fn test_min_area() {
        let config = RunConfig::from_toml_str(CONFIG).unwrap();
        assert_eq!(config.min_area, 1e-9);

        let mut config = RunConfig::from_toml_str(&format!("min_area = 2.5\n{}", CONFIG)).unwrap();
        assert_eq!(config.min_area, 2.5);
        config.min_area = -1.0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_no_datasets() {
        let config = RunConfig::new("out");
        assert!(matches!(config.validate(), Err(Error::NoDatasets)));
    }

    #[test]
    fn test_repeated_period() {
        let mut config = RunConfig::from_toml_str(CONFIG).unwrap();
        config.datasets[0].periods[1].period = 2015;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(RunConfig::from_toml_str("output_dir = 'o'\nclases = 4").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.toml");
        std::fs::write(&path, CONFIG).unwrap();

        let config = RunConfig::load(&path).unwrap();
        assert_eq!(config.output_dir, dir.path().join("out"));
    }
}
