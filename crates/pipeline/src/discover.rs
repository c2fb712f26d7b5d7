//! Dataset discovery from file names
//!
//! Inputs are usually named like `NDVI_Leste_2010.tif`: the stem is split
//! on `_`, one token must name a sector and one must be a 4-digit year.
//! Files are grouped by sector into datasets with chronologically ordered
//! periods. Derived products written next to the inputs (buffers, dissolved
//! layers, sankey and transition exports) are skipped by name.

use crate::config::{DatasetConfig, PeriodInput};
use crate::error::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const EXTENSIONS: [&str; 4] = ["tif", "tiff", "geojson", "json"];

/// Lowercase stem fragments of files that are never inputs
const IGNORED: [&str; 4] = ["buffer", "dissolvido", "sankey", "transicao"];

fn is_ignored(stem: &str) -> bool {
    let stem = stem.to_lowercase();
    IGNORED.iter().any(|word| stem.contains(word))
}

/// Sector and year encoded in a file name, if both are present
pub fn parse_stem(stem: &str, sectors: &[String]) -> Option<(String, i32)> {
    let tokens: Vec<&str> = stem.split('_').collect();
    let sector = sectors
        .iter()
        .find(|s| tokens.iter().any(|t| t.eq_ignore_ascii_case(s)))?;
    let year = tokens
        .iter()
        .find(|t| t.len() == 4 && t.bytes().all(|b| b.is_ascii_digit()))?
        .parse()
        .ok()?;
    Some((sector.clone(), year))
}

/// Group the inputs in `dir` into one dataset per sector.
///
/// Sectors without files are left out. When a sector has two files for the
/// same year, the first in path order wins. Paths are absolute so the
/// resulting configuration does not depend on the working directory.
pub fn discover_datasets<P: AsRef<Path>>(dir: P, sectors: &[String]) -> Result<Vec<DatasetConfig>> {
    let dir = std::fs::canonicalize(dir.as_ref()).map_err(landshift_core::Error::from)?;
    let mut paths: Vec<PathBuf> = std::fs::read_dir(&dir)
        .map_err(landshift_core::Error::from)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        })
        .collect();
    paths.sort();

    let mut grouped: BTreeMap<String, BTreeMap<i32, PathBuf>> = BTreeMap::new();
    for path in paths {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if is_ignored(stem) {
            debug!(path = %path.display(), "derived product skipped");
            continue;
        }
        let Some((sector, year)) = parse_stem(stem, sectors) else {
            debug!(path = %path.display(), "no sector/year in file name");
            continue;
        };
        let periods = grouped.entry(sector).or_default();
        if let Some(existing) = periods.get(&year) {
            warn!(
                kept = %existing.display(),
                ignored = %path.display(),
                year,
                "two inputs for one period"
            );
            continue;
        }
        periods.insert(year, path);
    }

    for sector in sectors {
        if !grouped.contains_key(sector) {
            warn!(%sector, "no inputs found");
        }
    }

    Ok(sectors
        .iter()
        .filter_map(|sector| {
            let periods = grouped.remove(sector)?;
            Some(DatasetConfig {
                name: sector.clone(),
                periods: periods
                    .into_iter()
                    .map(|(period, path)| PeriodInput { period, path })
                    .collect(),
            })
        })
        .collect())
}
