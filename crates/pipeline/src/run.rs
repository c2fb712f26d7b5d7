//! Dataset pipeline and batch runner
//!
//! Inside a dataset the stages run strictly in order:
//! read → (mask) → range → breaks → reclassify → vectorize → (dissolve)
//! → label, once per period, then overlay → aggregate → write. Datasets are
//! independent and run concurrently; each writes only its own files.
//!
//! A period that cannot be loaded is recorded and left out of the chain. A
//! dataset with no usable period fails; the run carries on with the rest.

use crate::cancel::CancelFlag;
use crate::config::{output_stem, DatasetConfig, PeriodInput, RunConfig};
use crate::error::{Error, Result};
use crate::strategy::ProcessingMode;
use crate::summary::{
    DatasetReport, DatasetStatus, PeriodReport, RunSummary, SkippedReport, SUMMARY_FILE,
};
use geo::MultiPolygon;
use landshift_algorithms::classification::classify;
use landshift_algorithms::history::aggregate;
use landshift_algorithms::imagery::{mask_outside, reclassify};
use landshift_algorithms::statistics::band_range;
use landshift_algorithms::vector::{
    chain_intersect_with, dissolve, label_period, regions_to_features, vectorize, LabelParams,
    OverlayParams, Period, PeriodLayer, PolygonizeParams, GENERIC_CLASS_FIELD,
};
use landshift_core::io::{read_geojson, read_geotiff_bands, write_geojson};
use landshift_core::raster::BandSelection;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// A configured run
#[derive(Debug)]
pub struct Pipeline {
    config: RunConfig,
    cancel: CancelFlag,
}

impl Pipeline {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            cancel: CancelFlag::new(),
        }
    }

    /// Run sharing an existing cancellation flag
    pub fn with_cancel(config: RunConfig, cancel: CancelFlag) -> Self {
        Self { config, cancel }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Handle that cancels this run when set
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Process every dataset and write the run summary.
    ///
    /// # Errors
    /// Only run-level problems are errors: invalid configuration, an output
    /// directory that cannot be created, an unreadable mask or a summary that
    /// cannot be written. Dataset failures are reported in the summary.
    pub fn run(&self) -> Result<RunSummary> {
        let start = Instant::now();
        let config = &self.config;
        config.validate()?;

        std::fs::create_dir_all(&config.output_dir).map_err(|source| Error::OutputDir {
            path: config.output_dir.clone(),
            source,
        })?;
        let mask = config.mask.as_deref().map(load_mask).transpose()?;

        let mode = ProcessingMode::from_workers(config.workers);
        info!(
            datasets = config.datasets.len(),
            workers = mode.workers(),
            output = %config.output_dir.display(),
            "starting run"
        );

        let reports = mode.map(&config.datasets, |dataset| {
            run_dataset(dataset, config, mask.as_ref(), &self.cancel)
        })?;

        let summary = RunSummary {
            output_dir: config.output_dir.clone(),
            workers: mode.workers(),
            datasets: reports,
            elapsed_secs: start.elapsed().as_secs_f64(),
        };
        summary.write(config.output_dir.join(SUMMARY_FILE))?;
        info!(
            completed = summary.completed(),
            failed = summary.failed(),
            cancelled = summary.cancelled(),
            "run finished"
        );
        Ok(summary)
    }
}

/// Run one dataset, never failing: the outcome is in the report
pub fn run_dataset(
    dataset: &DatasetConfig,
    config: &RunConfig,
    mask: Option<&MultiPolygon<f64>>,
    cancel: &CancelFlag,
) -> DatasetReport {
    let start = Instant::now();
    let mut report = DatasetReport::new(&dataset.name);
    info!(dataset = %dataset.name, periods = dataset.periods.len(), "processing dataset");

    match process(dataset, config, mask, cancel, &mut report) {
        Ok(()) => {
            report.status = DatasetStatus::Completed;
            info!(
                dataset = %dataset.name,
                histories = report.histories,
                area_ha = report.total_area_ha,
                "dataset done"
            );
        }
        Err(e) if e.is_cancelled() => {
            report.status = DatasetStatus::Cancelled;
            report.error = Some(e.to_string());
            info!(dataset = %dataset.name, "dataset cancelled");
        }
        Err(e) => {
            report.status = DatasetStatus::Failed;
            report.error = Some(e.to_string());
            warn!(dataset = %dataset.name, error = %e, "dataset failed");
        }
    }

    report.elapsed_secs = start.elapsed().as_secs_f64();
    report
}

fn process(
    dataset: &DatasetConfig,
    config: &RunConfig,
    mask: Option<&MultiPolygon<f64>>,
    cancel: &CancelFlag,
    report: &mut DatasetReport,
) -> Result<()> {
    let label = LabelParams {
        class_field: GENERIC_CLASS_FIELD.to_string(),
        field_prefix: config.field_prefix.clone(),
    };

    let mut inputs: Vec<&PeriodInput> = dataset.periods.iter().collect();
    inputs.sort_by_key(|input| input.period);

    let mut layers: Vec<PeriodLayer> = Vec::with_capacity(inputs.len());
    for input in inputs {
        cancel.check()?;
        let mut period = PeriodReport {
            period: input.period,
            path: input.path.clone(),
            field: label.field_name(Period(input.period)),
            ..PeriodReport::default()
        };
        match load_period(input, config, mask, &label, cancel, &mut period) {
            Ok(layer) => {
                period.regions = layer.len();
                period.area_ha = layer.total_area_ha();
                layers.push(layer);
            }
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                warn!(
                    dataset = %dataset.name,
                    period = input.period,
                    error = %e,
                    "period left out"
                );
                period.error = Some(e.to_string());
            }
        }
        report.periods.push(period);
    }

    if layers.is_empty() {
        return Err(Error::NoUsablePeriods(dataset.name.clone()));
    }
    let crs = layers[0].crs;
    if crs.is_some_and(|c| c.is_geographic()) {
        warn!(
            dataset = %dataset.name,
            crs = ?crs,
            "geographic CRS: areas are in square degrees, not hectares"
        );
    }

    cancel.check()?;
    let params = OverlayParams {
        min_area: config.min_area,
    };
    let chain = chain_intersect_with(&layers, &params)?;
    report.skipped = chain
        .skipped
        .iter()
        .map(|s| SkippedReport {
            layer: s.layer.clone(),
            field: s.field.clone(),
            index: s.index,
            reason: s.reason.clone(),
        })
        .collect();

    cancel.check()?;
    let fields = chain.fragments.fields().to_vec();
    let table = aggregate(&chain.fragments, &fields)?;
    debug!(dataset = %dataset.name, fragments = chain.fragments.len(), "overlay done");

    cancel.check()?;
    let stem = output_stem(&dataset.name);
    let transitions = config.output_dir.join(format!("transitions_{}.csv", stem));
    let file = File::create(&transitions).map_err(landshift_core::Error::from)?;
    table.write_csv(BufWriter::new(file))?;

    if config.write_fragments {
        let name = format!("fragments_{}", stem);
        let path = config.output_dir.join(format!("{}.geojson", name));
        write_geojson(&chain.fragments.to_features(&name, crs)?, &path)?;
        report.fragments = Some(path);
    }

    report.histories = table.len();
    report.total_area_ha = table.total_area_ha();
    report.transitions = Some(transitions);
    Ok(())
}

fn is_vector(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("geojson") || e.eq_ignore_ascii_case("json"))
}

/// Build the period layer of one input
fn load_period(
    input: &PeriodInput,
    config: &RunConfig,
    mask: Option<&MultiPolygon<f64>>,
    label: &LabelParams,
    cancel: &CancelFlag,
    report: &mut PeriodReport,
) -> Result<PeriodLayer> {
    let features = if is_vector(&input.path) {
        read_geojson(&input.path)?
    } else {
        let name = input
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| input.period.to_string());

        let bands = read_geotiff_bands(&input.path)?;
        let band = config.band.resolve(bands.count())?;
        report.band = Some(band);
        let mut raster = bands.into_band(BandSelection::Index(band))?;

        if let Some(mask) = mask {
            cancel.check()?;
            raster = mask_outside(&raster, mask)?;
        }

        cancel.check()?;
        let range = band_range(&raster)?;
        let breaks = classify(range.min, range.max, config.classes)?;
        report.breaks = breaks.breaks().to_vec();
        report.degenerate = breaks.is_degenerate();
        let classes = reclassify(&raster, &breaks)?;
        debug!(path = %input.path.display(), band, min = range.min, max = range.max, "classified");

        cancel.check()?;
        let params = PolygonizeParams {
            connectivity: config.connectivity.into(),
        };
        let mut regions = vectorize(&classes, &params);
        if config.dissolve {
            cancel.check()?;
            regions = dissolve(&regions);
        }
        regions_to_features(&regions, &name, raster.crs())?
    };

    cancel.check()?;
    Ok(label_period(&features, Period(input.period), label)?)
}

/// Polygons of every feature of a GeoJSON mask
fn load_mask(path: &Path) -> Result<MultiPolygon<f64>> {
    let layer = read_geojson(path)?;
    let polygons: Vec<_> = layer
        .iter()
        .filter_map(|f| f.polygonal())
        .flat_map(|mp| mp.0)
        .collect();
    if polygons.is_empty() {
        return Err(Error::Config(format!(
            "mask {} has no polygons",
            path.display()
        )));
    }
    Ok(MultiPolygon::new(polygons))
}
