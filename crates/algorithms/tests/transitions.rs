//! End-to-end transition scenarios: measurement rasters through to the
//! aggregated transition table.

use approx::assert_relative_eq;
use geo::{polygon, MultiPolygon};
use landshift_algorithms::classification::{classify, ClassBreaks};
use landshift_algorithms::history::{aggregate, TransitionTable};
use landshift_algorithms::imagery::{mask_outside, reclassify};
use landshift_algorithms::statistics::band_range;
use landshift_algorithms::vector::{
    chain_intersect, dissolve, label_period, regions_to_features, vectorize, LabelParams,
    Period, PeriodLayer, PolygonizeParams,
};
use landshift_core::vector::ClassValue;
use landshift_core::{GeoTransform, Raster, CRS};

const CELL: f64 = 100.0;

/// Measurement raster of 1 ha cells anchored at (500000, 7400000)
fn measurement(values: Vec<f64>, rows: usize, cols: usize) -> Raster<f64> {
    let mut r = Raster::from_vec(values, rows, cols).unwrap();
    r.set_transform(GeoTransform::new(500_000.0, 7_400_000.0, CELL, -CELL));
    r.set_crs(Some(CRS::from_epsg(31983)));
    r.set_nodata(Some(-9999.0));
    r
}

fn period_layer(raster: &Raster<f64>, breaks: &ClassBreaks, year: i32, dissolved: bool) -> PeriodLayer {
    let classes = reclassify(raster, breaks).unwrap();
    let mut regions = vectorize(&classes, &PolygonizeParams::default());
    if dissolved {
        regions = dissolve(&regions);
    }
    let name = format!("Leste_{}", year);
    let features = regions_to_features(&regions, &name, raster.crs()).unwrap();
    label_period(&features, Period(year), &LabelParams::default()).unwrap()
}

fn transitions(layers: &[PeriodLayer]) -> TransitionTable {
    let out = chain_intersect(layers).unwrap();
    assert!(out.skipped.is_empty());
    let fields: Vec<String> = layers.iter().map(|l| l.field.clone()).collect();
    aggregate(&out.fragments, &fields).unwrap()
}

fn c(id: i64) -> ClassValue {
    ClassValue::Class(id)
}

#[test]
fn test_two_period_transition_table() {
    // 2010: 100 ha of low NDVI on the left, 50 ha of high NDVI on the right
    let (rows, cols) = (10, 15);
    let y2010: Vec<f64> = (0..rows * cols)
        .map(|i| if i % cols < 10 { 0.2 } else { 0.7 })
        .collect();
    let y2015 = vec![0.7; rows * cols];

    let breaks = classify(0.0, 1.0, 2).unwrap();
    let layers = [
        period_layer(&measurement(y2010, rows, cols), &breaks, 2010, false),
        period_layer(&measurement(y2015, rows, cols), &breaks, 2015, false),
    ];
    assert_relative_eq!(layers[0].total_area_ha(), 150.0, epsilon = 1e-9);

    let table = transitions(&layers);
    assert_eq!(table.fields(), &["Class2010".to_string(), "Class2015".to_string()]);
    assert_eq!(table.len(), 2);
    assert_relative_eq!(table.area_of(&[c(1), c(2)]).unwrap(), 100.0, epsilon = 1e-6);
    assert_relative_eq!(table.area_of(&[c(2), c(2)]).unwrap(), 50.0, epsilon = 1e-6);

    let mut csv = Vec::new();
    table.write_csv(&mut csv).unwrap();
    assert_eq!(
        String::from_utf8(csv).unwrap(),
        "Class2010,Class2015,area_ha\n1,2,100.0000\n2,2,50.0000\n"
    );
}

#[test]
fn test_nodata_contributes_no_area() {
    let (rows, cols) = (6, 6);
    let mut y2010: Vec<f64> = (0..rows * cols).map(|i| (i % 7) as f64 / 7.0).collect();
    for i in [0, 1, 2, 14, 35] {
        y2010[i] = -9999.0;
    }
    let y2015: Vec<f64> = (0..rows * cols).map(|i| (i % 5) as f64 / 5.0).collect();

    let r2010 = measurement(y2010, rows, cols);
    let range = band_range(&r2010).unwrap();
    assert_eq!(range.valid_count, 31);
    let breaks = classify(range.min, range.max, 5).unwrap();

    let layers = [
        period_layer(&r2010, &breaks, 2010, true),
        period_layer(&measurement(y2015, rows, cols), &breaks, 2015, true),
    ];
    let table = transitions(&layers);

    assert_relative_eq!(table.total_area_ha(), 31.0, epsilon = 1e-6);
    assert!(table.iter().all(|(history, _)| history.iter().all(|v| *v != ClassValue::Null)));
}

#[test]
fn test_three_periods_conserve_extent() {
    let (rows, cols) = (12, 12);
    let years = [2000, 2005, 2010];
    let layers: Vec<PeriodLayer> = years
        .iter()
        .enumerate()
        .map(|(k, &year)| {
            let values: Vec<f64> = (0..rows * cols)
                .map(|i| ((i * (k + 3) + i / cols) % 11) as f64 / 10.0)
                .collect();
            let raster = measurement(values, rows, cols);
            let range = band_range(&raster).unwrap();
            let breaks = classify(range.min, range.max, 4).unwrap();
            period_layer(&raster, &breaks, year, k % 2 == 0)
        })
        .collect();

    let table = transitions(&layers);
    assert_eq!(table.fields().len(), 3);
    assert_relative_eq!(table.total_area_ha(), 144.0, epsilon = 1e-6);
    assert!(table
        .iter()
        .all(|(history, _)| history.iter().all(|v| matches!(v, ClassValue::Class(1..=4)))));

    // same input, same table
    assert_eq!(table, transitions(&layers));
}

#[test]
fn test_masked_periods_only_cover_the_mask() {
    let (rows, cols) = (8, 8);
    let values: Vec<f64> = (0..rows * cols).map(|i| (i % 3) as f64).collect();
    let raster = measurement(values, rows, cols);

    // lower-left quarter of the grid: 4 x 4 cells
    let mask = MultiPolygon::new(vec![polygon![
        (x: 500_000.0, y: 7_399_200.0),
        (x: 500_400.0, y: 7_399_200.0),
        (x: 500_400.0, y: 7_399_600.0),
        (x: 500_000.0, y: 7_399_600.0),
    ]]);
    let clipped = mask_outside(&raster, &mask).unwrap();
    let breaks = classify(0.0, 2.0, 3).unwrap();

    let layers = [
        period_layer(&clipped, &breaks, 2010, true),
        period_layer(&raster, &breaks, 2015, true),
    ];
    let table = transitions(&layers);
    assert_relative_eq!(table.total_area_ha(), 16.0, epsilon = 1e-6);
}
