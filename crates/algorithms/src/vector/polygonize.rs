//! Class raster → polygon regions
//!
//! Cells are grouped into connected components of equal class, then the
//! boundary of every component is traced along cell edges. Edges are directed
//! so that the component lies on their right (clockwise on screen, with the
//! row axis pointing down), which makes exterior rings positive and holes
//! negative under the shoelace formula in grid space.
//!
//! Where a component touches itself only at a corner, the walk has two ways
//! to leave the vertex. Under 4-connectivity it turns right and keeps the two
//! cells apart; under 8-connectivity it turns left and joins them. A walk
//! that passes a vertex twice is split there, so every output ring is simple.

use crate::classification::ClassId;
use crate::maybe_rayon::*;
use geo::{Area, Contains, Coord, LineString, MultiPolygon, Orient, Point, Polygon};
use geo::orient::Direction;
use landshift_core::raster::{GeoTransform, Neighborhood, Raster};
use landshift_core::vector::{AttributeValue, Feature, FeatureCollection, LayerSchema};
use landshift_core::{to_hectares, Result, CRS};
use std::collections::HashMap;
use tracing::debug;

/// Attribute holding the class id of a vectorized region
pub const GENERIC_CLASS_FIELD: &str = "DN";

/// Cell adjacency used to build regions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Connectivity {
    /// Cells sharing an edge
    #[default]
    Four,
    /// Cells sharing an edge or a corner
    Eight,
}

impl Connectivity {
    pub fn neighborhood(&self) -> Neighborhood {
        match self {
            Connectivity::Four => Neighborhood::Rook,
            Connectivity::Eight => Neighborhood::Queen,
        }
    }
}

/// Parameters for [`vectorize`]
#[derive(Debug, Clone, Default)]
pub struct PolygonizeParams {
    pub connectivity: Connectivity,
}

/// One connected group of equal-class cells
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedRegion {
    pub class_id: ClassId,
    pub geometry: MultiPolygon<f64>,
    /// Geometry area in hectares
    pub area_ha: f64,
    /// Number of cells in the group
    pub cell_count: usize,
}

/// Grid corner as `(x, y)` = `(col, row)`
type Vertex = (usize, usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    East,
    South,
    West,
    North,
}

impl Step {
    fn apply(self, (x, y): Vertex) -> Vertex {
        match self {
            Step::East => (x + 1, y),
            Step::South => (x, y + 1),
            Step::West => (x - 1, y),
            Step::North => (x, y - 1),
        }
    }

    fn right(self) -> Step {
        match self {
            Step::East => Step::South,
            Step::South => Step::West,
            Step::West => Step::North,
            Step::North => Step::East,
        }
    }

    fn left(self) -> Step {
        match self {
            Step::East => Step::North,
            Step::North => Step::West,
            Step::West => Step::South,
            Step::South => Step::East,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Edge {
    from: Vertex,
    step: Step,
}

struct Component {
    class_id: ClassId,
    cell_count: usize,
    edges: Vec<Edge>,
}

const UNLABELED: usize = usize::MAX;

/// Convert a class raster into polygon regions.
///
/// No-data cells produce no region. Regions come out in raster scan order
/// of their first cell; areas are computed from the output geometry.
pub fn vectorize(raster: &Raster<ClassId>, params: &PolygonizeParams) -> Vec<ClassifiedRegion> {
    let (rows, cols) = raster.shape();
    let neighborhood = params.connectivity.neighborhood();

    // Connected components, numbered in scan order
    let mut labels = vec![UNLABELED; rows * cols];
    let mut components: Vec<Component> = Vec::new();
    let mut stack = Vec::new();

    for row in 0..rows {
        for col in 0..cols {
            if labels[row * cols + col] != UNLABELED {
                continue;
            }
            let Some(class_id) = raster.valid_at(row, col) else {
                continue;
            };

            let id = components.len();
            labels[row * cols + col] = id;
            stack.push((row, col));
            let mut cell_count = 0;

            while let Some((r, c)) = stack.pop() {
                cell_count += 1;
                for (nr, nc) in neighborhood.neighbors(r, c, rows, cols) {
                    let n = nr * cols + nc;
                    if labels[n] == UNLABELED && raster.valid_at(nr, nc) == Some(class_id) {
                        labels[n] = id;
                        stack.push((nr, nc));
                    }
                }
            }

            components.push(Component {
                class_id,
                cell_count,
                edges: Vec::new(),
            });
        }
    }

    // Boundary edges: every cell side not shared with the same component
    for row in 0..rows {
        for col in 0..cols {
            let idx = row * cols + col;
            let id = labels[idx];
            if id == UNLABELED {
                continue;
            }
            let edges = &mut components[id].edges;
            if row == 0 || labels[idx - cols] != id {
                edges.push(Edge { from: (col, row), step: Step::East });
            }
            if col + 1 == cols || labels[idx + 1] != id {
                edges.push(Edge { from: (col + 1, row), step: Step::South });
            }
            if row + 1 == rows || labels[idx + cols] != id {
                edges.push(Edge { from: (col + 1, row + 1), step: Step::West });
            }
            if col == 0 || labels[idx - 1] != id {
                edges.push(Edge { from: (col, row + 1), step: Step::North });
            }
        }
    }

    debug!(components = components.len(), "traced class raster");

    let transform = *raster.transform();
    let connectivity = params.connectivity;
    components
        .into_par_iter()
        .filter_map(|component| build_region(component, &transform, connectivity))
        .collect()
}

/// Regions as a feature collection with fields `DN` and `area_ha`
pub fn regions_to_features(
    regions: &[ClassifiedRegion],
    name: &str,
    crs: Option<CRS>,
) -> Result<FeatureCollection> {
    let mut collection =
        FeatureCollection::new(name, LayerSchema::new([GENERIC_CLASS_FIELD, "area_ha"]));
    collection.crs = crs;
    for region in regions {
        collection.push(Feature::new(
            region.geometry.clone().into(),
            vec![
                AttributeValue::Int(i64::from(region.class_id)),
                AttributeValue::Float(region.area_ha),
            ],
        ))?;
    }
    Ok(collection)
}

fn build_region(
    component: Component,
    transform: &GeoTransform,
    connectivity: Connectivity,
) -> Option<ClassifiedRegion> {
    let mut shells = Vec::new();
    let mut holes = Vec::new();
    for ring in trace_walks(&component.edges, connectivity)
        .into_iter()
        .flat_map(split_at_touches)
    {
        let area = signed_area(&ring);
        if area > 0.0 {
            shells.push(ring);
        } else if area < 0.0 {
            holes.push(ring);
        }
    }
    if shells.is_empty() {
        return None;
    }

    let grid_shells: Vec<Polygon<f64>> = shells
        .iter()
        .map(|s| Polygon::new(grid_ring(s), vec![]))
        .collect();
    let mut interiors: Vec<Vec<LineString<f64>>> = vec![Vec::new(); shells.len()];

    for hole in &holes {
        let probe = inside_probe(hole);
        let owner = if shells.len() == 1 {
            Some(0)
        } else {
            grid_shells
                .iter()
                .enumerate()
                .filter(|(_, shell)| shell.contains(&probe))
                .min_by(|(_, a), (_, b)| a.unsigned_area().total_cmp(&b.unsigned_area()))
                .map(|(i, _)| i)
        };
        match owner {
            Some(i) => interiors[i].push(map_ring(hole, transform)),
            None => debug!(class = component.class_id, "hole without enclosing shell dropped"),
        }
    }

    let polygons: Vec<Polygon<f64>> = shells
        .iter()
        .zip(interiors)
        .map(|(shell, holes)| Polygon::new(map_ring(shell, transform), holes))
        .collect();
    let geometry = MultiPolygon::new(polygons).orient(Direction::Default);
    let area_ha = to_hectares(geometry.unsigned_area());

    Some(ClassifiedRegion {
        class_id: component.class_id,
        geometry,
        area_ha,
        cell_count: component.cell_count,
    })
}

/// Follow boundary edges into closed vertex walks
fn trace_walks(edges: &[Edge], connectivity: Connectivity) -> Vec<Vec<Vertex>> {
    let mut outgoing: HashMap<Vertex, Vec<usize>> = HashMap::with_capacity(edges.len());
    for (i, edge) in edges.iter().enumerate() {
        outgoing.entry(edge.from).or_default().push(i);
    }

    let mut used = vec![false; edges.len()];
    let mut walks = Vec::new();

    for start in 0..edges.len() {
        if used[start] {
            continue;
        }
        let mut walk = Vec::new();
        let mut current = start;
        loop {
            used[current] = true;
            let edge = edges[current];
            walk.push(edge.from);

            let at = edge.step.apply(edge.from);
            let candidates = outgoing.get(&at).map(Vec::as_slice).unwrap_or(&[]);
            let next = if candidates.len() > 1 {
                let turn = match connectivity {
                    Connectivity::Four => edge.step.right(),
                    Connectivity::Eight => edge.step.left(),
                };
                candidates.iter().copied().find(|&i| edges[i].step == turn)
            } else {
                candidates.first().copied()
            };

            match next {
                Some(n) if n == start => {
                    walks.push(walk);
                    break;
                }
                Some(n) if !used[n] => current = n,
                _ => {
                    debug!(vertices = walk.len(), "open boundary walk dropped");
                    break;
                }
            }
        }
    }

    walks
}

/// Split a closed walk into simple rings at every repeated vertex
fn split_at_touches(walk: Vec<Vertex>) -> Vec<Vec<Vertex>> {
    let mut rings = Vec::new();
    let mut stack: Vec<Vertex> = Vec::with_capacity(walk.len());
    let mut position: HashMap<Vertex, usize> = HashMap::new();

    for v in walk {
        match position.get(&v) {
            Some(&pos) => {
                let ring: Vec<Vertex> = stack.drain(pos..).collect();
                for u in &ring[1..] {
                    position.remove(u);
                }
                stack.push(v);
                rings.push(ring);
            }
            None => {
                position.insert(v, stack.len());
                stack.push(v);
            }
        }
    }
    if !stack.is_empty() {
        rings.push(stack);
    }
    rings
}

/// Shoelace area of an implicitly closed ring in grid space (row axis down)
fn signed_area(ring: &[Vertex]) -> f64 {
    let n = ring.len();
    let twice: f64 = (0..n)
        .map(|i| {
            let (x0, y0) = ring[i];
            let (x1, y1) = ring[(i + 1) % n];
            x0 as f64 * y1 as f64 - x1 as f64 * y0 as f64
        })
        .sum();
    twice / 2.0
}

/// Centre of the cell left of the first edge, strictly inside a hole
fn inside_probe(hole: &[Vertex]) -> Point<f64> {
    let (x0, y0) = hole[0];
    let (x1, y1) = hole[1 % hole.len()];
    let dx = x1 as f64 - x0 as f64;
    let dy = y1 as f64 - y0 as f64;
    Point::new(
        x0 as f64 + 0.5 * dx + 0.5 * dy,
        y0 as f64 + 0.5 * dy - 0.5 * dx,
    )
}

/// Ring vertices where the direction changes
fn corners(ring: &[Vertex]) -> Vec<Vertex> {
    let n = ring.len();
    let heading = |a: Vertex, b: Vertex| {
        (
            (b.0 as isize - a.0 as isize).signum(),
            (b.1 as isize - a.1 as isize).signum(),
        )
    };
    (0..n)
        .filter(|&i| {
            let prev = ring[(i + n - 1) % n];
            let next = ring[(i + 1) % n];
            heading(prev, ring[i]) != heading(ring[i], next)
        })
        .map(|i| ring[i])
        .collect()
}

fn grid_ring(ring: &[Vertex]) -> LineString<f64> {
    corners(ring)
        .into_iter()
        .map(|(x, y)| Coord { x: x as f64, y: y as f64 })
        .collect::<Vec<_>>()
        .into()
}

fn map_ring(ring: &[Vertex], transform: &GeoTransform) -> LineString<f64> {
    corners(ring)
        .into_iter()
        .map(|(x, y)| {
            let (gx, gy) = transform.corner_to_geo(x, y);
            Coord { x: gx, y: gy }
        })
        .collect::<Vec<_>>()
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imagery::CLASS_NODATA;
    use approx::assert_relative_eq;

    /// Class raster of 10 m cells with its upper-left corner at (0, rows*10)
    fn classes(values: Vec<ClassId>, rows: usize, cols: usize) -> Raster<ClassId> {
        let mut r = Raster::from_vec(values, rows, cols).unwrap();
        r.set_transform(GeoTransform::new(0.0, rows as f64 * 10.0, 10.0, -10.0));
        r.set_nodata(Some(CLASS_NODATA));
        r
    }

    fn four() -> PolygonizeParams {
        PolygonizeParams::default()
    }

    fn eight() -> PolygonizeParams {
        PolygonizeParams {
            connectivity: Connectivity::Eight,
        }
    }

    #[test]
    fn test_uniform_block_is_one_rectangle() {
        let raster = classes(vec![1; 6], 2, 3);
        let regions = vectorize(&raster, &four());

        assert_eq!(regions.len(), 1);
        let region = &regions[0];
        assert_eq!(region.class_id, 1);
        assert_eq!(region.cell_count, 6);
        assert_relative_eq!(region.area_ha, 0.06, epsilon = 1e-12);

        assert_eq!(region.geometry.0.len(), 1);
        // four corners plus the closing coordinate
        assert_eq!(region.geometry.0[0].exterior().0.len(), 5);
        assert!(region.geometry.0[0].interiors().is_empty());
    }

    #[test]
    fn test_diagonal_contact_depends_on_connectivity() {
        let raster = classes(vec![1, 2, 2, 1], 2, 2);

        let regions = vectorize(&raster, &four());
        assert_eq!(regions.len(), 4);
        assert!(regions.iter().all(|r| r.cell_count == 1));

        let regions = vectorize(&raster, &eight());
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].class_id, 1);
        assert_eq!(regions[0].cell_count, 2);
        assert_eq!(regions[0].geometry.0.len(), 2);
        assert_relative_eq!(regions[0].geometry.unsigned_area(), 200.0, epsilon = 1e-9);
    }

    #[test]
    fn test_enclosed_cell_becomes_hole() {
        #[rustfmt::skip]
        let raster = classes(vec![
            1, 1, 1,
            1, 2, 1,
            1, 1, 1,
        ], 3, 3);
        let regions = vectorize(&raster, &four());

        assert_eq!(regions.len(), 2);
        let outer = &regions[0];
        assert_eq!(outer.class_id, 1);
        assert_eq!(outer.geometry.0.len(), 1);
        assert_eq!(outer.geometry.0[0].interiors().len(), 1);
        assert_relative_eq!(outer.geometry.unsigned_area(), 800.0, epsilon = 1e-9);
        assert_relative_eq!(regions[1].geometry.unsigned_area(), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_hole_touching_exterior_at_a_corner() {
        #[rustfmt::skip]
        let raster = classes(vec![
            1, 1, 1,
            1, 2, 1,
            1, 1, 2,
        ], 3, 3);

        for params in [four(), eight()] {
            let regions = vectorize(&raster, &params);
            let outer = regions.iter().find(|r| r.class_id == 1).unwrap();
            assert_eq!(outer.cell_count, 7);
            assert_eq!(outer.geometry.0.len(), 1);
            assert_eq!(outer.geometry.0[0].interiors().len(), 1);
            assert_relative_eq!(outer.geometry.unsigned_area(), 700.0, epsilon = 1e-9);
        }

        let twos: Vec<_> = vectorize(&raster, &eight())
            .into_iter()
            .filter(|r| r.class_id == 2)
            .collect();
        assert_eq!(twos.len(), 1);
        assert_eq!(twos[0].cell_count, 2);
    }

    #[test]
    fn test_nodata_produces_no_region() {
        #[rustfmt::skip]
        let raster = classes(vec![
            CLASS_NODATA, 3, 3,
            CLASS_NODATA, CLASS_NODATA, 3,
        ], 2, 3);
        let regions = vectorize(&raster, &four());

        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].class_id, 3);
        assert_relative_eq!(regions[0].area_ha, 0.03, epsilon = 1e-12);
    }

    #[test]
    fn test_regions_follow_scan_order() {
        #[rustfmt::skip]
        let raster = classes(vec![
            5, 4, 4,
            3, 3, 4,
        ], 2, 3);
        let ids: Vec<ClassId> = vectorize(&raster, &four()).iter().map(|r| r.class_id).collect();
        assert_eq!(ids, vec![5, 4, 3]);
    }

    #[test]
    fn test_area_is_conserved() {
        let values: Vec<ClassId> = (0..100).map(|i| ((i * 7 + i / 10) % 4) as ClassId + 1).collect();
        let raster = classes(values, 10, 10);

        for params in [four(), eight()] {
            let regions = vectorize(&raster, &params);
            let total: f64 = regions.iter().map(|r| r.area_ha).sum();
            let cells: usize = regions.iter().map(|r| r.cell_count).sum();
            assert_eq!(cells, 100);
            assert_relative_eq!(total, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_exterior_is_counter_clockwise_in_map_space() {
        let raster = classes(vec![1; 4], 2, 2);
        let regions = vectorize(&raster, &four());
        assert!(regions[0].geometry.0[0].signed_area() > 0.0);
    }

    #[test]
    fn test_features_carry_dn_and_area() {
        let raster = classes(vec![1, 1, 2, 2], 2, 2);
        let regions = vectorize(&raster, &four());
        let fc = regions_to_features(&regions, "Leste_2010", Some(CRS::from_epsg(31983))).unwrap();

        assert_eq!(fc.schema().fields(), &["DN".to_string(), "area_ha".to_string()]);
        assert_eq!(fc.len(), 2);
        assert_eq!(fc.features()[1].attributes[0], AttributeValue::Int(2));
    }
}
