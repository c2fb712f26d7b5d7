//! Static bounding-box R-tree
//!
//! Bulk-loaded with Sort-Tile-Recursive packing: boxes are sorted into
//! vertical slabs by centre x, each slab sorted by centre y and cut into
//! nodes of [`NODE_CAPACITY`] entries. Upper levels group consecutive nodes,
//! which are already spatially coherent after packing.
//!
//! Reference:
//! Leutenegger, S.T., Lopez, M.A., Edgington, J. (1997). STR: a simple and
//! efficient algorithm for R-tree packing. ICDE.

use geo::{BoundingRect, MultiPolygon};
use std::ops::Range;

/// Maximum entries per node
pub const NODE_CAPACITY: usize = 16;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Envelope of a multipolygon, `None` when it has no coordinates
    pub fn of(geometry: &MultiPolygon<f64>) -> Option<Self> {
        geometry.bounding_rect().map(|rect| Self {
            min_x: rect.min().x,
            min_y: rect.min().y,
            max_x: rect.max().x,
            max_y: rect.max().y,
        })
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.min_x + self.max_x) / 2.0, (self.min_y + self.max_y) / 2.0)
    }

    /// Closed-interval overlap test; boxes sharing an edge intersect
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    fn merge(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

#[derive(Debug)]
struct Node {
    bbox: BoundingBox,
    /// Children in the level below, or entries for leaf nodes
    children: Range<usize>,
}

/// Read-only R-tree over item bounding boxes
#[derive(Debug)]
pub struct SpatialIndex {
    /// `(bbox, item id)` in packed order
    entries: Vec<(BoundingBox, usize)>,
    /// `levels[0]` are leaves over `entries`; the last level is the root level
    levels: Vec<Vec<Node>>,
}

impl SpatialIndex {
    /// Build an index over `(bbox, item id)` pairs
    pub fn build(items: impl IntoIterator<Item = (BoundingBox, usize)>) -> Self {
        let mut entries: Vec<(BoundingBox, usize)> = items.into_iter().collect();
        let mut levels = Vec::new();
        if entries.is_empty() {
            return Self { entries, levels };
        }

        str_pack(&mut entries);
        let mut level = group(&entries.iter().map(|(b, _)| *b).collect::<Vec<_>>());
        while level.len() > NODE_CAPACITY {
            let boxes: Vec<BoundingBox> = level.iter().map(|n| n.bbox).collect();
            levels.push(level);
            level = group(&boxes);
        }
        levels.push(level);

        Self { entries, levels }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ids of items whose box intersects `window`, ascending
    pub fn query(&self, window: &BoundingBox) -> Vec<usize> {
        let mut hits = Vec::new();
        let Some(top) = self.levels.last() else {
            return hits;
        };

        let root_level = self.levels.len() - 1;
        let mut stack: Vec<(usize, usize)> = (0..top.len()).map(|i| (root_level, i)).collect();
        while let Some((level, index)) = stack.pop() {
            let node = &self.levels[level][index];
            if !node.bbox.intersects(window) {
                continue;
            }
            if level == 0 {
                hits.extend(
                    self.entries[node.children.clone()]
                        .iter()
                        .filter(|(bbox, _)| bbox.intersects(window))
                        .map(|(_, id)| *id),
                );
            } else {
                stack.extend(node.children.clone().map(|child| (level - 1, child)));
            }
        }

        hits.sort_unstable();
        hits
    }
}

/// Reorder entries into Sort-Tile-Recursive order
fn str_pack(entries: &mut [(BoundingBox, usize)]) {
    let leaves = entries.len().div_ceil(NODE_CAPACITY);
    let slabs = (leaves as f64).sqrt().ceil() as usize;
    let slab_size = slabs.max(1) * NODE_CAPACITY;

    entries.sort_by(|a, b| a.0.center().0.total_cmp(&b.0.center().0));
    for slab in entries.chunks_mut(slab_size) {
        slab.sort_by(|a, b| a.0.center().1.total_cmp(&b.0.center().1));
    }
}

/// One level of nodes over consecutive runs of `boxes`
fn group(boxes: &[BoundingBox]) -> Vec<Node> {
    boxes
        .chunks(NODE_CAPACITY)
        .enumerate()
        .map(|(i, chunk)| {
            let start = i * NODE_CAPACITY;
            let bbox = chunk[1..].iter().fold(chunk[0], |acc, b| acc.merge(b));
            Node {
                bbox,
                children: start..start + chunk.len(),
            }
        })
        .collect()
}
