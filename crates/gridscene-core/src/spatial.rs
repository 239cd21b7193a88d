use rstar::{RTree, RTreeObject, AABB};

use crate::geometry::{BBox, Segment};

/// An entry in the R-tree spatial index, referencing a projected segment by index.
#[derive(Debug, Clone)]
pub struct SegmentEntry {
    /// Index into the grid's segment list.
    pub segment_index: usize,
    /// Bounding box of the segment.
    pub bbox: BBox,
}

impl RTreeObject for SegmentEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bbox.min.x, self.bbox.min.y],
            [self.bbox.max.x, self.bbox.max.y],
        )
    }
}

/// Spatial index over a grid's segments, used for viewport culling.
pub struct SegmentIndex {
    tree: RTree<SegmentEntry>,
}

impl std::fmt::Debug for SegmentIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentIndex")
            .field("len", &self.tree.size())
            .finish()
    }
}

impl SegmentIndex {
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// Bulk-load the index from a segment list.
    pub fn build(segments: &[Segment]) -> Self {
        let entries = segments
            .iter()
            .enumerate()
            .map(|(segment_index, s)| SegmentEntry {
                segment_index,
                bbox: s.bbox(),
            })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Find all segments that intersect the given view bounds.
    pub fn query_view(&self, view: &BBox) -> Vec<&SegmentEntry> {
        let envelope = AABB::from_corners([view.min.x, view.min.y], [view.max.x, view.max.y]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .collect()
    }

    /// Number of entries in the index.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl Default for SegmentIndex {
    fn default() -> Self {
        Self::new()
    }
}
