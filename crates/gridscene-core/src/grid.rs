use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{BBox, Point, Segment};
use crate::spatial::SegmentIndex;

#[derive(Error, Debug)]
pub enum GridError {
    #[error("Grid document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Way {way} references unknown node {node}")]
    UnknownNode { way: usize, node: u64 },

    #[error("Duplicate node id {0}")]
    DuplicateNode(u64),
}

/// Maps raw grid coordinates into scene space.
pub trait Projector: fmt::Debug {
    fn project(&self, point: Point) -> Point;
}

/// Leaves coordinates untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityProjector;

impl Projector for IdentityProjector {
    fn project(&self, point: Point) -> Point {
        point
    }
}

/// Re-centers coordinates on an origin and scales them uniformly.
#[derive(Debug, Clone, Copy)]
pub struct OffsetProjector {
    pub origin: Point,
    pub scale: f64,
}

impl OffsetProjector {
    pub fn new(origin: Point, scale: f64) -> Self {
        Self { origin, scale }
    }
}

impl Projector for OffsetProjector {
    fn project(&self, point: Point) -> Point {
        Point::new(
            (point.x - self.origin.x) * self.scale,
            (point.y - self.origin.y) * self.scale,
        )
    }
}

// ── Wire format ──────────────────────────────────────────────────────

/// A node as it appears in a grid document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridNode {
    pub id: u64,
    pub lon: f64,
    pub lat: f64,
}

/// A polyline through node ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridWay {
    pub nodes: Vec<u64>,
}

/// Serialized grid: the payload a query resolves to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GridDocument {
    #[serde(default)]
    pub name: Option<String>,
    pub nodes: Vec<GridNode>,
    pub ways: Vec<GridWay>,
}

// ── Grid ─────────────────────────────────────────────────────────────

/// Loaded grid content: nodes, ways, and the projected segments derived from them.
pub struct Grid {
    name: Option<String>,
    nodes: HashMap<u64, Point>,
    ways: Vec<Vec<u64>>,
    projector: Option<Rc<dyn Projector>>,
    segments: Vec<Segment>,
    index: SegmentIndex,
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grid")
            .field("name", &self.name)
            .field("nodes", &self.nodes.len())
            .field("ways", &self.ways.len())
            .field("projector", &self.projector)
            .field("segments", &self.segments.len())
            .finish()
    }
}

impl Grid {
    /// Validate a document and build the grid with identity projection.
    pub fn from_document(doc: GridDocument) -> Result<Self, GridError> {
        let mut nodes = HashMap::with_capacity(doc.nodes.len());
        for node in &doc.nodes {
            if nodes.insert(node.id, Point::new(node.lon, node.lat)).is_some() {
                return Err(GridError::DuplicateNode(node.id));
            }
        }
        for (way, w) in doc.ways.iter().enumerate() {
            if let Some(&node) = w.nodes.iter().find(|id| !nodes.contains_key(*id)) {
                return Err(GridError::UnknownNode { way, node });
            }
        }

        let mut grid = Self {
            name: doc.name,
            nodes,
            ways: doc.ways.into_iter().map(|w| w.nodes).collect(),
            projector: None,
            segments: Vec::new(),
            index: SegmentIndex::new(),
        };
        grid.rebuild_segments();
        Ok(grid)
    }

    pub fn from_json(json: &str) -> Result<Self, GridError> {
        let doc: GridDocument = serde_json::from_str(json)?;
        Self::from_document(doc)
    }

    /// Bind a projector. Segments and the spatial index are recomputed in scene space.
    pub fn set_projector(&mut self, projector: Rc<dyn Projector>) {
        self.projector = Some(projector);
        self.rebuild_segments();
    }

    pub fn projector(&self) -> Option<Rc<dyn Projector>> {
        self.projector.clone()
    }

    pub fn has_projector(&self) -> bool {
        self.projector.is_some()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn way_count(&self) -> usize {
        self.ways.len()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Projected bounding box of every node; `None` for an empty grid.
    pub fn bbox(&self) -> Option<BBox> {
        let projected: Vec<Point> = self.nodes.values().map(|p| self.project(*p)).collect();
        BBox::from_points(&projected)
    }

    /// Segments whose bounds intersect `view`, in scene space.
    pub fn segments_in(&self, view: &BBox) -> Vec<&Segment> {
        self.index
            .query_view(view)
            .into_iter()
            .map(|entry| &self.segments[entry.segment_index])
            .collect()
    }

    fn project(&self, point: Point) -> Point {
        match &self.projector {
            Some(projector) => projector.project(point),
            None => point,
        }
    }

    fn rebuild_segments(&mut self) {
        let mut segments = Vec::new();
        for way in &self.ways {
            for pair in way.windows(2) {
                let from = self.project(self.nodes[&pair[0]]);
                let to = self.project(self.nodes[&pair[1]]);
                segments.push(Segment::new(from, to));
            }
        }
        self.index = SegmentIndex::build(&segments);
        self.segments = segments;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_doc() -> GridDocument {
        GridDocument {
            name: Some("square".into()),
            nodes: vec![
                GridNode { id: 1, lon: 10.0, lat: 10.0 },
                GridNode { id: 2, lon: 20.0, lat: 10.0 },
                GridNode { id: 3, lon: 20.0, lat: 20.0 },
                GridNode { id: 4, lon: 10.0, lat: 20.0 },
            ],
            ways: vec![GridWay { nodes: vec![1, 2, 3, 4, 1] }],
        }
    }

    #[test]
    fn test_grid_segments_and_bbox() {
        let grid = Grid::from_document(square_doc()).unwrap();
        assert_eq!(grid.node_count(), 4);
        assert_eq!(grid.way_count(), 1);
        assert_eq!(grid.segments().len(), 4);
        let bb = grid.bbox().unwrap();
        assert_eq!(bb.min, Point::new(10.0, 10.0));
        assert_eq!(bb.max, Point::new(20.0, 20.0));
    }

    #[test]
    fn test_projector_recomputes_segments() {
        let mut grid = Grid::from_document(square_doc()).unwrap();
        grid.set_projector(Rc::new(OffsetProjector::new(Point::new(10.0, 10.0), 2.0)));
        assert!(grid.has_projector());
        let bb = grid.bbox().unwrap();
        assert_eq!(bb.min, Point::new(0.0, 0.0));
        assert_eq!(bb.max, Point::new(20.0, 20.0));

        let view = BBox::new(Point::new(-1.0, -1.0), Point::new(1.0, 1.0));
        // Two edges touch the origin corner.
        assert_eq!(grid.segments_in(&view).len(), 2);
    }

    #[test]
    fn test_unknown_node_rejected() {
        let mut doc = square_doc();
        doc.ways.push(GridWay { nodes: vec![1, 99] });
        let err = Grid::from_document(doc).unwrap_err();
        assert!(matches!(err, GridError::UnknownNode { way: 1, node: 99 }));
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let mut doc = square_doc();
        doc.nodes.push(GridNode { id: 2, lon: 0.0, lat: 0.0 });
        assert!(matches!(
            Grid::from_document(doc),
            Err(GridError::DuplicateNode(2))
        ));
    }

    #[test]
    fn test_from_json() {
        let json = r#"{"nodes":[{"id":1,"lon":0,"lat":0},{"id":2,"lon":1,"lat":1}],"ways":[{"nodes":[1,2]}]}"#;
        let grid = Grid::from_json(json).unwrap();
        assert!(grid.name().is_none());
        assert_eq!(grid.segments().len(), 1);
        assert!(matches!(Grid::from_json("{"), Err(GridError::Json(_))));
    }
}
