//! Quad-tree nodes
//!
//! A [`QuadTree`] describes one square region of the forest's image. Nodes
//! do not own each other: parent, children and the four cardinal neighbors
//! are [`TreeId`]s into the forest's node list, so subdividing a node only
//! rewires ids.

use qforest_core::{Rect, Statistics};
use std::fmt;

/// Index of a node in the forest's node list
///
/// Ids of non-root nodes are invalidated by [`QuadForest::update`] and may
/// be handed out again by later divisions.
///
/// [`QuadForest::update`]: crate::QuadForest::update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TreeId(pub usize);

impl TreeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tree#{}", self.0)
    }
}

/// Cardinal direction of a neighbor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// All directions in N, E, S, W order
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    /// Slot of this direction in [`QuadTree::neighbors`]
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Direction::North => 0,
            Direction::East => 1,
            Direction::South => 2,
            Direction::West => 3,
        }
    }

    /// Child slots (nw = 0, ne = 1, sw = 2, se = 3) facing this direction
    ///
    /// The children of a northern neighbor that face the node below it are
    /// its southern pair, and so on.
    pub fn facing_children(self) -> [usize; 2] {
        match self {
            Direction::North => [2, 3],
            Direction::East => [0, 2],
            Direction::South => [0, 1],
            Direction::West => [1, 3],
        }
    }
}

/// Union-find record of a node
///
/// Every node that takes part in a segmentation carries one. `parent`
/// points at itself for segment roots; only a root's `bounds`, `stat` and
/// `color` describe the whole segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub parent: TreeId,
    pub rank: u32,
    pub bounds: Rect,
    pub stat: Statistics,
    pub color: [u8; 3],
}

/// Edge response of a node and its diffused neighborhood
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Edge {
    /// Horizontal response (left/right contrast)
    pub dx: f64,
    /// Vertical response (top/bottom contrast)
    pub dy: f64,
    pub mag: f64,
    /// Orientation in [0, 2π)
    pub ang: f64,
    pub has_edge: bool,
    /// Neighborhood mean of the diffused measure
    pub mean: f64,
    /// Neighborhood deviation of the diffused measure
    pub deviation: f64,
}

/// Boundary flags and the diffused deviation statistics behind them
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundaryInfo {
    pub has_boundary: bool,
    pub devmean: f64,
    pub devdev: f64,
}

/// Diffused neighborhood statistics of a node
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AccumulatedStat {
    pub meanmean: f64,
    pub meandev: f64,
    pub devmean: f64,
    pub devdev: f64,
    /// Combined normalised strength in [0, 1]
    pub strength: f64,
}

/// Edge parser wavefront marker of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseContext {
    /// Run token, 0 when the node has not been reached
    pub token: u32,
    pub round: u32,
}

/// One square region of the forest
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuadTree {
    pub x: u32,
    pub y: u32,
    pub size: u32,
    /// Depth below the root (roots are level 0)
    pub level: u32,
    pub stat: Statistics,
    pub segment: Option<Segment>,
    pub edge: Edge,
    pub boundary: BoundaryInfo,
    pub accumulated: AccumulatedStat,
    pub context: ParseContext,
    /// nw, ne, sw, se
    pub children: Option<[TreeId; 4]>,
    pub parent: Option<TreeId>,
    /// N, E, S, W
    pub neighbors: [Option<TreeId>; 4],
}

impl QuadTree {
    /// Create a root-level node with no relations.
    pub fn new(x: u32, y: u32, size: u32, level: u32) -> Self {
        Self {
            x,
            y,
            size,
            level,
            ..Self::default()
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    #[inline]
    pub fn neighbor(&self, dir: Direction) -> Option<TreeId> {
        self.neighbors[dir.index()]
    }

    #[inline]
    pub fn set_neighbor(&mut self, dir: Direction, id: Option<TreeId>) {
        self.neighbors[dir.index()] = id;
    }

    /// Extent of the node in image coordinates
    pub fn rect(&self) -> Rect {
        Rect::square(self.x as i32, self.y as i32, self.size as i32)
    }

    /// Centre of the node in image coordinates
    pub fn center(&self) -> (f64, f64) {
        let half = f64::from(self.size) / 2.0;
        (f64::from(self.x) + half, f64::from(self.y) + half)
    }

    /// Forget everything derived from the image, keeping the geometry.
    pub(crate) fn reset(&mut self) {
        self.stat = Statistics::default();
        self.segment = None;
        self.edge = Edge::default();
        self.boundary = BoundaryInfo::default();
        self.accumulated = AccumulatedStat::default();
        self.context = ParseContext::default();
        self.children = None;
    }
}
