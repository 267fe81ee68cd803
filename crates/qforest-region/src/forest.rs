//! Quad-forest - a grid of quad-trees over one image
//!
//! The forest tiles the image with `rows x cols` root trees of side
//! `tree_max_size`, centred so that the uncovered margin is split evenly
//! (`dx`, `dy`). Roots can be divided down to `tree_min_size`. Every node
//! lives in one [`List<QuadTree>`]; roots come first, descendants follow in
//! creation order, and a node's [`TreeId`] is its payload index.
//!
//! # Frame lifecycle
//!
//! ```text
//! new(image) ─► update(frame) ─► divide / segment / diffuse ─► update(next frame) ...
//! ```
//!
//! [`QuadForest::update`] throws every non-root node back onto the list's
//! free list, so ids of divided nodes do not survive a frame.

use crate::error::{RegionError, RegionResult};
use crate::link::{HeadRef, TreeLink};
use crate::tree::{Direction, QuadTree, TreeId};
use qforest_core::{Image, IntegralImage, Item, List, Statistics};

/// Largest block the node list reserves at once
const MAX_NODE_BLOCK: usize = 1 << 16;

/// Tiling options of a forest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForestOptions {
    /// Side of the root trees, a power of two
    pub tree_max_size: u32,
    /// Smallest side a division may produce, a power of two
    pub tree_min_size: u32,
}

impl Default for ForestOptions {
    fn default() -> Self {
        Self {
            tree_max_size: 16,
            tree_min_size: 4,
        }
    }
}

impl ForestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the root tree size
    pub fn with_tree_max_size(mut self, size: u32) -> Self {
        self.tree_max_size = size;
        self
    }

    /// Set the minimum tree size
    pub fn with_tree_min_size(mut self, size: u32) -> Self {
        self.tree_min_size = size;
        self
    }

    /// Check the sizes against each other and against an image size.
    pub fn validate(&self, width: u32, height: u32) -> RegionResult<()> {
        if self.tree_min_size < 1 {
            return Err(RegionError::InvalidParameters(
                "tree_min_size must be at least 1".to_string(),
            ));
        }
        if !self.tree_min_size.is_power_of_two() || !self.tree_max_size.is_power_of_two() {
            return Err(RegionError::InvalidParameters(format!(
                "tree sizes must be powers of two: min={}, max={}",
                self.tree_min_size, self.tree_max_size
            )));
        }
        if self.tree_min_size > self.tree_max_size {
            return Err(RegionError::InvalidParameters(format!(
                "tree_min_size {} exceeds tree_max_size {}",
                self.tree_min_size, self.tree_max_size
            )));
        }
        if self.tree_max_size > width.min(height) {
            return Err(RegionError::InvalidParameters(format!(
                "tree_max_size {} does not fit a {}x{} image",
                self.tree_max_size, width, height
            )));
        }
        Ok(())
    }
}

/// Grid of quad-trees over one image
#[derive(Debug, Clone)]
pub struct QuadForest {
    width: u32,
    height: u32,
    rows: u32,
    cols: u32,
    dx: u32,
    dy: u32,
    tree_max_size: u32,
    tree_min_size: u32,
    source: Image,
    integral: IntegralImage,
    pub(crate) trees: List<QuadTree>,
    roots: Vec<TreeId>,
    last_root: Item,
    pub(crate) links: List<TreeLink>,
    /// Link heads of each tree, indexed by tree id
    pub(crate) heads: Vec<Vec<HeadRef>>,
    pub(crate) segments: usize,
}

impl QuadForest {
    /// Tile `image` with root trees and run the first [`update`](Self::update).
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::InvalidParameters`] if the options do not
    /// satisfy `1 <= min <= max <= min(width, height)` with both sizes
    /// powers of two.
    ///
    /// # Examples
    ///
    /// ```
    /// use qforest_core::Image;
    /// use qforest_region::{ForestOptions, QuadForest};
    ///
    /// let image = Image::new(40, 24).unwrap();
    /// let options = ForestOptions::new().with_tree_max_size(8).with_tree_min_size(2);
    /// let forest = QuadForest::new(&image, &options).unwrap();
    /// assert_eq!((forest.rows(), forest.cols()), (3, 5));
    /// assert_eq!(forest.roots().len(), 15);
    /// ```
    pub fn new(image: &Image, options: &ForestOptions) -> RegionResult<Self> {
        let (width, height) = (image.width(), image.height());
        options.validate(width, height)?;

        let max = options.tree_max_size;
        let min = options.tree_min_size;
        let rows = height / max;
        let cols = width / max;
        let dx = (width - cols * max) / 2;
        let dy = (height - rows * max) / 2;

        // a fully divided root holds 1 + 4 + 16 + ... nodes
        let mut per_root = 0usize;
        let mut level_count = 1usize;
        let mut size = max;
        while size >= min {
            per_root = per_root.saturating_add(level_count);
            level_count = level_count.saturating_mul(4);
            size /= 2;
        }
        let root_count = rows as usize * cols as usize;
        let block = root_count.saturating_mul(per_root).clamp(16, MAX_NODE_BLOCK);

        let mut trees = List::new(block)?;
        let mut roots = Vec::with_capacity(root_count);
        let mut last_root = trees.head();
        for row in 0..rows {
            for col in 0..cols {
                let tree = QuadTree::new(dx + col * max, dy + row * max, max, 0);
                last_root = trees.append(tree)?;
                roots.push(TreeId(trees.payload_index(last_root)?));
            }
        }
        for row in 0..rows as usize {
            for col in 0..cols as usize {
                let id = roots[row * cols as usize + col];
                let at = |r: usize, c: usize| roots[r * cols as usize + c];
                let tree = trees.payload_mut(id.0)?;
                tree.set_neighbor(Direction::North, (row > 0).then(|| at(row - 1, col)));
                tree.set_neighbor(
                    Direction::East,
                    (col + 1 < cols as usize).then(|| at(row, col + 1)),
                );
                tree.set_neighbor(
                    Direction::South,
                    (row + 1 < rows as usize).then(|| at(row + 1, col)),
                );
                tree.set_neighbor(Direction::West, (col > 0).then(|| at(row, col - 1)));
            }
        }

        let mut forest = Self {
            width,
            height,
            rows,
            cols,
            dx,
            dy,
            tree_max_size: max,
            tree_min_size: min,
            source: image.clone(),
            integral: IntegralImage::new(image),
            trees,
            roots,
            last_root,
            links: List::new(block.saturating_mul(2).min(MAX_NODE_BLOCK))?,
            heads: Vec::new(),
            segments: 0,
        };
        log::debug!(
            "created {}x{} forest of {} roots (size {}..{}) over {}x{} image",
            cols,
            rows,
            root_count,
            min,
            max,
            width,
            height
        );
        forest.update(image)?;
        Ok(forest)
    }

    /// Re-create the tiling if the image size or tree sizes changed, then
    /// update from `image`.
    pub fn reload(&mut self, image: &Image, options: &ForestOptions) -> RegionResult<()> {
        let same_size = image.width() == self.width && image.height() == self.height;
        let same_options = options.tree_max_size == self.tree_max_size
            && options.tree_min_size == self.tree_min_size;
        if same_size && same_options {
            return self.update(image);
        }
        *self = Self::new(image, options)?;
        Ok(())
    }

    /// Load a new frame of the same size.
    ///
    /// Rebuilds the integral image, discards all divisions and links, and
    /// gives every root fresh statistics and a singleton segment.
    ///
    /// # Errors
    ///
    /// Returns a core `DimensionMismatch` error if the frame size differs.
    pub fn update(&mut self, image: &Image) -> RegionResult<()> {
        if !image.sizes_equal(&self.source) {
            return Err(qforest_core::Error::DimensionMismatch {
                expected: (self.width, self.height),
                actual: (image.width(), image.height()),
            }
            .into());
        }
        self.source = image.clone();
        self.integral.update(&self.source)?;

        let discarded = self.trees.remove_rest(self.last_root)?;
        self.links.clear()?;
        self.heads.clear();
        self.segments = 0;

        for i in 0..self.roots.len() {
            let id = self.roots[i];
            let (x, y, size) = {
                let tree = self.tree(id)?;
                (tree.x, tree.y, tree.size)
            };
            let stat = self.integral.statistics(x, y, size, size)?;
            let tree = self.tree_mut(id)?;
            tree.reset();
            tree.stat = stat;
            self.create_segment(id)?;
        }
        log::debug!(
            "updated forest: {} roots, {} divided nodes discarded",
            self.roots.len(),
            discarded
        );
        Ok(())
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn rows(&self) -> u32 {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> u32 {
        self.cols
    }

    /// Horizontal margin left of the first root column
    #[inline]
    pub fn dx(&self) -> u32 {
        self.dx
    }

    /// Vertical margin above the first root row
    #[inline]
    pub fn dy(&self) -> u32 {
        self.dy
    }

    #[inline]
    pub fn tree_max_size(&self) -> u32 {
        self.tree_max_size
    }

    #[inline]
    pub fn tree_min_size(&self) -> u32 {
        self.tree_min_size
    }

    /// The frame loaded by the last update
    pub fn source(&self) -> &Image {
        &self.source
    }

    pub fn integral(&self) -> &IntegralImage {
        &self.integral
    }

    /// The node list, for use with sublists of tree ids
    pub fn trees(&self) -> &List<QuadTree> {
        &self.trees
    }

    /// Root trees in row-major order
    pub fn roots(&self) -> &[TreeId] {
        &self.roots
    }

    /// Number of nodes, divided ones included
    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Root at grid position (row, col)
    pub fn root_at(&self, row: u32, col: u32) -> Option<TreeId> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.roots.get((row * self.cols + col) as usize).copied()
    }

    /// Get a node.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::NotFound`] for an id that is not a live node.
    pub fn tree(&self, id: TreeId) -> RegionResult<&QuadTree> {
        self.trees
            .payload(id.0)
            .map_err(|_| RegionError::NotFound(format!("{} is not a live tree", id)))
    }

    /// Get a node mutably.
    pub fn tree_mut(&mut self, id: TreeId) -> RegionResult<&mut QuadTree> {
        self.trees
            .payload_mut(id.0)
            .map_err(|_| RegionError::NotFound(format!("{} is not a live tree", id)))
    }

    /// All node ids in list order.
    pub fn tree_ids(&self) -> RegionResult<Vec<TreeId>> {
        self.trees
            .items()
            .map(|item| Ok(TreeId(self.trees.payload_index(item)?)))
            .collect()
    }

    /// Ids of all undivided nodes in list order.
    pub fn leaves(&self) -> RegionResult<Vec<TreeId>> {
        let mut leaves = Vec::new();
        for item in self.trees.items() {
            let index = self.trees.payload_index(item)?;
            if self.trees.payload(index)?.is_leaf() {
                leaves.push(TreeId(index));
            }
        }
        Ok(leaves)
    }

    /// Statistics of the four would-be children of a node, in nw, ne, sw,
    /// se order.
    pub fn child_statistics(&self, id: TreeId) -> RegionResult<[Statistics; 4]> {
        let tree = self.tree(id)?;
        let half = tree.size / 2;
        if half == 0 {
            return Err(RegionError::InvalidState(format!(
                "{} of size {} has no children",
                id, tree.size
            )));
        }
        let corners = [
            (tree.x, tree.y),
            (tree.x + half, tree.y),
            (tree.x, tree.y + half),
            (tree.x + half, tree.y + half),
        ];
        let mut stats = [Statistics::default(); 4];
        for (stat, &(x, y)) in stats.iter_mut().zip(corners.iter()) {
            *stat = if half >= 2 {
                self.integral.statistics(x, y, half, half)?
            } else {
                let value = self.source.get_pixel(x, y).ok_or_else(|| {
                    RegionError::InvalidState(format!("pixel ({}, {}) outside the image", x, y))
                })?;
                Statistics::single(f64::from(value))
            };
        }
        Ok(stats)
    }

    /// Divide a leaf into four children of half its size.
    ///
    /// Dividing an already divided node returns its children unchanged.
    /// The node loses its segment; the children start without one.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::InvalidState`] if the children would be
    /// smaller than `tree_min_size`.
    pub fn divide(&mut self, id: TreeId) -> RegionResult<[TreeId; 4]> {
        let tree = self.tree(id)?;
        if let Some(children) = tree.children {
            return Ok(children);
        }
        if tree.size < 2 * self.tree_min_size {
            return Err(RegionError::InvalidState(format!(
                "{} of size {} cannot be divided below the minimum size {}",
                id, tree.size, self.tree_min_size
            )));
        }
        let (x, y, half, level) = (tree.x, tree.y, tree.size / 2, tree.level + 1);
        let stats = self.child_statistics(id)?;
        let corners = [(x, y), (x + half, y), (x, y + half), (x + half, y + half)];

        let mut children = [TreeId(0); 4];
        for (slot, (&(cx, cy), stat)) in corners.iter().zip(stats).enumerate() {
            let mut child = QuadTree::new(cx, cy, half, level);
            child.stat = stat;
            child.parent = Some(id);
            let item = self.trees.append(child)?;
            children[slot] = TreeId(self.trees.payload_index(item)?);
        }

        let tree = self.tree_mut(id)?;
        tree.children = Some(children);
        tree.segment = None;
        self.cache_neighbors(id, children)?;
        Ok(children)
    }

    /// Wire the neighbor slots of freshly created children.
    ///
    /// Siblings link to each other; an outward side links to the facing
    /// child of the parent's neighbor when that neighbor is divided (and
    /// rewrites the back-links of that child and its descendants along the
    /// shared side), otherwise to the neighbor itself.
    fn cache_neighbors(&mut self, parent: TreeId, children: [TreeId; 4]) -> RegionResult<()> {
        use Direction::*;
        let [nw, ne, sw, se] = children;
        let siblings = [
            (nw, East, ne),
            (nw, South, sw),
            (ne, West, nw),
            (ne, South, se),
            (sw, East, se),
            (sw, North, nw),
            (se, West, sw),
            (se, North, ne),
        ];
        for (child, dir, sibling) in siblings {
            self.tree_mut(child)?.set_neighbor(dir, Some(sibling));
        }

        let outward = [
            (0, North),
            (0, West),
            (1, North),
            (1, East),
            (2, South),
            (2, West),
            (3, South),
            (3, East),
        ];
        let parent_neighbors = self.tree(parent)?.neighbors;
        for (slot, dir) in outward {
            let child = children[slot];
            let target = match parent_neighbors[dir.index()] {
                None => None,
                Some(neighbor) => match self.tree(neighbor)?.children {
                    Some(grandchildren) => {
                        // mirror the slot across the shared side
                        let mirrored = match dir {
                            North | South => slot ^ 2,
                            East | West => slot ^ 1,
                        };
                        let facing = grandchildren[mirrored];
                        self.repoint_facing(facing, dir, parent, child)?;
                        Some(facing)
                    }
                    None => Some(neighbor),
                },
            };
            self.tree_mut(child)?.set_neighbor(dir, target);
        }
        Ok(())
    }

    /// Point `node` and its descendants along its `dir.opposite()` side at
    /// `to` wherever they still point at `from`.
    ///
    /// The descendants were wired while `from` was undivided, so every one
    /// touching the shared side holds `from` as its neighbor.
    fn repoint_facing(
        &mut self,
        node: TreeId,
        dir: Direction,
        from: TreeId,
        to: TreeId,
    ) -> RegionResult<()> {
        let back = dir.opposite();
        let tree = self.tree_mut(node)?;
        if tree.neighbor(back) == Some(from) {
            tree.set_neighbor(back, Some(to));
        }
        let children = tree.children;
        if let Some(children) = children {
            for slot in dir.facing_children() {
                self.repoint_facing(children[slot], dir, from, to)?;
            }
        }
        Ok(())
    }

    /// Leaves adjacent to a node on one side.
    ///
    /// When the cached neighbor is divided, its descendants facing the node
    /// are collected recursively.
    pub fn neighbor_leaves(&self, id: TreeId, dir: Direction) -> RegionResult<Vec<TreeId>> {
        let mut leaves = Vec::new();
        if let Some(neighbor) = self.tree(id)?.neighbor(dir) {
            self.collect_facing(neighbor, dir, &mut leaves)?;
        }
        Ok(leaves)
    }

    fn collect_facing(&self, id: TreeId, dir: Direction, out: &mut Vec<TreeId>) -> RegionResult<()> {
        match self.tree(id)?.children {
            None => out.push(id),
            Some(children) => {
                for slot in dir.facing_children() {
                    self.collect_facing(children[slot], dir, out)?;
                }
            }
        }
        Ok(())
    }

    /// All N4 leaf neighbors of a node, in N, E, S, W order.
    pub fn leaf_neighbors(&self, id: TreeId) -> RegionResult<Vec<TreeId>> {
        let mut leaves = Vec::new();
        for dir in Direction::ALL {
            leaves.extend(self.neighbor_leaves(id, dir)?);
        }
        Ok(leaves)
    }

    /// Statistics of the square around a node grown by `multiplier * size`
    /// on every side, clipped to the image.
    pub fn neighborhood_statistics(&self, id: TreeId, multiplier: f64) -> RegionResult<Statistics> {
        if !(multiplier >= 0.0) {
            return Err(RegionError::InvalidParameters(format!(
                "neighborhood multiplier must be non-negative, got {}",
                multiplier
            )));
        }
        let tree = self.tree(id)?;
        let grow = (multiplier * f64::from(tree.size)).round() as i64;
        let side = i64::from(tree.size) + 2 * grow;
        Ok(self.integral.statistics_clipped(
            i64::from(tree.x) - grow,
            i64::from(tree.y) - grow,
            side,
            side,
        ))
    }
}
