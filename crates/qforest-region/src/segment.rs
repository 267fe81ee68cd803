//! Union-find over quad-tree nodes
//!
//! Each participating node carries a [`Segment`] record whose `parent`
//! leads towards the segment root. Unions attach the lower-ranked root
//! below the higher-ranked one and fold the bounding box and statistics of
//! the absorbed segment into the surviving root.

use crate::error::{RegionError, RegionResult};
use crate::forest::QuadForest;
use crate::tree::{Segment, TreeId};

impl QuadForest {
    /// Give a node a fresh singleton segment covering itself.
    pub fn create_segment(&mut self, id: TreeId) -> RegionResult<()> {
        let tree = self.tree_mut(id)?;
        tree.segment = Some(Segment {
            parent: id,
            rank: 0,
            bounds: tree.rect(),
            stat: tree.stat,
            color: [0; 3],
        });
        Ok(())
    }

    fn segment_record(&self, id: TreeId) -> RegionResult<Option<Segment>> {
        Ok(self.tree(id)?.segment)
    }

    /// Find the segment root of a node, compressing the path behind it.
    ///
    /// Returns `None` for nodes without a segment.
    pub fn find_segment(&mut self, id: TreeId) -> RegionResult<Option<TreeId>> {
        let Some(root) = self.segment_of(id)? else {
            return Ok(None);
        };
        let mut current = id;
        while current != root {
            let tree = self.tree_mut(current)?;
            let Some(segment) = tree.segment.as_mut() else {
                break;
            };
            let next = segment.parent;
            segment.parent = root;
            current = next;
        }
        Ok(Some(root))
    }

    /// Find the segment root of a node without modifying the forest.
    pub fn segment_of(&self, id: TreeId) -> RegionResult<Option<TreeId>> {
        let mut current = id;
        let mut steps = 0usize;
        loop {
            let Some(segment) = self.segment_record(current)? else {
                return Ok(None);
            };
            if segment.parent == current {
                return Ok(Some(current));
            }
            current = segment.parent;
            steps += 1;
            if steps > self.trees.len() {
                return Err(RegionError::InvalidState(format!(
                    "segment chain from {} does not terminate",
                    id
                )));
            }
        }
    }

    /// Check whether a node is the root of its segment.
    pub fn is_segment_root(&self, id: TreeId) -> RegionResult<bool> {
        Ok(self
            .segment_record(id)?
            .is_some_and(|segment| segment.parent == id))
    }

    /// The segment record of the root a node belongs to.
    pub fn segment(&self, id: TreeId) -> RegionResult<Option<Segment>> {
        match self.segment_of(id)? {
            Some(root) => self.segment_record(root),
            None => Ok(None),
        }
    }

    /// Merge the segments of two nodes and return the surviving root.
    ///
    /// The root of lower rank goes below the other; on equal ranks the
    /// second goes below the first, whose rank grows by one.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::InvalidState`] if either node has no segment.
    pub fn union_segments(&mut self, a: TreeId, b: TreeId) -> RegionResult<TreeId> {
        let (Some(root_a), Some(root_b)) = (self.find_segment(a)?, self.find_segment(b)?) else {
            return Err(RegionError::InvalidState(format!(
                "cannot union {} and {}: node without segment",
                a, b
            )));
        };
        if root_a == root_b {
            return Ok(root_a);
        }
        let seg_a = self.expect_segment(root_a)?;
        let seg_b = self.expect_segment(root_b)?;

        let (winner, loser, bump) = if seg_a.rank < seg_b.rank {
            (root_b, root_a, false)
        } else if seg_a.rank > seg_b.rank {
            (root_a, root_b, false)
        } else {
            (root_a, root_b, true)
        };
        let absorbed = if winner == root_a { seg_b } else { seg_a };

        if let Some(segment) = self.tree_mut(loser)?.segment.as_mut() {
            segment.parent = winner;
        }
        if let Some(segment) = self.tree_mut(winner)?.segment.as_mut() {
            segment.bounds = segment.bounds.union(&absorbed.bounds);
            segment.stat.merge_assign(&absorbed.stat);
            if bump {
                segment.rank += 1;
            }
        }
        Ok(winner)
    }

    fn expect_segment(&self, id: TreeId) -> RegionResult<Segment> {
        self.segment_record(id)?
            .ok_or_else(|| RegionError::InvalidState(format!("{} has no segment", id)))
    }
}
