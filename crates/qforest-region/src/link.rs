//! Links between adjacent leaves
//!
//! A [`TreeLink`] records one undirected N4 adjacency. Each end has its own
//! [`LinkHead`] holding the angle towards the other end and the edge parser
//! state of that end, so the link can be walked from either side. The
//! forest keeps, per tree, the list of heads that start at it.

use crate::error::{RegionError, RegionResult};
use crate::forest::QuadForest;
use crate::tree::{Direction, TreeId};
use std::collections::HashSet;
use std::f64::consts::PI;

/// End of a link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Side {
    #[default]
    A,
    B,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }
}

/// Reference to one head of a link in the forest's link list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeadRef {
    /// Payload index of the link
    pub link: usize,
    pub side: Side,
}

impl HeadRef {
    /// The head at the opposite end of the same link
    pub fn other(self) -> HeadRef {
        HeadRef {
            link: self.link,
            side: self.side.other(),
        }
    }
}

/// Path costs accumulated by the edge parser at one head
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EdgeParser {
    pub acc_cost: f64,
    pub acc_length: u32,
    pub pool_cost: f64,
    pub pool_length: u32,
}

/// One end of a link
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LinkHead {
    /// Tree at this end
    pub tree: TreeId,
    /// Direction from this end's centre to the other end's, in [0, 2π)
    pub angle: f64,
    /// Half-step cost of crossing the link from this end
    pub cost: f64,
    pub token: u32,
    pub round: u32,
    pub parser: EdgeParser,
}

/// Undirected adjacency between two leaves
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TreeLink {
    pub a: LinkHead,
    pub b: LinkHead,
    /// Boundary strength in [0, 1] after parsing
    pub strength: f64,
}

impl TreeLink {
    pub fn head(&self, side: Side) -> &LinkHead {
        match side {
            Side::A => &self.a,
            Side::B => &self.b,
        }
    }

    pub fn head_mut(&mut self, side: Side) -> &mut LinkHead {
        match side {
            Side::A => &mut self.a,
            Side::B => &mut self.b,
        }
    }
}

/// Angle of the vector (`x`, `y`) measured like edge orientations, in [0, 2π).
pub(crate) fn orientation(x: f64, y: f64) -> f64 {
    let ang = x.atan2(y);
    if ang < 0.0 { ang + 2.0 * PI } else { ang }
}

impl QuadForest {
    /// Rebuild the link list over the current leaves.
    ///
    /// Every pair of N4-adjacent leaves gets exactly one link. Returns the
    /// number of links.
    pub fn create_links(&mut self) -> RegionResult<usize> {
        self.links.clear()?;
        self.heads.clear();
        self.heads.resize(self.trees.payload_slots(), Vec::new());

        let mut seen = HashSet::new();
        for leaf in self.leaves()? {
            for dir in [Direction::East, Direction::South, Direction::West, Direction::North] {
                for other in self.neighbor_leaves(leaf, dir)? {
                    let key = (leaf.min(other), leaf.max(other));
                    if leaf == other || !seen.insert(key) {
                        continue;
                    }
                    self.add_link(leaf, other)?;
                }
            }
        }
        log::debug!("created {} links between {} trees", self.links.len(), self.heads.len());
        Ok(self.links.len())
    }

    fn add_link(&mut self, a: TreeId, b: TreeId) -> RegionResult<()> {
        let (ax, ay) = self.tree(a)?.center();
        let (bx, by) = self.tree(b)?.center();
        let link = TreeLink {
            a: LinkHead {
                tree: a,
                angle: orientation(bx - ax, by - ay),
                ..LinkHead::default()
            },
            b: LinkHead {
                tree: b,
                angle: orientation(ax - bx, ay - by),
                ..LinkHead::default()
            },
            strength: 0.0,
        };
        let item = self.links.append(link)?;
        let index = self.links.payload_index(item)?;
        self.heads[a.0].push(HeadRef { link: index, side: Side::A });
        self.heads[b.0].push(HeadRef { link: index, side: Side::B });
        Ok(())
    }

    /// The link list built by [`create_links`](Self::create_links).
    pub fn links(&self) -> &qforest_core::List<TreeLink> {
        &self.links
    }

    /// Heads starting at a tree, empty before links are created.
    pub fn tree_links(&self, id: TreeId) -> &[HeadRef] {
        self.heads.get(id.0).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn link(&self, index: usize) -> RegionResult<&TreeLink> {
        self.links
            .payload(index)
            .map_err(|_| RegionError::NotFound(format!("link {}", index)))
    }

    pub fn link_head(&self, head: HeadRef) -> RegionResult<&LinkHead> {
        Ok(self.link(head.link)?.head(head.side))
    }

    pub(crate) fn link_head_mut(&mut self, head: HeadRef) -> RegionResult<&mut LinkHead> {
        self.links
            .payload_mut(head.link)
            .map(|link| link.head_mut(head.side))
            .map_err(|_| RegionError::NotFound(format!("link {}", head.link)))
    }
}
