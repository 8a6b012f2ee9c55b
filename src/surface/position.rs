//! Surface positions and ranges
//!
//! Boundary points in the surface tree, DOM style: a container node and an
//! offset. Inside a text node the offset counts characters; inside an
//! element it counts children (offset `k` is the gap before child `k`).

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::node::NodePath;

/// A boundary point in the surface tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfacePosition {
    /// Path from the root to the container node (empty = the root)
    pub container: NodePath,
    pub offset: usize,
}

impl SurfacePosition {
    pub fn new(container: NodePath, offset: usize) -> Self {
        Self { container, offset }
    }

    /// A gap between two top-level nodes
    pub fn in_root(offset: usize) -> Self {
        Self { container: Vec::new(), offset }
    }

    /// Document-order key: the container path followed by the offset
    ///
    /// Lexicographic order over this key is document order for every pair
    /// of boundary points, whether the containers are text or elements.
    fn order_key(&self) -> impl Iterator<Item = usize> + '_ {
        self.container.iter().copied().chain(std::iter::once(self.offset))
    }
}

impl Ord for SurfacePosition {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order_key().cmp(other.order_key())
    }
}

impl PartialOrd for SurfacePosition {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Selection state (anchor + focus)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceRange {
    /// Where the selection started
    pub anchor: SurfacePosition,
    /// Where the selection currently ends (the caret)
    pub focus: SurfacePosition,
}

impl SurfaceRange {
    pub fn new(anchor: SurfacePosition, focus: SurfacePosition) -> Self {
        Self { anchor, focus }
    }

    /// Create a collapsed selection (caret only)
    pub fn collapsed(pos: SurfacePosition) -> Self {
        Self {
            anchor: pos.clone(),
            focus: pos,
        }
    }

    /// Check if selection is collapsed (anchor == focus)
    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// The earlier of anchor and focus
    pub fn start(&self) -> &SurfacePosition {
        std::cmp::min(&self.anchor, &self.focus)
    }

    /// The later of anchor and focus
    pub fn end(&self) -> &SurfacePosition {
        std::cmp::max(&self.anchor, &self.focus)
    }
}
