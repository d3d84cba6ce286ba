#![deny(missing_docs)]
#![doc = "Core traits and data types shared by the multispecies-coalescent tree operators."]

use std::iter::ExactSizeIterator;

use serde::{Deserialize, Serialize};

pub mod errors;
pub mod rng;

pub use errors::{ErrorInfo, MscError};
pub use rng::{derive_substream_seed, RngHandle};

/// Identifier for a node within a [`TimeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    /// Creates a new identifier from its raw integer representation.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw integer representation of the identifier.
    pub fn as_raw(&self) -> u64 {
        self.0
    }

    /// Returns the identifier as an index into node arrays.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Structural contract for rooted binary trees whose nodes carry heights.
///
/// Every internal node has exactly two ordered children and must sit at or
/// above both of them. Accessors panic when handed a [`NodeId`] that does not
/// belong to the tree, the same way slice indexing does.
pub trait TimeTree {
    /// Returns the root node.
    fn root(&self) -> NodeId;

    /// Returns the number of nodes (leaves and internal).
    fn node_count(&self) -> usize;

    /// Returns an iterator over all node identifiers.
    fn nodes(&self) -> Box<dyn ExactSizeIterator<Item = NodeId> + '_>;

    /// Returns the `(left, right)` children, or `None` for a leaf.
    fn children(&self, node: NodeId) -> Option<(NodeId, NodeId)>;

    /// Returns the parent node, or `None` for the root.
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Returns the height of a node.
    fn height(&self, node: NodeId) -> f64;

    /// Overwrites the height of a node.
    fn set_height(&mut self, node: NodeId, height: f64);

    /// Returns the taxon label of a node, if any.
    fn label(&self, node: NodeId) -> Option<&str>;

    /// Returns true if the node has no children.
    fn is_leaf(&self, node: NodeId) -> bool {
        self.children(node).is_none()
    }

    /// Returns the left child of an internal node.
    fn left(&self, node: NodeId) -> Option<NodeId> {
        self.children(node).map(|(left, _)| left)
    }

    /// Returns the right child of an internal node.
    fn right(&self, node: NodeId) -> Option<NodeId> {
        self.children(node).map(|(_, right)| right)
    }
}
