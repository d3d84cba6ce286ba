use msc_core::errors::{ErrorInfo, MscError};
use msc_core::TimeTree;
use serde::{Deserialize, Serialize};

/// Copy of every node height of one tree, indexed by node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightSnapshot {
    heights: Vec<f64>,
}

impl HeightSnapshot {
    /// Records the current heights of `tree`.
    pub fn capture<T: TimeTree + ?Sized>(tree: &T) -> Self {
        let mut heights = vec![0.0; tree.node_count()];
        for node in tree.nodes() {
            heights[node.index()] = tree.height(node);
        }
        Self { heights }
    }

    /// Writes the recorded heights back into `tree`.
    pub fn restore<T: TimeTree + ?Sized>(&self, tree: &mut T) -> Result<(), MscError> {
        if tree.node_count() != self.heights.len() {
            return Err(MscError::Tree(
                ErrorInfo::new("snapshot-mismatch", "snapshot taken from a different tree")
                    .with_context("snapshot_nodes", self.heights.len().to_string())
                    .with_context("tree_nodes", tree.node_count().to_string()),
            ));
        }
        let nodes: Vec<_> = tree.nodes().collect();
        for node in nodes {
            tree.set_height(node, self.heights[node.index()]);
        }
        Ok(())
    }

    /// Returns the recorded heights.
    pub fn heights(&self) -> &[f64] {
        &self.heights
    }
}
