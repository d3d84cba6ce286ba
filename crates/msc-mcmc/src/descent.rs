use std::collections::BTreeSet;

use indexmap::IndexSet;
use msc_core::{NodeId, TimeTree};
use tracing::trace;

use crate::accumulator::MinimumAccumulator;

/// How the leaves below a gene-tree node descend through the two children of
/// the species-tree root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Descent {
    /// Every leaf below maps under the left species child.
    LeftOnly,
    /// Every leaf below maps under the right species child.
    RightOnly,
    /// Lineages from both species children have coalesced at or below here.
    Both,
    /// The node is outside (or above) any component tied to the root.
    Neither,
}

/// Classifies gene-tree nodes against the leaf-descendant sets of the
/// species-root children.
///
/// One classifier is built per proposal. Classification threads a connecting
/// node set and a [`MinimumAccumulator`] owned by the caller; nothing is stored
/// on the tree.
#[derive(Debug, Clone, Copy)]
pub struct DescentClassifier<'a> {
    left: &'a BTreeSet<String>,
    right: &'a BTreeSet<String>,
}

impl<'a> DescentClassifier<'a> {
    /// Creates a classifier for the given left and right descendant sets.
    pub fn new(left: &'a BTreeSet<String>, right: &'a BTreeSet<String>) -> Self {
        Self { left, right }
    }

    /// Category of a leaf, from its label alone.
    ///
    /// Labels in both sets count as left. Unlabelled leaves and labels outside
    /// both sets are `Neither`.
    pub fn classify_leaf(&self, label: Option<&str>) -> Descent {
        match label {
            Some(label) if self.left.contains(label) => Descent::LeftOnly,
            Some(label) if self.right.contains(label) => Descent::RightOnly,
            _ => Descent::Neither,
        }
    }

    /// Classifies the subtree below `node`.
    ///
    /// Nodes whose height must follow the species root are inserted into
    /// `connecting` (children before parents, left subtree first), and every
    /// branch separating such a node from a non-moving child is recorded into
    /// `freedom`.
    pub fn classify<T: TimeTree + ?Sized>(
        &self,
        tree: &T,
        node: NodeId,
        connecting: &mut IndexSet<NodeId>,
        freedom: &mut MinimumAccumulator,
    ) -> Descent {
        let mut pending = vec![(node, false)];
        let mut results: Vec<Descent> = Vec::new();

        while let Some((current, expanded)) = pending.pop() {
            match tree.children(current) {
                None => results.push(self.classify_leaf(tree.label(current))),
                Some((left, right)) if !expanded => {
                    pending.push((current, true));
                    pending.push((right, false));
                    pending.push((left, false));
                }
                Some((left, right)) => {
                    let right_descent = results.pop().expect("right child classified");
                    let left_descent = results.pop().expect("left child classified");
                    let descent = self.combine(
                        tree,
                        current,
                        (left, left_descent),
                        (right, right_descent),
                        connecting,
                        freedom,
                    );
                    results.push(descent);
                }
            }
        }

        debug_assert_eq!(results.len(), 1);
        results.pop().expect("root classified")
    }

    fn combine<T: TimeTree + ?Sized>(
        &self,
        tree: &T,
        node: NodeId,
        (left, left_descent): (NodeId, Descent),
        (right, right_descent): (NodeId, Descent),
        connecting: &mut IndexSet<NodeId>,
        freedom: &mut MinimumAccumulator,
    ) -> Descent {
        if left_descent == right_descent {
            if left_descent == Descent::Both {
                connecting.insert(node);
            }
            return left_descent;
        }

        let height = tree.height(node);
        match (left_descent, right_descent) {
            // Above a closed component: the other side never enters the root population.
            (Descent::Both, Descent::Neither) | (Descent::Neither, Descent::Both) => {
                Descent::Neither
            }
            (Descent::Both, _) => {
                freedom.record(height - tree.height(right));
                connecting.insert(node);
                trace!(%node, lineage = %right, "lineage joins connected component");
                Descent::Both
            }
            (_, Descent::Both) => {
                freedom.record(height - tree.height(left));
                connecting.insert(node);
                trace!(%node, lineage = %left, "lineage joins connected component");
                Descent::Both
            }
            (Descent::Neither, _) | (_, Descent::Neither) => Descent::Neither,
            _ => {
                // Youngest coalescence of lineages from the two root clades.
                freedom.record(height - tree.height(left));
                freedom.record(height - tree.height(right));
                connecting.insert(node);
                trace!(%node, "connected component tip");
                Descent::Both
            }
        }
    }
}
