use std::collections::BTreeSet;

use msc_core::errors::{ErrorInfo, MscError};
use msc_core::{NodeId, TimeTree};

use crate::validate::check_heights;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NodeRecord {
    pub(crate) label: Option<String>,
    pub(crate) height: f64,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Option<(NodeId, NodeId)>,
}

impl NodeRecord {
    fn leaf(label: String, height: f64) -> Self {
        Self {
            label: Some(label),
            height,
            parent: None,
            children: None,
        }
    }
}

/// Arena-backed rooted binary time tree.
///
/// Nodes are addressed by [`NodeId`]s that index the arena and stay stable for
/// the lifetime of the tree; only heights are mutable after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeImpl {
    nodes: Vec<NodeRecord>,
    root: NodeId,
}

impl TreeImpl {
    /// Validates raw records and assembles a tree from them.
    pub(crate) fn from_records(mut nodes: Vec<NodeRecord>) -> Result<Self, MscError> {
        for node in nodes.iter_mut() {
            node.parent = None;
        }
        for index in 0..nodes.len() {
            let children = nodes[index].children;
            if let Some((left, right)) = children {
                let parent = make_node(index);
                for child in [left, right] {
                    let record = nodes.get_mut(child.index()).ok_or_else(|| {
                        MscError::Tree(
                            ErrorInfo::new("unknown-node", "child refers to a missing node")
                                .with_context("parent", parent.to_string())
                                .with_context("child", child.to_string()),
                        )
                    })?;
                    if record.parent.is_some() || child == parent {
                        return Err(MscError::Tree(
                            ErrorInfo::new("multiple-parents", "node is attached more than once")
                                .with_context("node", child.to_string()),
                        ));
                    }
                    record.parent = Some(parent);
                }
                if left == right {
                    return Err(MscError::Tree(
                        ErrorInfo::new("duplicate-child", "left and right child coincide")
                            .with_context("node", parent.to_string()),
                    ));
                }
            }
        }

        let roots: Vec<usize> = nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(index, _)| index)
            .collect();
        let root = match roots.as_slice() {
            [single] => make_node(*single),
            _ => {
                return Err(MscError::Tree(
                    ErrorInfo::new("root-count", "tree must have exactly one root")
                        .with_context("roots", roots.len().to_string()),
                ))
            }
        };

        let tree = Self { nodes, root };
        let leaves = tree.leaf_count();
        if leaves < 2 {
            return Err(MscError::Tree(
                ErrorInfo::new("too-few-leaves", "tree needs at least two leaves")
                    .with_context("leaves", leaves.to_string()),
            ));
        }
        let mut seen = BTreeSet::new();
        for node in tree.leaves() {
            let label = tree.nodes[node.index()].label.as_deref().ok_or_else(|| {
                MscError::Tree(
                    ErrorInfo::new("unlabelled-leaf", "every leaf must carry a taxon label")
                        .with_context("node", node.to_string()),
                )
            })?;
            if !seen.insert(label) {
                return Err(MscError::Tree(
                    ErrorInfo::new("duplicate-label", "leaf labels must be unique")
                        .with_context("label", label),
                ));
            }
        }
        let reachable = tree.postorder_from(tree.root).len();
        if reachable != tree.nodes.len() {
            return Err(MscError::Tree(
                ErrorInfo::new("unreachable-nodes", "nodes are not connected to the root")
                    .with_context("reachable", reachable.to_string())
                    .with_context("total", tree.nodes.len().to_string()),
            ));
        }
        check_heights(&tree)?;
        Ok(tree)
    }

    pub(crate) fn records(&self) -> &[NodeRecord] {
        &self.nodes
    }

    /// Returns the number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| node.children.is_none())
            .count()
    }

    /// Returns all leaves in arena order.
    pub fn leaves(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.children.is_none())
            .map(|(index, _)| make_node(index))
    }

    /// Returns the leaf carrying `label`, if any.
    pub fn find_leaf(&self, label: &str) -> Option<NodeId> {
        self.leaves()
            .find(|node| self.nodes[node.index()].label.as_deref() == Some(label))
    }

    /// Returns the leaf labels in arena order.
    pub fn leaf_labels(&self) -> Vec<&str> {
        self.leaves()
            .filter_map(|node| self.nodes[node.index()].label.as_deref())
            .collect()
    }

    /// Returns the nodes of the subtree below `node` in post-order.
    pub fn postorder_from(&self, node: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![(node, false)];
        while let Some((current, expanded)) = stack.pop() {
            match (self.nodes[current.index()].children, expanded) {
                (Some((left, right)), false) => {
                    stack.push((current, true));
                    stack.push((right, false));
                    stack.push((left, false));
                }
                _ => order.push(current),
            }
        }
        order
    }

    /// Returns the length of the branch above `node` (zero for the root).
    pub fn branch_length(&self, node: NodeId) -> f64 {
        match self.nodes[node.index()].parent {
            Some(parent) => self.nodes[parent.index()].height - self.nodes[node.index()].height,
            None => 0.0,
        }
    }
}

impl TimeTree for TreeImpl {
    fn root(&self) -> NodeId {
        self.root
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn nodes(&self) -> Box<dyn ExactSizeIterator<Item = NodeId> + '_> {
        Box::new((0..self.nodes.len()).map(make_node))
    }

    fn children(&self, node: NodeId) -> Option<(NodeId, NodeId)> {
        self.nodes[node.index()].children
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.index()].parent
    }

    fn height(&self, node: NodeId) -> f64 {
        self.nodes[node.index()].height
    }

    fn set_height(&mut self, node: NodeId, height: f64) {
        self.nodes[node.index()].height = height;
    }

    fn label(&self, node: NodeId) -> Option<&str> {
        self.nodes[node.index()].label.as_deref()
    }
}

/// Incremental constructor for [`TreeImpl`].
///
/// Leaves are added first and joined pairwise; [`TreeBuilder::build`] checks
/// the result is a single binary tree with consistent heights.
#[derive(Debug, Default, Clone)]
pub struct TreeBuilder {
    nodes: Vec<NodeRecord>,
}

impl TreeBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a leaf with the given taxon label and height.
    pub fn leaf(&mut self, label: impl Into<String>, height: f64) -> NodeId {
        self.nodes.push(NodeRecord::leaf(label.into(), height));
        make_node(self.nodes.len() - 1)
    }

    /// Joins two existing nodes under a new internal node at `height`.
    pub fn join(&mut self, left: NodeId, right: NodeId, height: f64) -> Result<NodeId, MscError> {
        for child in [left, right] {
            let record = self.nodes.get(child.index()).ok_or_else(|| {
                MscError::Tree(
                    ErrorInfo::new("unknown-node", "cannot join a node that was never added")
                        .with_context("node", child.to_string()),
                )
            })?;
            if record.parent.is_some() {
                return Err(MscError::Tree(
                    ErrorInfo::new("multiple-parents", "node already has a parent")
                        .with_context("node", child.to_string()),
                ));
            }
        }
        if left == right {
            return Err(MscError::Tree(
                ErrorInfo::new("duplicate-child", "cannot join a node with itself")
                    .with_context("node", left.to_string()),
            ));
        }
        let id = make_node(self.nodes.len());
        self.nodes[left.index()].parent = Some(id);
        self.nodes[right.index()].parent = Some(id);
        self.nodes.push(NodeRecord {
            label: None,
            height,
            parent: None,
            children: Some((left, right)),
        });
        Ok(id)
    }

    /// Sets an optional label on an internal node.
    pub fn set_label(&mut self, node: NodeId, label: impl Into<String>) {
        if let Some(record) = self.nodes.get_mut(node.index()) {
            record.label = Some(label.into());
        }
    }

    /// Validates and returns the finished tree.
    pub fn build(self) -> Result<TreeImpl, MscError> {
        TreeImpl::from_records(self.nodes)
    }
}

pub(crate) fn make_node(index: usize) -> NodeId {
    NodeId::from_raw(index as u64)
}
