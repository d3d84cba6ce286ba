use msc_core::errors::{ErrorInfo, MscError};
use msc_core::NodeId;
use serde::{Deserialize, Serialize};

use crate::tree::{NodeRecord, TreeImpl};

/// Serializes the tree to a JSON string.
pub fn tree_to_json(tree: &TreeImpl) -> Result<String, MscError> {
    let serializable = SerializableTree::from_tree(tree);
    serde_json::to_string_pretty(&serializable)
        .map_err(|err| MscError::Serde(ErrorInfo::new("serialize-json", err.to_string())))
}

/// Restores and validates a tree from a JSON string.
pub fn tree_from_json(json: &str) -> Result<TreeImpl, MscError> {
    let serializable: SerializableTree = serde_json::from_str(json)
        .map_err(|err| MscError::Serde(ErrorInfo::new("deserialize-json", err.to_string())))?;
    serializable.into_tree()
}

/// Serializes a list of trees, such as a gene-tree set, to a JSON array.
pub fn trees_to_json(trees: &[TreeImpl]) -> Result<String, MscError> {
    let serializable: Vec<SerializableTree> =
        trees.iter().map(SerializableTree::from_tree).collect();
    serde_json::to_string_pretty(&serializable)
        .map_err(|err| MscError::Serde(ErrorInfo::new("serialize-json", err.to_string())))
}

/// Restores a JSON array of trees, validating each one.
///
/// A failing tree is reported with its position under `tree_index`.
pub fn trees_from_json(json: &str) -> Result<Vec<TreeImpl>, MscError> {
    let serializable: Vec<SerializableTree> = serde_json::from_str(json)
        .map_err(|err| MscError::Serde(ErrorInfo::new("deserialize-json", err.to_string())))?;
    serializable
        .into_iter()
        .enumerate()
        .map(|(index, tree)| {
            tree.into_tree()
                .map_err(|err| err.with_context("tree_index", index.to_string()))
        })
        .collect()
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializableTree {
    nodes: Vec<SerializableNode>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializableNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    children: Option<[u64; 2]>,
}

impl SerializableTree {
    fn from_tree(tree: &TreeImpl) -> Self {
        let nodes = tree
            .records()
            .iter()
            .map(|record| SerializableNode {
                label: record.label.clone(),
                height: record.height,
                children: record
                    .children
                    .map(|(left, right)| [left.as_raw(), right.as_raw()]),
            })
            .collect();
        Self { nodes }
    }

    fn into_tree(self) -> Result<TreeImpl, MscError> {
        let records = self
            .nodes
            .into_iter()
            .map(|node| NodeRecord {
                label: node.label,
                height: node.height,
                parent: None,
                children: node
                    .children
                    .map(|[left, right]| (NodeId::from_raw(left), NodeId::from_raw(right))),
            })
            .collect();
        TreeImpl::from_records(records)
    }
}
