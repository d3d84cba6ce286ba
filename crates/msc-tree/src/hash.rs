use msc_core::TimeTree;
use sha2::{Digest, Sha256};

/// Computes a structural hash over topology, labels and exact height bits.
///
/// Nodes are visited in post-order from the root, so the hash does not depend
/// on arena layout but does distinguish left from right children.
pub fn canonical_hash<T: TimeTree + ?Sized>(tree: &T) -> String {
    let mut hasher = Sha256::new();
    hasher.update((tree.node_count() as u64).to_le_bytes());

    let mut stack = vec![(tree.root(), false)];
    while let Some((node, expanded)) = stack.pop() {
        match (tree.children(node), expanded) {
            (Some((left, right)), false) => {
                stack.push((node, true));
                stack.push((right, false));
                stack.push((left, false));
            }
            (children, _) => {
                if children.is_some() {
                    hasher.update(b"internal");
                } else {
                    hasher.update(b"leaf");
                }
                match tree.label(node) {
                    Some(label) => {
                        hasher.update((label.len() as u64).to_le_bytes());
                        hasher.update(label.as_bytes());
                    }
                    None => hasher.update(b":none"),
                }
                hasher.update(tree.height(node).to_bits().to_le_bytes());
            }
        }
    }

    format!("{:x}", hasher.finalize())
}
