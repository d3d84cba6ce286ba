use msc_core::errors::{ErrorInfo, MscError};
use msc_core::TimeTree;

/// Checks that every height is finite and non-negative and that every internal
/// node sits at or above both of its children.
///
/// Equal heights are accepted; zero-length branches are valid.
pub fn check_heights<T: TimeTree + ?Sized>(tree: &T) -> Result<(), MscError> {
    for node in tree.nodes() {
        let height = tree.height(node);
        if !height.is_finite() || height < 0.0 {
            return Err(MscError::Tree(
                ErrorInfo::new("invalid-height", "heights must be finite and non-negative")
                    .with_context("node", node.to_string())
                    .with_context("height", height.to_string()),
            ));
        }
        if let Some((left, right)) = tree.children(node) {
            for child in [left, right] {
                let child_height = tree.height(child);
                if child_height > height {
                    return Err(MscError::Tree(
                        ErrorInfo::new("height-order", "node lies below one of its children")
                            .with_context("node", node.to_string())
                            .with_context("height", height.to_string())
                            .with_context("child", child.to_string())
                            .with_context("child_height", child_height.to_string()),
                    ));
                }
            }
        }
    }
    Ok(())
}
