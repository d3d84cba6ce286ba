#![deny(missing_docs)]

//! Arena-backed binary time trees implementing the `msc-core` contracts.

mod hash;
pub mod newick;
mod serialization;
mod snapshot;
mod taxa;
mod tree;
mod validate;

pub use hash::canonical_hash;
pub use serialization::{tree_from_json, tree_to_json, trees_from_json, trees_to_json};
pub use snapshot::HeightSnapshot;
pub use taxa::{leaf_descendants, TaxonMap};
pub use tree::{TreeBuilder, TreeImpl};
pub use validate::check_heights;
