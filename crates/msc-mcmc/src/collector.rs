use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexSet;
use msc_core::errors::{ErrorInfo, MscError};
use msc_core::{NodeId, TimeTree};
use msc_tree::{leaf_descendants, TaxonMap};

use crate::accumulator::MinimumAccumulator;
use crate::descent::DescentClassifier;

/// Gene-tree nodes tied to the species-root height, keyed by gene-tree index.
///
/// Gene trees without any connecting node have no entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectingNodes {
    by_gene_tree: BTreeMap<usize, IndexSet<NodeId>>,
}

impl ConnectingNodes {
    /// Adds every node of `nodes` under gene tree `gene_tree`.
    pub fn put_all(&mut self, gene_tree: usize, nodes: IndexSet<NodeId>) {
        if nodes.is_empty() {
            return;
        }
        self.by_gene_tree
            .entry(gene_tree)
            .or_default()
            .extend(nodes);
    }

    /// Returns the connecting nodes of one gene tree.
    pub fn get(&self, gene_tree: usize) -> Option<&IndexSet<NodeId>> {
        self.by_gene_tree.get(&gene_tree)
    }

    /// Iterates over `(gene tree index, node)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, NodeId)> + '_ {
        self.by_gene_tree
            .iter()
            .flat_map(|(&gene_tree, nodes)| nodes.iter().map(move |&node| (gene_tree, node)))
    }

    /// Total number of connecting nodes across all gene trees.
    pub fn len(&self) -> usize {
        self.by_gene_tree.values().map(IndexSet::len).sum()
    }

    /// Returns true if no gene tree contributed a connecting node.
    pub fn is_empty(&self) -> bool {
        self.by_gene_tree.is_empty()
    }
}

/// Leaf-descendant sets of the two children of a species-tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootClades {
    /// Gene taxa under the left child.
    pub left: BTreeSet<String>,
    /// Gene taxa under the right child.
    pub right: BTreeSet<String>,
}

impl RootClades {
    /// Computes the clades below the species-tree root.
    pub fn of_root<S: TimeTree + ?Sized>(
        species_tree: &S,
        taxa: &TaxonMap,
    ) -> Result<Self, MscError> {
        let root = species_tree.root();
        let (left, right) = species_tree.children(root).ok_or_else(|| {
            MscError::Tree(
                ErrorInfo::new("species-root-leaf", "species tree root has no children")
                    .with_context("root", root.to_string()),
            )
        })?;
        Ok(Self {
            left: leaf_descendants(species_tree, left, taxa),
            right: leaf_descendants(species_tree, right, taxa),
        })
    }
}

/// Finds, for every gene tree, the nodes tied to the species-root population.
///
/// Gene trees are classified independently; the only shared state is
/// `freedom`, which ends up holding the tightest downward bound over all of
/// them.
pub fn collect_connecting_nodes<S, G>(
    species_tree: &S,
    gene_trees: &[G],
    taxa: &TaxonMap,
    freedom: &mut MinimumAccumulator,
) -> Result<ConnectingNodes, MscError>
where
    S: TimeTree + ?Sized,
    G: TimeTree,
{
    let clades = RootClades::of_root(species_tree, taxa)?;
    let classifier = DescentClassifier::new(&clades.left, &clades.right);

    let mut all_connecting = ConnectingNodes::default();
    for (index, gene_tree) in gene_trees.iter().enumerate() {
        let mut connecting = IndexSet::new();
        classifier.classify(gene_tree, gene_tree.root(), &mut connecting, freedom);
        all_connecting.put_all(index, connecting);
    }
    Ok(all_connecting)
}

#[cfg(test)]
mod tests {
    use super::*;
    use msc_tree::newick;

    #[test]
    fn no_gene_trees_leave_accumulator_untouched() {
        let species = newick::parse("(A:1,B:1);").unwrap();
        let mut freedom = MinimumAccumulator::new();
        let genes: Vec<msc_tree::TreeImpl> = Vec::new();
        let nodes =
            collect_connecting_nodes(&species, &genes, &TaxonMap::new(), &mut freedom).unwrap();
        assert!(nodes.is_empty());
        assert!(!freedom.is_set());
    }

    #[test]
    fn aggregates_per_gene_tree() {
        let species = newick::parse("((A:1,B:1):1,C:2);").unwrap();
        let taxa = TaxonMap::from_pairs([
            ("A", "a1"),
            ("A", "a2"),
            ("B", "b1"),
            ("C", "c1"),
            ("C", "c2"),
        ])
        .unwrap();
        let genes = vec![
            newick::parse("((a1:1,b1:1):2,(c1:1,c2:1):2);").unwrap(),
            newick::parse("(((a1:1,c1:1):1,b1:2):1,(a2:1,c2:1):2);").unwrap(),
            newick::parse("((a1:2,a2:2):1,b1:3);").unwrap(),
        ];
        let mut freedom = MinimumAccumulator::new();
        let nodes = collect_connecting_nodes(&species, &genes, &taxa, &mut freedom).unwrap();

        assert_eq!(nodes.get(0).map(IndexSet::len), Some(1));
        assert_eq!(nodes.get(1).map(IndexSet::len), Some(4));
        assert!(nodes.get(2).is_none());
        assert_eq!(nodes.len(), 5);
        assert_eq!(nodes.iter().filter(|(gene, _)| *gene == 1).count(), 4);
        assert_eq!(freedom.value().unwrap(), 1.0);
    }
}
