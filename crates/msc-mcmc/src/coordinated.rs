use msc_core::errors::{ErrorInfo, MscError};
use msc_core::{NodeId, TimeTree};
use msc_tree::TaxonMap;
use rand::Rng;
use rand_distr::{Distribution, Exp};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::accumulator::MinimumAccumulator;
use crate::adaptive::Tunable;
use crate::collector::collect_connecting_nodes;

/// Settings for [`CoordinatedExponential`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatedExponentialConfig {
    /// Mean of the exponential draw the slack is subtracted from.
    #[serde(default = "default_beta")]
    pub beta: f64,
    /// Whether `beta` is tuned during the run.
    #[serde(default = "default_optimise")]
    pub optimise: bool,
}

fn default_beta() -> f64 {
    1.0
}

fn default_optimise() -> bool {
    true
}

impl Default for CoordinatedExponentialConfig {
    fn default() -> Self {
        Self {
            beta: default_beta(),
            optimise: default_optimise(),
        }
    }
}

/// Tree a touched node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TreeSlot {
    /// The species tree.
    Species,
    /// Gene tree at the given index.
    Gene(usize),
}

/// A node moved by a proposal together with its height before the move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchedNode {
    /// Tree holding the node.
    pub tree: TreeSlot,
    /// The moved node.
    pub node: NodeId,
    /// Height before the shift.
    pub previous_height: f64,
}

/// Result of one coordinated shift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftProposal {
    /// Log Hastings ratio of the move, `lambda * shift`.
    pub log_hastings_ratio: f64,
    /// Signed displacement applied to every moved node.
    pub shift: f64,
    /// Largest downward move the trees allowed.
    pub slack: f64,
    /// Exponential sample the slack was subtracted from.
    pub draw: f64,
    /// Number of gene-tree nodes moved alongside the species root.
    pub moved_gene_nodes: usize,
    /// Every moved node, species root first.
    pub touched: Vec<TouchedNode>,
}

impl ShiftProposal {
    /// Writes back the previous height of every touched node.
    pub fn revert<S, G>(&self, species_tree: &mut S, gene_trees: &mut [G])
    where
        S: TimeTree + ?Sized,
        G: TimeTree,
    {
        for touched in self.touched.iter().rev() {
            match touched.tree {
                TreeSlot::Species => species_tree.set_height(touched.node, touched.previous_height),
                TreeSlot::Gene(index) => {
                    gene_trees[index].set_height(touched.node, touched.previous_height)
                }
            }
        }
    }
}

/// Shifts the species-root height and every gene-tree node tied to the root
/// population by the same amount.
///
/// The shift is `Exp(lambda) - slack`, where `slack` is the largest downward
/// move that keeps every tree ordered. A move of `s` is undone by a move of
/// `-s`, which gives a log Hastings ratio of `lambda * s`.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatedExponential {
    beta: f64,
    lambda: f64,
    optimise: bool,
}

impl CoordinatedExponential {
    /// Builds the operator, rejecting a non-finite or non-positive `beta`.
    pub fn new(config: &CoordinatedExponentialConfig) -> Result<Self, MscError> {
        let beta = validate_beta(config.beta)?;
        Ok(Self {
            beta,
            lambda: 1.0 / beta,
            optimise: config.optimise,
        })
    }

    /// Mean of the exponential draw.
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Rate of the exponential draw, `1 / beta`.
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Proposes a shift with an exponential draw taken from `rng`.
    pub fn propose<S, G, R>(
        &self,
        species_tree: &mut S,
        gene_trees: &mut [G],
        taxa: &TaxonMap,
        rng: &mut R,
    ) -> Result<ShiftProposal, MscError>
    where
        S: TimeTree + ?Sized,
        G: TimeTree,
        R: Rng + ?Sized,
    {
        let exp = Exp::new(self.lambda).map_err(|err| {
            MscError::Rng(
                ErrorInfo::new("exponential-rate", err.to_string())
                    .with_context("lambda", self.lambda.to_string()),
            )
        })?;
        let draw = exp.sample(rng);
        self.propose_with_draw(species_tree, gene_trees, taxa, draw)
    }

    /// Proposes a shift using `draw` as the exponential sample.
    pub fn propose_with_draw<S, G>(
        &self,
        species_tree: &mut S,
        gene_trees: &mut [G],
        taxa: &TaxonMap,
        draw: f64,
    ) -> Result<ShiftProposal, MscError>
    where
        S: TimeTree + ?Sized,
        G: TimeTree,
    {
        if !(draw.is_finite() && draw >= 0.0) {
            return Err(MscError::Rng(
                ErrorInfo::new("invalid-draw", "exponential draw must be finite and non-negative")
                    .with_context("draw", draw.to_string()),
            ));
        }

        let root = species_tree.root();
        let (left, right) = species_tree.children(root).ok_or_else(|| {
            MscError::Tree(
                ErrorInfo::new("species-root-leaf", "species tree root has no children")
                    .with_context("root", root.to_string()),
            )
        })?;
        let root_height = species_tree.height(root);

        let mut freedom = MinimumAccumulator::new();
        freedom.record(root_height - species_tree.height(left));
        freedom.record(root_height - species_tree.height(right));

        let connecting = collect_connecting_nodes(&*species_tree, gene_trees, taxa, &mut freedom)?;
        let slack = freedom.value()?;
        assert!(slack >= 0.0, "negative slack {slack}");

        let shift = draw - slack;
        let mut touched = Vec::with_capacity(connecting.len() + 1);
        touched.push(TouchedNode {
            tree: TreeSlot::Species,
            node: root,
            previous_height: root_height,
        });
        species_tree.set_height(root, root_height + shift);

        for (gene, node) in connecting.iter() {
            let tree = &mut gene_trees[gene];
            let previous_height = tree.height(node);
            tree.set_height(node, previous_height + shift);
            touched.push(TouchedNode {
                tree: TreeSlot::Gene(gene),
                node,
                previous_height,
            });
        }

        for moved in &touched {
            match moved.tree {
                TreeSlot::Species => assert_above_children(&*species_tree, moved.node),
                TreeSlot::Gene(index) => assert_above_children(&gene_trees[index], moved.node),
            }
        }
        for (gene, node) in connecting.iter() {
            let tree = &gene_trees[gene];
            if let Some(parent) = tree.parent(node) {
                let parent_moved = connecting
                    .get(gene)
                    .is_some_and(|nodes| nodes.contains(&parent));
                if !parent_moved {
                    assert_below_parent(tree, node, parent);
                }
            }
        }

        let log_hastings_ratio = self.lambda * shift;
        debug!(
            slack,
            draw,
            shift,
            moved_gene_nodes = connecting.len(),
            log_hastings_ratio,
            "coordinated shift proposed"
        );

        Ok(ShiftProposal {
            log_hastings_ratio,
            shift,
            slack,
            draw,
            moved_gene_nodes: connecting.len(),
            touched,
        })
    }
}

impl Tunable for CoordinatedExponential {
    fn tunable_name(&self) -> &'static str {
        "beta"
    }

    fn tunable_value(&self) -> f64 {
        self.beta
    }

    fn set_tunable_value(&mut self, value: f64) {
        self.beta = value;
        self.lambda = 1.0 / value;
    }

    fn optimise_enabled(&self) -> bool {
        self.optimise
    }
}

fn validate_beta(beta: f64) -> Result<f64, MscError> {
    if beta.is_finite() && beta > 0.0 {
        Ok(beta)
    } else {
        Err(MscError::Config(
            ErrorInfo::new("invalid-beta", "beta must be finite and strictly positive")
                .with_context("beta", beta.to_string())
                .with_hint("the default mean of 1.0 is a reasonable start"),
        ))
    }
}

/// Rounding slack allowed when a shifted node lands on a child's height.
fn height_tolerance(height: f64) -> f64 {
    4.0 * f64::EPSILON * height.abs().max(1.0)
}

fn assert_above_children<T: TimeTree + ?Sized>(tree: &T, node: NodeId) {
    if let Some((left, right)) = tree.children(node) {
        let height = tree.height(node);
        for child in [left, right] {
            let child_height = tree.height(child);
            assert!(
                height >= child_height - height_tolerance(child_height),
                "shifted node {node} at {height} sits below child {child} at {child_height}"
            );
        }
    }
}

/// A moved gene node whose parent stayed put must not overtake it.
///
/// This only happens when a gene leaf maps to neither root clade.
fn assert_below_parent<T: TimeTree + ?Sized>(tree: &T, node: NodeId, parent: NodeId) {
    let height = tree.height(node);
    let parent_height = tree.height(parent);
    assert!(
        parent_height >= height - height_tolerance(height),
        "shifted node {node} at {height} rises above unshifted parent {parent} at {parent_height}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use msc_tree::{newick, TreeBuilder, TreeImpl};
    use tracing_test::traced_test;

    fn operator(beta: f64) -> CoordinatedExponential {
        CoordinatedExponential::new(&CoordinatedExponentialConfig {
            beta,
            optimise: false,
        })
        .unwrap()
    }

    fn species_five_three_one() -> TreeImpl {
        let mut builder = TreeBuilder::new();
        let a = builder.leaf("A", 0.0);
        let b = builder.leaf("B", 0.0);
        let c = builder.leaf("C", 1.0);
        let ab = builder.join(a, b, 3.0).unwrap();
        builder.join(ab, c, 5.0).unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn rejects_bad_beta() {
        for beta in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = CoordinatedExponential::new(&CoordinatedExponentialConfig {
                beta,
                optimise: true,
            })
            .unwrap_err();
            assert_eq!(err.info().code, "invalid-beta");
        }
    }

    #[test]
    fn zero_draw_drops_root_to_tallest_child() {
        let mut species = species_five_three_one();
        let mut genes: Vec<TreeImpl> = Vec::new();
        let proposal = operator(1.0)
            .propose_with_draw(&mut species, &mut genes, &TaxonMap::new(), 0.0)
            .unwrap();
        assert_eq!(proposal.slack, 2.0);
        assert_eq!(proposal.shift, -2.0);
        assert_eq!(species.height(species.root()), 3.0);
        assert_eq!(proposal.moved_gene_nodes, 0);
    }

    #[test]
    fn log_hastings_ratio_is_rate_times_shift() {
        let mut species = species_five_three_one();
        let mut genes: Vec<TreeImpl> = Vec::new();
        let proposal = operator(1.0)
            .propose_with_draw(&mut species, &mut genes, &TaxonMap::new(), 0.5)
            .unwrap();
        assert_eq!(proposal.shift, -1.5);
        assert_eq!(proposal.log_hastings_ratio, -1.5);

        let mut species = species_five_three_one();
        let proposal = operator(0.5)
            .propose_with_draw(&mut species, &mut genes, &TaxonMap::new(), 3.0)
            .unwrap();
        assert_eq!(proposal.log_hastings_ratio, 2.0);
    }

    #[test]
    fn revert_restores_touched_heights() {
        let mut species = newick::parse("(A:2,B:2);").unwrap();
        let mut genes = vec![newick::parse("((a1:1,b1:1):2,a2:3);").unwrap()];
        let taxa = TaxonMap::from_pairs([("A", "a1"), ("A", "a2"), ("B", "b1")]).unwrap();
        let before: Vec<f64> = genes[0].nodes().map(|n| genes[0].height(n)).collect();

        let proposal = operator(1.0)
            .propose_with_draw(&mut species, &mut genes, &taxa, 0.25)
            .unwrap();
        assert_eq!(proposal.moved_gene_nodes, 2);
        assert_eq!(proposal.touched.len(), 3);
        proposal.revert(&mut species, &mut genes);

        let after: Vec<f64> = genes[0].nodes().map(|n| genes[0].height(n)).collect();
        assert_eq!(before, after);
        assert_eq!(species.height(species.root()), 2.0);
    }

    #[test]
    fn invalid_draw_is_rejected() {
        let mut species = species_five_three_one();
        let mut genes: Vec<TreeImpl> = Vec::new();
        let err = operator(1.0)
            .propose_with_draw(&mut species, &mut genes, &TaxonMap::new(), -1.0)
            .unwrap_err();
        assert_eq!(err.info().code, "invalid-draw");
        assert_eq!(species.height(species.root()), 5.0);
    }

    #[test]
    fn tuning_keeps_rate_in_sync() {
        let mut op = operator(2.0);
        op.set_tunable_value(4.0);
        assert_eq!(op.beta(), 4.0);
        assert_eq!(op.lambda(), 0.25);
    }

    #[test]
    #[should_panic(expected = "rises above unshifted parent")]
    fn unmapped_outgroup_bounds_upward_shift() {
        // `out` belongs to no species, so the gene root is never moved while
        // the (a1,b1) cherry below it is.
        let mut species = newick::parse("(A:1,B:1);").unwrap();
        let mut genes = vec![newick::parse("((a1:1,b1:1):1,out:2);").unwrap()];
        let taxa = TaxonMap::from_pairs([("A", "a1"), ("B", "b1")]).unwrap();
        let _ = operator(1.0).propose_with_draw(&mut species, &mut genes, &taxa, 5.0);
    }

    #[test]
    fn unmapped_outgroup_allows_downward_shift() {
        let mut species = newick::parse("(A:1,B:1);").unwrap();
        let mut genes = vec![newick::parse("((a1:1,b1:1):1,out:2);").unwrap()];
        let taxa = TaxonMap::from_pairs([("A", "a1"), ("B", "b1")]).unwrap();
        let proposal = operator(1.0)
            .propose_with_draw(&mut species, &mut genes, &taxa, 0.5)
            .unwrap();
        assert_eq!(proposal.slack, 1.0);
        assert_eq!(proposal.moved_gene_nodes, 1);
        msc_tree::check_heights(&genes[0]).unwrap();
        msc_tree::check_heights(&species).unwrap();
    }

    #[traced_test]
    #[test]
    fn proposal_emits_debug_event() {
        let mut species = species_five_three_one();
        let mut genes: Vec<TreeImpl> = Vec::new();
        operator(1.0)
            .propose_with_draw(&mut species, &mut genes, &TaxonMap::new(), 1.0)
            .unwrap();
        assert!(logs_contain("coordinated shift proposed"));
        assert!(logs_contain("slack=2"));
    }
}
