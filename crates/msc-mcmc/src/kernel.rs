use msc_core::errors::MscError;
use msc_core::TimeTree;
use msc_tree::{canonical_hash, TaxonMap};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::adaptive::{AcceptanceStats, AdaptiveTuner, Tunable};
use crate::config::RunConfig;
use crate::coordinated::{CoordinatedExponential, ShiftProposal};
use crate::determinism;
use crate::target::TargetDensity;

/// Outcome of a proposal evaluated by the kernel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProposalOutcome {
    /// Whether the proposal was accepted.
    pub accepted: bool,
    /// Log acceptance ratio, target change plus log Hastings ratio.
    pub log_alpha: f64,
    /// The shift that was tried.
    pub proposal: ShiftProposal,
}

/// Summary returned to callers after a run completes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    /// Label copied from the seed policy.
    pub seed_label: Option<String>,
    /// Number of proposals made.
    pub steps: usize,
    /// Accept/reject counters.
    pub stats: AcceptanceStats,
    /// Fraction of accepted proposals.
    pub acceptance_rate: f64,
    /// Value of `beta` after tuning.
    pub final_beta: f64,
    /// Species root height at the end of the run.
    pub final_root_height: f64,
    /// Target log density at the end of the run.
    pub final_log_density: f64,
    /// Canonical hash of the final species tree.
    pub species_tree_hash: String,
    /// Canonical hashes of the final gene trees, in input order.
    pub gene_tree_hashes: Vec<String>,
    /// Hint for a better starting `beta`, when acceptance was far off target.
    pub suggestion: Option<String>,
}

/// Metropolis–Hastings driver for [`CoordinatedExponential`].
#[derive(Debug, Clone)]
pub struct Kernel<T> {
    operator: CoordinatedExponential,
    tuner: AdaptiveTuner,
    taxa: TaxonMap,
    target: T,
}

impl<T> Kernel<T> {
    /// Builds the operator and tuner described by `config`.
    pub fn new(config: &RunConfig, taxa: TaxonMap, target: T) -> Result<Self, MscError> {
        config.validate()?;
        Ok(Self {
            operator: CoordinatedExponential::new(&config.coordinated)?,
            tuner: AdaptiveTuner::new(config.target_acceptance)?,
            taxa,
            target,
        })
    }

    /// The operator, with its current tuned `beta`.
    pub fn operator(&self) -> &CoordinatedExponential {
        &self.operator
    }

    /// Counters collected so far.
    pub fn stats(&self) -> &AcceptanceStats {
        self.tuner.stats()
    }

    /// Suggestion for a better starting `beta`, if any.
    pub fn performance_suggestion(&self) -> Option<String> {
        self.tuner.performance_suggestion(&self.operator)
    }

    /// Performs one propose/accept/tune cycle.
    ///
    /// On rejection every touched height is written back before returning.
    pub fn step<S, G, R>(
        &mut self,
        species_tree: &mut S,
        gene_trees: &mut [G],
        rng: &mut R,
    ) -> Result<ProposalOutcome, MscError>
    where
        S: TimeTree + ?Sized,
        G: TimeTree,
        R: Rng + ?Sized,
        T: TargetDensity<S, G>,
    {
        let before = self.target.log_density(species_tree, gene_trees)?;
        let proposal = self
            .operator
            .propose(species_tree, gene_trees, &self.taxa, rng)?;
        let after = match self.target.log_density(species_tree, gene_trees) {
            Ok(value) => value,
            Err(err) => {
                proposal.revert(species_tree, gene_trees);
                return Err(err);
            }
        };

        let log_alpha = after - before + proposal.log_hastings_ratio;
        let accepted = log_alpha >= 0.0 || rng.gen::<f64>().ln() < log_alpha;
        if !accepted {
            proposal.revert(species_tree, gene_trees);
        }

        self.tuner.record(accepted);
        self.tuner.optimize(&mut self.operator, log_alpha);
        debug!(
            accepted,
            log_alpha,
            beta = self.operator.tunable_value(),
            "coordinated shift evaluated"
        );

        Ok(ProposalOutcome {
            accepted,
            log_alpha,
            proposal,
        })
    }
}

/// Runs `config.steps` proposals against `target`, mutating the trees in place.
///
/// Every step draws from its own substream of the master seed, so a run is
/// fully determined by the configuration and the input trees.
pub fn run<S, G, T>(
    config: &RunConfig,
    species_tree: &mut S,
    gene_trees: &mut [G],
    taxa: &TaxonMap,
    target: T,
) -> Result<RunSummary, MscError>
where
    S: TimeTree + ?Sized,
    G: TimeTree,
    T: TargetDensity<S, G>,
{
    let mut kernel = Kernel::new(config, taxa.clone(), target)?;
    let master_seed = config.seed_policy.master_seed;
    info!(
        steps = config.steps,
        master_seed,
        gene_trees = gene_trees.len(),
        "starting coordinated run"
    );

    for step in 0..config.steps {
        let mut rng = determinism::step_rng(master_seed, step);
        kernel.step(species_tree, gene_trees, &mut rng)?;
    }

    let stats = *kernel.stats();
    let summary = RunSummary {
        seed_label: config.seed_policy.label.clone(),
        steps: config.steps,
        stats,
        acceptance_rate: stats.acceptance_rate().unwrap_or(0.0),
        final_beta: kernel.operator().beta(),
        final_root_height: species_tree.height(species_tree.root()),
        final_log_density: kernel.target.log_density(species_tree, gene_trees)?,
        species_tree_hash: canonical_hash(&*species_tree),
        gene_tree_hashes: gene_trees.iter().map(canonical_hash).collect(),
        suggestion: kernel.performance_suggestion(),
    };
    info!(
        acceptance_rate = summary.acceptance_rate,
        final_beta = summary.final_beta,
        final_root_height = summary.final_root_height,
        "finished coordinated run"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::RootHeightPrior;
    use msc_tree::{newick, TreeImpl};
    use tracing_test::traced_test;

    fn small_run_config(steps: usize) -> RunConfig {
        RunConfig {
            steps,
            ..RunConfig::default()
        }
    }

    #[traced_test]
    #[test]
    fn run_logs_start_and_finish() {
        let mut species = newick::parse("(A:1,B:1);").unwrap();
        let mut genes: Vec<TreeImpl> = vec![newick::parse("(A:2,B:2);").unwrap()];
        let summary = run(
            &small_run_config(5),
            &mut species,
            &mut genes,
            &TaxonMap::new(),
            RootHeightPrior::new(1.0).unwrap(),
        )
        .unwrap();
        assert_eq!(summary.stats.total(), 5);
        assert!(logs_contain("starting coordinated run"));
        assert!(logs_contain("finished coordinated run"));
    }

    #[test]
    fn zero_steps_leave_trees_alone() {
        let mut species = newick::parse("(A:1,B:1);").unwrap();
        let hash = canonical_hash(&species);
        let mut genes: Vec<TreeImpl> = Vec::new();
        let summary = run(
            &small_run_config(0),
            &mut species,
            &mut genes,
            &TaxonMap::new(),
            RootHeightPrior::new(1.0).unwrap(),
        )
        .unwrap();
        assert_eq!(summary.species_tree_hash, hash);
        assert_eq!(summary.acceptance_rate, 0.0);
        assert_eq!(summary.suggestion, None);
        assert_eq!(summary.final_beta, 1.0);
    }
}
