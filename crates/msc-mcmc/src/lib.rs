#![deny(missing_docs)]

//! Coordinated species-root and gene-tree height operator for
//! multispecies-coalescent samplers, with a small Metropolis–Hastings driver.

/// Running minimum used to bound the downward shift.
pub mod accumulator;
/// Acceptance counters and adaptive tuning of operator parameters.
pub mod adaptive;
/// Per-gene-tree collection of nodes tied to the species root.
pub mod collector;
/// YAML configuration schema and defaults.
pub mod config;
/// The coordinated exponential height shift.
pub mod coordinated;
/// Gene-tree node classification against the species-root clades.
pub mod descent;
/// Deterministic seed derivation helpers.
pub mod determinism;
/// Sampling kernel and the public `run` entry point.
pub mod kernel;
/// Cyclic permutation of discrete branch-rate categories.
pub mod rate_cycle;
/// Target densities evaluated by the kernel.
pub mod target;

pub use accumulator::MinimumAccumulator;
pub use adaptive::{AcceptanceStats, AdaptiveTuner, Tunable, DEFAULT_TARGET_ACCEPTANCE};
pub use collector::{collect_connecting_nodes, ConnectingNodes, RootClades};
pub use config::{RootPriorConfig, RunConfig, SeedPolicy};
pub use coordinated::{
    CoordinatedExponential, CoordinatedExponentialConfig, ShiftProposal, TouchedNode, TreeSlot,
};
pub use descent::{Descent, DescentClassifier};
pub use kernel::{run, Kernel, ProposalOutcome, RunSummary};
pub use rate_cycle::{DiscreteRateCycle, RateCycleConfig, RateCycleProposal};
pub use target::{RootHeightPrior, TargetDensity};
