use msc_core::errors::{ErrorInfo, MscError};
use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::adaptive::Tunable;

/// Smallest cycle the operator proposes.
pub const MIN_CYCLE_LENGTH: usize = 3;

/// Settings for [`DiscreteRateCycle`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateCycleConfig {
    /// Initial cycle length.
    #[serde(default = "default_cycle_length")]
    pub k: usize,
    /// Whether the cycle length is tuned during the run.
    #[serde(default = "default_optimise")]
    pub optimise: bool,
}

fn default_cycle_length() -> usize {
    MIN_CYCLE_LENGTH
}

fn default_optimise() -> bool {
    true
}

impl Default for RateCycleConfig {
    fn default() -> Self {
        Self {
            k: default_cycle_length(),
            optimise: default_optimise(),
        }
    }
}

/// Positions rotated by one [`DiscreteRateCycle`] proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateCycleProposal {
    /// Chosen positions in cycle order.
    pub cycle: Vec<usize>,
}

impl RateCycleProposal {
    /// Log Hastings ratio; the rotation is symmetric.
    pub fn log_hastings_ratio(&self) -> f64 {
        0.0
    }

    /// Rotates the values back to where they were before the proposal.
    pub fn revert<T: Copy>(&self, rates: &mut [T]) {
        let Some(&first) = self.cycle.first() else {
            return;
        };
        let head = rates[first];
        for window in self.cycle.windows(2) {
            rates[window[0]] = rates[window[1]];
        }
        if let Some(&last) = self.cycle.last() {
            rates[last] = head;
        }
    }
}

/// Rotates the categories at `k` randomly chosen positions of a branch-rate
/// vector one step along the chosen cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteRateCycle {
    dimension: usize,
    lower: usize,
    upper: usize,
    continuous_k: f64,
    optimise: bool,
}

impl DiscreteRateCycle {
    /// Builds the operator for rate vectors of length `dimension`.
    pub fn new(config: &RateCycleConfig, dimension: usize) -> Result<Self, MscError> {
        if dimension < MIN_CYCLE_LENGTH {
            return Err(MscError::Config(
                ErrorInfo::new(
                    "rate-vector-too-short",
                    "rate cycle needs at least three branch-rate categories",
                )
                .with_context("dimension", dimension.to_string()),
            ));
        }
        let lower = MIN_CYCLE_LENGTH;
        let upper = dimension;
        Ok(Self {
            dimension,
            lower,
            upper,
            continuous_k: config.k.clamp(lower, upper) as f64,
            optimise: config.optimise,
        })
    }

    /// Cycle length used by the next proposal.
    pub fn cycle_length(&self) -> usize {
        (self.continuous_k.round() as usize).clamp(self.lower, self.upper)
    }

    /// Rotates `rates` in place and returns the chosen cycle.
    pub fn propose<T, R>(&self, rates: &mut [T], rng: &mut R) -> Result<RateCycleProposal, MscError>
    where
        T: Copy,
        R: Rng + ?Sized,
    {
        if rates.len() != self.dimension {
            return Err(MscError::Operator(
                ErrorInfo::new("dimension-mismatch", "rate vector length changed")
                    .with_context("expected", self.dimension.to_string())
                    .with_context("actual", rates.len().to_string()),
            ));
        }

        let k = self.cycle_length();
        let cycle = index::sample(rng, self.dimension, k).into_vec();

        let tail = rates[cycle[k - 1]];
        for i in (1..k).rev() {
            rates[cycle[i]] = rates[cycle[i - 1]];
        }
        rates[cycle[0]] = tail;

        debug!(k, ?cycle, "rate cycle proposed");
        Ok(RateCycleProposal { cycle })
    }
}

impl Tunable for DiscreteRateCycle {
    fn tunable_name(&self) -> &'static str {
        "k"
    }

    fn tunable_value(&self) -> f64 {
        self.continuous_k
    }

    fn set_tunable_value(&mut self, value: f64) {
        self.continuous_k = value.clamp(self.lower as f64, self.upper as f64);
    }

    fn optimise_enabled(&self) -> bool {
        self.optimise
    }

    fn tunable_bounds(&self) -> (f64, f64) {
        (self.lower as f64, self.upper as f64)
    }
}
