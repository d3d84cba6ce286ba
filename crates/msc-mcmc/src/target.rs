use msc_core::errors::{ErrorInfo, MscError};
use msc_core::TimeTree;

use crate::config::RootPriorConfig;

/// Unnormalised log density the kernel samples from.
pub trait TargetDensity<S: ?Sized, G> {
    /// Log density of the current tree state.
    fn log_density(&self, species_tree: &S, gene_trees: &[G]) -> Result<f64, MscError>;
}

/// Exponential prior on the species root height, `-rate * h` up to a constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootHeightPrior {
    rate: f64,
}

impl RootHeightPrior {
    /// Creates the prior, rejecting a non-finite or non-positive rate.
    pub fn new(rate: f64) -> Result<Self, MscError> {
        if rate.is_finite() && rate > 0.0 {
            Ok(Self { rate })
        } else {
            Err(MscError::Config(
                ErrorInfo::new("invalid-prior-rate", "prior rate must be finite and strictly positive")
                    .with_context("rate", rate.to_string()),
            ))
        }
    }

    /// Builds the prior from its configuration section.
    pub fn from_config(config: &RootPriorConfig) -> Result<Self, MscError> {
        Self::new(config.rate)
    }

    /// Rate of the prior.
    pub fn rate(&self) -> f64 {
        self.rate
    }
}

impl<S, G> TargetDensity<S, G> for RootHeightPrior
where
    S: TimeTree + ?Sized,
{
    fn log_density(&self, species_tree: &S, _gene_trees: &[G]) -> Result<f64, MscError> {
        let height = species_tree.height(species_tree.root());
        if height < 0.0 {
            return Ok(f64::NEG_INFINITY);
        }
        Ok(-self.rate * height)
    }
}
