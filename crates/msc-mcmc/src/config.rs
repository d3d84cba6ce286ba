use std::fs;
use std::path::Path;

use msc_core::errors::{ErrorInfo, MscError};
use serde::{Deserialize, Serialize};

use crate::adaptive::DEFAULT_TARGET_ACCEPTANCE;
use crate::coordinated::CoordinatedExponentialConfig;

/// YAML-configurable parameters governing a sampler run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Number of proposals to execute.
    #[serde(default = "default_steps")]
    pub steps: usize,
    /// Master seed and substream policy.
    #[serde(default)]
    pub seed_policy: SeedPolicy,
    /// Acceptance probability the tuner steers towards.
    #[serde(default = "default_target_acceptance")]
    pub target_acceptance: f64,
    /// Coordinated root-height operator settings.
    #[serde(default)]
    pub coordinated: CoordinatedExponentialConfig,
    /// Prior on the species root height.
    #[serde(default)]
    pub root_prior: RootPriorConfig,
}

fn default_steps() -> usize {
    1000
}

fn default_target_acceptance() -> f64 {
    DEFAULT_TARGET_ACCEPTANCE
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            steps: default_steps(),
            seed_policy: SeedPolicy::default(),
            target_acceptance: default_target_acceptance(),
            coordinated: CoordinatedExponentialConfig::default(),
            root_prior: RootPriorConfig::default(),
        }
    }
}

impl RunConfig {
    /// Parses and validates a YAML document.
    pub fn from_yaml_str(contents: &str) -> Result<Self, MscError> {
        let config: RunConfig = serde_yaml::from_str(contents).map_err(|err| {
            MscError::Serde(ErrorInfo::new("yaml-deserialize", err.to_string()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a YAML file.
    pub fn load(path: &Path) -> Result<Self, MscError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            MscError::Serde(
                ErrorInfo::new("config-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Serializes the configuration back to YAML.
    pub fn to_yaml_string(&self) -> Result<String, MscError> {
        serde_yaml::to_string(self)
            .map_err(|err| MscError::Serde(ErrorInfo::new("yaml-serialize", err.to_string())))
    }

    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), MscError> {
        if !(self.target_acceptance > 0.0 && self.target_acceptance < 1.0) {
            return Err(config_error(
                "target-acceptance-range",
                "target_acceptance must lie in (0, 1)",
                "target_acceptance",
                self.target_acceptance,
            ));
        }
        if !(self.coordinated.beta.is_finite() && self.coordinated.beta > 0.0) {
            return Err(config_error(
                "invalid-beta",
                "coordinated.beta must be finite and strictly positive",
                "beta",
                self.coordinated.beta,
            ));
        }
        if !(self.root_prior.rate.is_finite() && self.root_prior.rate > 0.0) {
            return Err(config_error(
                "invalid-prior-rate",
                "root_prior.rate must be finite and strictly positive",
                "rate",
                self.root_prior.rate,
            ));
        }
        Ok(())
    }
}

fn config_error(code: &str, message: &str, key: &str, value: f64) -> MscError {
    MscError::Config(ErrorInfo::new(code, message).with_context(key, value.to_string()))
}

/// Deterministic seeding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedPolicy {
    /// Master seed used for the run.
    #[serde(default = "default_master_seed")]
    pub master_seed: u64,
    /// Optional label recorded in the run summary.
    #[serde(default)]
    pub label: Option<String>,
}

fn default_master_seed() -> u64 {
    0x05EE_D5EE_DD15_5EED_u64
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self {
            master_seed: default_master_seed(),
            label: None,
        }
    }
}

/// Exponential prior on the species root height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootPriorConfig {
    /// Rate of the exponential prior.
    #[serde(default = "default_prior_rate")]
    pub rate: f64,
}

fn default_prior_rate() -> f64 {
    1.0
}

impl Default for RootPriorConfig {
    fn default() -> Self {
        Self {
            rate: default_prior_rate(),
        }
    }
}
