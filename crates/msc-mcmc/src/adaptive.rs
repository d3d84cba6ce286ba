use msc_core::errors::{ErrorInfo, MscError};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default acceptance probability the tuner steers towards.
pub const DEFAULT_TARGET_ACCEPTANCE: f64 = 0.234;

/// An operator exposing one positive scalar for automatic tuning.
pub trait Tunable {
    /// Name of the tuned parameter, used in suggestions.
    fn tunable_name(&self) -> &'static str;

    /// Current value of the tuned parameter.
    fn tunable_value(&self) -> f64;

    /// Overwrites the tuned parameter.
    fn set_tunable_value(&mut self, value: f64);

    /// Whether the operator wants to be tuned during the run.
    fn optimise_enabled(&self) -> bool;

    /// Inclusive range the tuned value is clamped to.
    fn tunable_bounds(&self) -> (f64, f64) {
        (f64::MIN_POSITIVE, f64::MAX)
    }
}

/// Accept/reject counters for one operator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptanceStats {
    accepted: u64,
    rejected: u64,
}

impl AcceptanceStats {
    /// Records the outcome of one proposal.
    pub fn record(&mut self, accepted: bool) {
        if accepted {
            self.accepted += 1;
        } else {
            self.rejected += 1;
        }
    }

    /// Number of accepted proposals.
    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    /// Number of rejected proposals.
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Number of proposals seen.
    pub fn total(&self) -> u64 {
        self.accepted + self.rejected
    }

    /// Observed acceptance rate, or `None` before the first proposal.
    pub fn acceptance_rate(&self) -> Option<f64> {
        (self.total() > 0).then(|| self.accepted as f64 / self.total() as f64)
    }
}

/// Robbins–Monro style tuning of a [`Tunable`] operator towards a target
/// acceptance probability.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveTuner {
    target: f64,
    stats: AcceptanceStats,
}

impl AdaptiveTuner {
    /// Creates a tuner aiming at `target`, which must lie strictly inside (0, 1).
    pub fn new(target: f64) -> Result<Self, MscError> {
        if !(target > 0.0 && target < 1.0) {
            return Err(MscError::Config(
                ErrorInfo::new(
                    "target-acceptance-range",
                    "target acceptance probability must lie in (0, 1)",
                )
                .with_context("target", target.to_string()),
            ));
        }
        Ok(Self {
            target,
            stats: AcceptanceStats::default(),
        })
    }

    /// Target acceptance probability.
    pub fn target(&self) -> f64 {
        self.target
    }

    /// Counters collected so far.
    pub fn stats(&self) -> &AcceptanceStats {
        &self.stats
    }

    /// Records the outcome of a proposal.
    pub fn record(&mut self, accepted: bool) {
        self.stats.record(accepted);
    }

    /// Step size for the log-scale update after a proposal with `log_alpha`.
    ///
    /// Shrinks as `1 / (n + 1)` with the number of proposals seen.
    pub fn calc_delta(&self, log_alpha: f64) -> f64 {
        let count = self.stats.total() as f64 + 1.0;
        let delta = (log_alpha.min(0.0).exp() - self.target) / count;
        if delta.is_finite() {
            delta
        } else {
            0.0
        }
    }

    /// Moves the operator's tunable value by `exp(delta)` when tuning is on.
    pub fn optimize<T: Tunable + ?Sized>(&self, operator: &mut T, log_alpha: f64) {
        if !operator.optimise_enabled() {
            return;
        }
        let current = operator.tunable_value();
        let delta = self.calc_delta(log_alpha);
        let (low, high) = operator.tunable_bounds();
        let updated = (delta + current.ln()).exp().clamp(low, high);
        debug!(
            parameter = operator.tunable_name(),
            current, delta, updated, "tuning step"
        );
        operator.set_tunable_value(updated);
    }

    /// Suggests a new starting value when acceptance is far from the target.
    ///
    /// Returns `None` while the observed rate lies within `[0.10, 0.40]` or
    /// before any proposal was made.
    pub fn performance_suggestion<T: Tunable + ?Sized>(&self, operator: &T) -> Option<String> {
        let prob = self.stats.acceptance_rate()?;
        let ratio = (prob / self.target).clamp(0.5, 2.0);
        let suggested = operator.tunable_value() * ratio;
        if !(0.10..=0.40).contains(&prob) {
            Some(format!(
                "Try setting {} to about {:.6}",
                operator.tunable_name(),
                suggested
            ))
        } else {
            None
        }
    }
}
