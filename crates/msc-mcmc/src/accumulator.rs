use msc_core::errors::{ErrorInfo, MscError};

/// Running minimum over non-negative bounds.
///
/// The value only ever decreases. Recording a negative or NaN bound means the
/// trees fed to the operator were already inconsistent, which is fatal.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MinimumAccumulator {
    value: Option<f64>,
}

impl MinimumAccumulator {
    /// Creates an unset accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a candidate bound.
    pub fn record(&mut self, value: f64) {
        assert!(
            value >= 0.0,
            "bound {value} recorded into minimum accumulator is negative or NaN"
        );
        self.value = Some(match self.value {
            Some(current) => current.min(value),
            None => value,
        });
    }

    /// Returns true once at least one bound was recorded.
    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    /// Returns the smallest bound recorded so far.
    pub fn value(&self) -> Result<f64, MscError> {
        self.value.ok_or_else(|| {
            MscError::Operator(ErrorInfo::new(
                "accumulator-unset",
                "no bound was recorded before reading the minimum",
            ))
        })
    }
}
