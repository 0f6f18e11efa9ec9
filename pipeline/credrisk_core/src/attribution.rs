//! Feature attribution capability.

use crate::error::AttributionError;
use crate::scorer::RiskScorer;

/// An additive feature-attribution method.
///
/// Returns one signed contribution per input feature, in the same order as
/// `features`, relative to an engine-specific baseline. `features` must be the
/// exact vector that was handed to the scorer; the pipeline guarantees this.
///
/// Like [`RiskScorer`], engines are shared read-only across concurrent
/// requests.
pub trait AttributionEngine: Send + Sync {
    /// Identifier used in logs.
    fn name(&self) -> &str;

    /// Attribute the scorer's output for `features` to each feature.
    fn attribute(
        &self,
        features: &[f64],
        scorer: &dyn RiskScorer,
    ) -> Result<Vec<f64>, AttributionError>;
}

/// Check an engine's output against the number of features scored.
pub fn check_output(values: &[f64], expected: usize) -> Result<(), AttributionError> {
    if values.len() != expected {
        return Err(AttributionError::Cardinality {
            expected,
            got: values.len(),
        });
    }
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(AttributionError::NonFinite {
            index,
            value: values[index],
        }),
        None => Ok(()),
    }
}
