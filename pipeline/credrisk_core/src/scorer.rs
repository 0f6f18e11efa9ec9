//! Classifier capability.

use crate::error::ScoringError;

/// A pre-trained binary classifier.
///
/// Implementations are loaded once at startup and then shared read-only by
/// every request, possibly from several threads at once; `score_probability`
/// must therefore not rely on interior mutability that is unsafe under
/// concurrent reads.
pub trait RiskScorer: Send + Sync {
    /// Identifier used in logs.
    fn name(&self) -> &str;

    /// Probability that `features` belongs to the high-risk class.
    ///
    /// `features` is in schema order. Implementations reject vectors of the
    /// wrong length or with non-finite values.
    fn score_probability(&self, features: &[f64]) -> Result<f64, ScoringError>;
}

/// Reject `features` unless it has `expected` finite values.
///
/// Shared by scorer implementations for their input contract.
pub fn check_input(features: &[f64], expected: usize) -> Result<(), ScoringError> {
    if features.len() != expected {
        return Err(ScoringError::DimensionMismatch {
            expected,
            got: features.len(),
        });
    }
    match features.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(ScoringError::NonFiniteInput {
            index,
            value: features[index],
        }),
        None => Ok(()),
    }
}
