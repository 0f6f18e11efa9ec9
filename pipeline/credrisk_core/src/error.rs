//! Request-scoped error taxonomy.
//!
//! Component errors stay close to the stage that raises them; the
//! orchestrator folds them into [`RiskError`] so callers handle a single type
//! while still seeing which stage and which field failed.

use std::fmt;
use thiserror::Error;

/// Pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Building the feature vector from raw input.
    Assemble,
    /// Invoking the classifier.
    Score,
    /// Invoking the attribution engine.
    Attribute,
}

impl Stage {
    /// Short lowercase name for logs and messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Assemble => "assemble",
            Stage::Score => "score",
            Stage::Attribute => "attribute",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures while turning raw input into a feature vector.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssemblyError {
    /// A schema field was absent from the input.
    #[error("missing required field `{0}`")]
    MissingField(String),
    /// A field was present but not a finite number.
    #[error("invalid value for `{field}`: {raw:?} is not a finite number")]
    InvalidValue {
        /// Offending field.
        field: String,
        /// Value as received.
        raw: String,
    },
    /// A vector was built from the wrong number of values.
    #[error("feature vector has {got} values, expected {expected}")]
    Length {
        /// Schema length.
        expected: usize,
        /// Values supplied.
        got: usize,
    },
    /// A vector was built from a value that is NaN or infinite.
    #[error("feature `{field}` is not finite: {value}")]
    NonFinite {
        /// Offending field.
        field: &'static str,
        /// Offending value.
        value: f64,
    },
}

/// Failures raised by a [`crate::RiskScorer`] or while checking its output.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    /// Input length differs from what the model was fitted on.
    #[error("scorer expects {expected} features, got {got}")]
    DimensionMismatch {
        /// Model dimension.
        expected: usize,
        /// Supplied dimension.
        got: usize,
    },
    /// Input contains NaN or infinity.
    #[error("feature {index} is not finite: {value}")]
    NonFiniteInput {
        /// Position in the vector.
        index: usize,
        /// Offending value.
        value: f64,
    },
    /// The scorer produced something that is not a probability.
    #[error("scorer returned {0}, expected a probability in [0, 1]")]
    InvalidProbability(f64),
    /// Internal fault of the underlying model.
    #[error("model fault: {0}")]
    Backend(String),
}

/// Failures raised by a [`crate::AttributionEngine`] or while checking its
/// output.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AttributionError {
    /// Engine returned a different number of values than features.
    #[error("attribution engine returned {got} values, expected {expected}")]
    Cardinality {
        /// Number of features.
        expected: usize,
        /// Number of attributions returned.
        got: usize,
    },
    /// An attribution is NaN or infinite.
    #[error("attribution for feature {index} is not finite: {value}")]
    NonFinite {
        /// Position in the vector.
        index: usize,
        /// Offending value.
        value: f64,
    },
    /// The scorer failed while the engine was querying it.
    #[error("scorer failed during attribution: {0}")]
    Scorer(#[from] ScoringError),
    /// Internal fault of the engine.
    #[error("explainer fault: {0}")]
    Backend(String),
}

/// The single error surfaced by [`crate::RiskPipeline::score_and_explain`].
///
/// None of these are transient; a request that fails is reported once and
/// never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskError {
    /// See [`AssemblyError::MissingField`].
    #[error("missing required field `{field}`")]
    MissingField {
        /// Field that was absent.
        field: String,
    },
    /// See [`AssemblyError::InvalidValue`].
    #[error("invalid value for `{field}`: {raw:?}")]
    InvalidValue {
        /// Field that failed coercion.
        field: String,
        /// Value as received.
        raw: String,
    },
    /// The classifier failed or misbehaved.
    #[error("scoring failed: {0}")]
    Scoring(#[source] ScoringError),
    /// The attribution engine failed or misbehaved.
    #[error("attribution failed: {0}")]
    Attribution(#[source] AttributionError),
}

impl RiskError {
    /// Stage the failure originated from.
    pub fn stage(&self) -> Stage {
        match self {
            RiskError::MissingField { .. } | RiskError::InvalidValue { .. } => Stage::Assemble,
            RiskError::Scoring(_) => Stage::Score,
            RiskError::Attribution(_) => Stage::Attribute,
        }
    }

    /// Input field involved, when the failure is tied to one.
    pub fn field(&self) -> Option<&str> {
        match self {
            RiskError::MissingField { field } | RiskError::InvalidValue { field, .. } => {
                Some(field.as_str())
            }
            _ => None,
        }
    }
}

impl From<AssemblyError> for RiskError {
    fn from(err: AssemblyError) -> Self {
        match err {
            AssemblyError::MissingField(field) => RiskError::MissingField { field },
            AssemblyError::InvalidValue { field, raw } => RiskError::InvalidValue { field, raw },
            AssemblyError::NonFinite { field, value } => RiskError::InvalidValue {
                field: field.to_string(),
                raw: value.to_string(),
            },
            AssemblyError::Length { expected, got } => {
                RiskError::Scoring(ScoringError::DimensionMismatch { expected, got })
            }
        }
    }
}

impl From<ScoringError> for RiskError {
    fn from(err: ScoringError) -> Self {
        RiskError::Scoring(err)
    }
}

impl From<AttributionError> for RiskError {
    fn from(err: AttributionError) -> Self {
        RiskError::Attribution(err)
    }
}
