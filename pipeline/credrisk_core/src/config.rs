//! Pipeline configuration.

use serde::{Deserialize, Serialize};

use crate::schema::FEATURE_COUNT;

/// Training-set statistics for [`NormalizationPolicy::Population`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationStats {
    /// Per-feature mean, schema order.
    pub mean: [f64; FEATURE_COUNT],
    /// Per-feature standard deviation, schema order.
    pub std: [f64; FEATURE_COUNT],
}

/// How a feature vector is rescaled before it reaches the scorer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "normalization", rename_all = "snake_case")]
pub enum NormalizationPolicy {
    /// Pass values through unchanged.
    Disabled,
    /// Standardize using the mean and standard deviation of the vector's own
    /// ten components. Not a standardization in the statistical sense; kept
    /// because deployed models were trained behind this transform.
    #[default]
    PerVector,
    /// Standardize each feature against training-set statistics.
    Population(PopulationStats),
}

impl NormalizationPolicy {
    /// Short name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            NormalizationPolicy::Disabled => "disabled",
            NormalizationPolicy::PerVector => "per_vector",
            NormalizationPolicy::Population(_) => "population",
        }
    }
}

/// Settings for a [`crate::RiskPipeline`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Rescaling applied between assembly and scoring.
    #[serde(flatten)]
    pub normalization: NormalizationPolicy,
}

impl PipelineConfig {
    /// Configuration that skips normalization.
    pub fn unnormalized() -> Self {
        Self {
            normalization: NormalizationPolicy::Disabled,
        }
    }

    /// Configuration with the given policy.
    pub fn with_normalization(normalization: NormalizationPolicy) -> Self {
        Self { normalization }
    }
}
