//! Logistic regression scorer and its closed-form explainer.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use credrisk_core::scorer::check_input;
use credrisk_core::{AttributionEngine, AttributionError, RiskScorer, ScoringError, FEATURE_COUNT};

use crate::error::ModelError;
use crate::math::{dot, sigmoid};

/// `P(high risk) = sigmoid(w·x + b)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub weights: Vec<f64>,
    pub bias: f64,
}

impl LogisticModel {
    pub fn new(weights: Vec<f64>, bias: f64) -> Result<Self, ModelError> {
        let model = Self { weights, bias };
        model.validate()?;
        Ok(model)
    }

    /// Structural checks: one finite weight per feature, finite bias.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.weights.len() != FEATURE_COUNT {
            return Err(ModelError::DimensionMismatch {
                what: "logistic weights",
                expected: FEATURE_COUNT,
                got: self.weights.len(),
            });
        }
        if let Some((i, &w)) = self.weights.iter().enumerate().find(|(_, w)| !w.is_finite()) {
            return Err(ModelError::NonFinite {
                what: format!("logistic weight {i}"),
                value: w,
            });
        }
        if !self.bias.is_finite() {
            return Err(ModelError::NonFinite {
                what: "logistic bias".into(),
                value: self.bias,
            });
        }
        Ok(())
    }

    /// Log-odds before the sigmoid.
    pub fn margin(&self, features: &[f64]) -> f64 {
        dot(&self.weights, features) + self.bias
    }
}

impl RiskScorer for LogisticModel {
    fn name(&self) -> &str {
        "logistic"
    }

    fn score_probability(&self, features: &[f64]) -> Result<f64, ScoringError> {
        check_input(features, self.weights.len())?;
        Ok(sigmoid(self.margin(features)))
    }
}

/// Exact attributions for a [`LogisticModel`] in log-odds space:
/// `wᵢ · (xᵢ − baselineᵢ)`.
///
/// These are the Shapley values of the margin under feature independence, so
/// they sum to `margin(x) − margin(baseline)`.
#[derive(Debug, Clone)]
pub struct LinearExplainer {
    model: Arc<LogisticModel>,
    baseline: Vec<f64>,
}

impl LinearExplainer {
    /// Explain `model` relative to `baseline`, or the origin when `None`.
    pub fn new(model: Arc<LogisticModel>, baseline: Option<Vec<f64>>) -> Result<Self, ModelError> {
        let baseline = baseline.unwrap_or_else(|| vec![0.0; model.weights.len()]);
        if baseline.len() != model.weights.len() {
            return Err(ModelError::DimensionMismatch {
                what: "linear explainer baseline",
                expected: model.weights.len(),
                got: baseline.len(),
            });
        }
        Ok(Self { model, baseline })
    }
}

impl AttributionEngine for LinearExplainer {
    fn name(&self) -> &str {
        "linear"
    }

    fn attribute(
        &self,
        features: &[f64],
        _scorer: &dyn RiskScorer,
    ) -> Result<Vec<f64>, AttributionError> {
        check_input(features, self.model.weights.len())?;
        Ok(self
            .model
            .weights
            .iter()
            .zip(features.iter().zip(&self.baseline))
            .map(|(w, (x, b))| w * (x - b))
            .collect())
    }
}
