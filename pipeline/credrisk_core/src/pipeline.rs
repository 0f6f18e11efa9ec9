//! The score-and-explain orchestrator.

use log::{debug, warn};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::attribution::{check_output, AttributionEngine};
use crate::config::PipelineConfig;
use crate::error::{RiskError, ScoringError};
use crate::input::{assemble, FeatureVector, RawInput};
use crate::normalize;
use crate::rank::{rank, Contribution};
use crate::schema::{FEATURE_COUNT, SCHEMA};
use crate::scorer::RiskScorer;

/// Probabilities strictly above this are labelled high risk.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Discrete risk classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RiskLabel {
    /// Probability above [`DECISION_THRESHOLD`].
    HighRisk,
    /// Probability at or below [`DECISION_THRESHOLD`].
    LowRisk,
}

impl RiskLabel {
    /// Threshold a probability. Exactly 0.5 is low risk.
    pub fn from_probability(probability: f64) -> Self {
        if probability > DECISION_THRESHOLD {
            RiskLabel::HighRisk
        } else {
            RiskLabel::LowRisk
        }
    }

    /// Human-readable label.
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLabel::HighRisk => "High Risk",
            RiskLabel::LowRisk => "Low Risk",
        }
    }
}

impl fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one successful request. Never partially filled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredResult {
    /// Thresholded classification.
    pub label: RiskLabel,
    /// High-risk probability in `[0, 1]`.
    pub probability: f64,
    /// One entry per schema feature, most influential first.
    pub contributions: Vec<Contribution>,
}

impl ScoredResult {
    /// Probability on a 0–100 scale rounded to two decimals.
    ///
    /// Rounds the exact value of `probability * 100` to the nearest
    /// hundredth with ties to even, so 0.125 becomes 0.12 and 12.345 (held
    /// as 12.3450000000000006) becomes 12.35.
    pub fn probability_percent(&self) -> f64 {
        let percent = self.probability * 100.0;
        let scaled = percent * 100.0;
        // exact rounding error of the product above
        let residual = percent.mul_add(100.0, -scaled);
        let hundredths = if (scaled - scaled.trunc()).abs() == 0.5 && residual != 0.0 {
            if residual > 0.0 {
                scaled.ceil()
            } else {
                scaled.floor()
            }
        } else {
            scaled.round_ties_even()
        };
        hundredths / 100.0
    }
}

/// Assembles, optionally normalizes, scores, explains and ranks.
///
/// Holds the process-wide scorer and engine handles; cloning is cheap and
/// every call to [`score_and_explain`](Self::score_and_explain) is
/// independent.
#[derive(Clone)]
pub struct RiskPipeline {
    scorer: Arc<dyn RiskScorer>,
    explainer: Arc<dyn AttributionEngine>,
    config: PipelineConfig,
}

impl fmt::Debug for RiskPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RiskPipeline")
            .field("scorer", &self.scorer.name())
            .field("explainer", &self.explainer.name())
            .field("config", &self.config)
            .finish()
    }
}

impl RiskPipeline {
    /// Wire a pipeline from already-loaded capabilities.
    pub fn new(
        scorer: Arc<dyn RiskScorer>,
        explainer: Arc<dyn AttributionEngine>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            scorer,
            explainer,
            config,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Score `input` and explain the score.
    pub fn score_and_explain(&self, input: &RawInput) -> Result<ScoredResult, RiskError> {
        self.run(input).inspect_err(|err| {
            warn!(
                "request failed at {} stage{}: {err}",
                err.stage(),
                err.field()
                    .map(|f| format!(" (field `{f}`)"))
                    .unwrap_or_default()
            );
        })
    }

    fn run(&self, input: &RawInput) -> Result<ScoredResult, RiskError> {
        let vector = assemble(input, &SCHEMA)?;
        debug!("assembled {:?}", vector.as_slice());

        let vector = normalize::apply(&self.config.normalization, vector)?;
        debug!(
            "normalization {} -> {:?}",
            self.config.normalization.as_str(),
            vector.as_slice()
        );

        self.explain_vector(&vector)
    }

    /// Score and explain a vector that has already been assembled and
    /// normalized.
    pub fn explain_vector(&self, vector: &FeatureVector) -> Result<ScoredResult, RiskError> {
        let features = vector.as_slice();

        let probability = self.scorer.score_probability(features)?;
        if !(0.0..=1.0).contains(&probability) {
            return Err(ScoringError::InvalidProbability(probability).into());
        }
        debug!("{} scored {probability:.4}", self.scorer.name());

        let attributions = self.explainer.attribute(features, self.scorer.as_ref())?;
        check_output(&attributions, FEATURE_COUNT)?;
        debug!("{} attributions {attributions:?}", self.explainer.name());

        Ok(ScoredResult {
            label: RiskLabel::from_probability(probability),
            probability,
            contributions: rank(SCHEMA.order(), &attributions),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AttributionError;
    use crate::Stage;

    struct Fixed(f64);

    impl RiskScorer for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn score_probability(&self, features: &[f64]) -> Result<f64, ScoringError> {
            crate::scorer::check_input(features, FEATURE_COUNT)?;
            Ok(self.0)
        }
    }

    struct Echo;

    impl AttributionEngine for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn attribute(
            &self,
            features: &[f64],
            _scorer: &dyn RiskScorer,
        ) -> Result<Vec<f64>, AttributionError> {
            Ok(features.to_vec())
        }
    }

    struct Short;

    impl AttributionEngine for Short {
        fn name(&self) -> &str {
            "short"
        }

        fn attribute(
            &self,
            _features: &[f64],
            _scorer: &dyn RiskScorer,
        ) -> Result<Vec<f64>, AttributionError> {
            Ok(vec![0.0; 3])
        }
    }

    fn input() -> RawInput {
        RawInput::from_pairs(
            SCHEMA
                .order()
                .zip([0.5, 45.0, 0.0, 0.3, 5000.0, 5.0, 0.0, 2.0, 1.0, 0.0]),
        )
    }

    #[test]
    fn label_threshold_is_strict() {
        assert_eq!(RiskLabel::from_probability(0.5), RiskLabel::LowRisk);
        assert_eq!(RiskLabel::from_probability(0.500001), RiskLabel::HighRisk);
        assert_eq!(RiskLabel::from_probability(0.0), RiskLabel::LowRisk);
        assert_eq!(RiskLabel::HighRisk.to_string(), "High Risk");
    }

    #[test]
    fn explainer_sees_the_scored_vector() {
        let pipeline = RiskPipeline::new(
            Arc::new(Fixed(0.2)),
            Arc::new(Echo),
            PipelineConfig::default(),
        );
        let result = pipeline.score_and_explain(&input()).unwrap();
        // echoed attributions are the normalized values, so income leads
        assert_eq!(result.contributions[0].feature, "monthly_income");
        assert!((result.contributions[0].value - 2.9998841474741735).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_probability_is_a_scoring_error() {
        let pipeline = RiskPipeline::new(
            Arc::new(Fixed(1.2)),
            Arc::new(Echo),
            PipelineConfig::unnormalized(),
        );
        let err = pipeline.score_and_explain(&input()).unwrap_err();
        assert_eq!(err, RiskError::Scoring(ScoringError::InvalidProbability(1.2)));

        let nan = RiskPipeline::new(
            Arc::new(Fixed(f64::NAN)),
            Arc::new(Echo),
            PipelineConfig::unnormalized(),
        );
        assert_eq!(nan.score_and_explain(&input()).unwrap_err().stage(), Stage::Score);
    }

    #[test]
    fn wrong_cardinality_is_an_attribution_error() {
        let pipeline = RiskPipeline::new(
            Arc::new(Fixed(0.9)),
            Arc::new(Short),
            PipelineConfig::unnormalized(),
        );
        assert_eq!(
            pipeline.score_and_explain(&input()).unwrap_err(),
            RiskError::Attribution(AttributionError::Cardinality {
                expected: FEATURE_COUNT,
                got: 3
            })
        );
    }

    #[test]
    fn percent_rounds_to_two_decimals() {
        let result = ScoredResult {
            label: RiskLabel::LowRisk,
            probability: 0.123456,
            contributions: Vec::new(),
        };
        assert_eq!(result.probability_percent(), 12.35);
    }

    #[test]
    fn percent_halfway_cases_follow_the_decimal_value() {
        let percent = |probability| ScoredResult {
            label: RiskLabel::from_probability(probability),
            probability,
            contributions: Vec::new(),
        }
        .probability_percent();
        // exact binary ties go to the even hundredth
        assert_eq!(percent(0.00125), 0.12);
        assert_eq!(percent(0.00375), 0.38);
        assert_eq!(percent(0.00625), 0.62);
        // 0.12345 * 100 lies just above 12.345
        assert_eq!(percent(0.12345), 12.35);
        assert_eq!(percent(0.73), 73.0);
        assert_eq!(percent(1.0), 100.0);
        assert_eq!(percent(0.0), 0.0);
    }
}
