//! Exact Shapley value attribution.
//!
//! With ten features there are only 1024 coalitions, so every engine here
//! evaluates its value function on all of them and combines the results with
//! the classic Shapley weights `|S|! (n − |S| − 1)! / n!`. No sampling, no
//! approximation: attributions always sum to `v(all) − v(none)`.

use std::sync::Arc;

use credrisk_core::scorer::check_input;
use credrisk_core::{AttributionEngine, AttributionError, RiskScorer, FEATURE_COUNT};

use crate::error::ModelError;
use crate::tree::TreeEnsemble;

/// Largest feature count [`exact_shapley`] accepts.
pub const MAX_EXACT_FEATURES: usize = 16;

/// Shapley values of `value` over `n` players.
///
/// `value` receives a coalition as a bitmask (bit `i` set means feature `i`
/// is present) and is called exactly once per coalition.
pub fn exact_shapley<F>(n: usize, mut value: F) -> Result<Vec<f64>, AttributionError>
where
    F: FnMut(u32) -> Result<f64, AttributionError>,
{
    if n > MAX_EXACT_FEATURES {
        return Err(AttributionError::Backend(format!(
            "exact Shapley values need at most {MAX_EXACT_FEATURES} features, got {n}"
        )));
    }
    let coalitions = 1_u32 << n;
    let v = (0..coalitions)
        .map(&mut value)
        .collect::<Result<Vec<f64>, _>>()?;

    let weights = coalition_weights(n);
    let mut phi = vec![0.0_f64; n];
    // the grand coalition has no missing player to add
    for mask in 0..coalitions - 1 {
        let w = weights[mask.count_ones() as usize];
        for (i, p) in phi.iter_mut().enumerate() {
            let bit = 1_u32 << i;
            if mask & bit == 0 {
                *p += w * (v[(mask | bit) as usize] - v[mask as usize]);
            }
        }
    }
    Ok(phi)
}

/// `weights[s] = s! (n − s − 1)! / n!` for `s < n`.
fn coalition_weights(n: usize) -> Vec<f64> {
    let mut factorial = vec![1.0_f64; n + 1];
    for k in 1..=n {
        factorial[k] = factorial[k - 1] * k as f64;
    }
    (0..n)
        .map(|s| factorial[s] * factorial[n - s - 1] / factorial[n])
        .collect()
}

/// Model-agnostic attributions against a fixed reference applicant.
///
/// Features outside a coalition take their baseline value and the scorer is
/// queried for the resulting hybrid vector, so attributions are in
/// probability space and sum to `f(x) − f(baseline)`. The baseline lives in
/// the same space as the scored vector, i.e. after normalization.
#[derive(Debug, Clone)]
pub struct BaselineShapley {
    baseline: Vec<f64>,
}

impl BaselineShapley {
    pub fn new(baseline: Vec<f64>) -> Result<Self, ModelError> {
        if baseline.len() != FEATURE_COUNT {
            return Err(ModelError::DimensionMismatch {
                what: "Shapley baseline",
                expected: FEATURE_COUNT,
                got: baseline.len(),
            });
        }
        if let Some((i, &b)) = baseline.iter().enumerate().find(|(_, b)| !b.is_finite()) {
            return Err(ModelError::NonFinite {
                what: format!("Shapley baseline value {i}"),
                value: b,
            });
        }
        Ok(Self { baseline })
    }

    pub fn baseline(&self) -> &[f64] {
        &self.baseline
    }
}

impl AttributionEngine for BaselineShapley {
    fn name(&self) -> &str {
        "baseline_shapley"
    }

    fn attribute(
        &self,
        features: &[f64],
        scorer: &dyn RiskScorer,
    ) -> Result<Vec<f64>, AttributionError> {
        check_input(features, self.baseline.len())?;
        let mut hybrid = self.baseline.clone();
        exact_shapley(features.len(), |mask| {
            for (i, h) in hybrid.iter_mut().enumerate() {
                *h = if mask & (1 << i) != 0 {
                    features[i]
                } else {
                    self.baseline[i]
                };
            }
            Ok(scorer.score_probability(&hybrid)?)
        })
    }
}

/// Exact TreeSHAP values for a [`TreeEnsemble`].
///
/// The value of a coalition is the ensemble's cover-weighted conditional
/// expectation given only those features, which makes these the
/// path-dependent tree Shapley values. They are expressed in the ensemble's
/// raw output space (log-odds for boosted ensembles, probability for
/// forests) and attribute the high-risk class. The scorer argument is
/// ignored: this engine always explains the ensemble it was built from.
#[derive(Debug, Clone)]
pub struct TreePathExplainer {
    ensemble: Arc<TreeEnsemble>,
}

impl TreePathExplainer {
    pub fn new(ensemble: Arc<TreeEnsemble>) -> Self {
        Self { ensemble }
    }

    /// Output with no feature observed; attributions are relative to this.
    pub fn expected_value(&self) -> f64 {
        self.ensemble.conditional_raw_output(&[0.0; FEATURE_COUNT], 0)
    }
}

impl AttributionEngine for TreePathExplainer {
    fn name(&self) -> &str {
        "tree_path"
    }

    fn attribute(
        &self,
        features: &[f64],
        _scorer: &dyn RiskScorer,
    ) -> Result<Vec<f64>, AttributionError> {
        check_input(features, FEATURE_COUNT)?;
        exact_shapley(FEATURE_COUNT, |mask| {
            Ok(self.ensemble.conditional_raw_output(features, mask))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logistic::{LinearExplainer, LogisticModel};
    use crate::tree::tests::stump_pair;
    use credrisk_core::ScoringError;
    use proptest::prelude::*;

    #[test]
    fn weights_sum_to_one_over_coalitions() {
        // each feature's weights over all coalitions excluding it sum to 1
        let n = 10;
        let w = coalition_weights(n);
        let total: f64 = (0..n)
            .map(|s| {
                let c = (1..=s).fold(1.0, |acc, k| acc * ((n - 1 - s + k) as f64) / k as f64);
                c * w[s]
            })
            .sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn additive_game_recovers_contributions() {
        let parts = [1.0, -2.0, 0.5];
        let phi = exact_shapley(3, |mask| {
            Ok((0..3)
                .filter(|i| mask & (1 << i) != 0)
                .map(|i| parts[i])
                .sum())
        })
        .unwrap();
        for (p, e) in phi.iter().zip(parts) {
            assert!((p - e).abs() < 1e-12);
        }
    }

    #[test]
    fn interaction_is_split_evenly() {
        // v(S) = 1 only when both players are present
        let phi = exact_shapley(2, |mask| Ok(if mask == 0b11 { 1.0 } else { 0.0 })).unwrap();
        assert!((phi[0] - 0.5).abs() < 1e-12);
        assert!((phi[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn grand_coalition_is_evaluated_without_a_weight() {
        for n in [1, 2, FEATURE_COUNT] {
            let mut calls = 0;
            let phi = exact_shapley(n, |mask| {
                calls += 1;
                Ok(if mask.count_ones() as usize == n { 1.0 } else { 0.0 })
            })
            .unwrap();
            assert_eq!(calls, 1 << n);
            for p in &phi {
                assert!((p - 1.0 / n as f64).abs() < 1e-12, "n = {n}");
            }
        }
        assert_eq!(exact_shapley(0, |_| Ok(3.0)).unwrap(), Vec::<f64>::new());
    }

    #[test]
    fn too_many_features_is_rejected() {
        assert!(exact_shapley(MAX_EXACT_FEATURES + 1, |_| Ok(0.0)).is_err());
    }

    #[test]
    fn tree_attributions_only_touch_split_features() {
        let ensemble = Arc::new(stump_pair());
        let explainer = TreePathExplainer::new(ensemble.clone());
        let mut x = [0.0; FEATURE_COUNT];
        x[1] = 30.0;
        x[6] = 3.0;

        let phi = explainer.attribute(&x, ensemble.as_ref()).unwrap();
        for (i, p) in phi.iter().enumerate() {
            if i != 1 && i != 6 {
                assert_eq!(*p, 0.0, "feature {i}");
            }
        }
        // each stump depends on one feature, so its attribution is
        // leaf(x) minus the cover-weighted mean leaf
        let age = 0.8 - (30.0 * 0.8 + 70.0 * -0.4) / 100.0;
        let late = 1.5 - (90.0 * -0.2 + 10.0 * 1.5) / 100.0;
        assert!((phi[1] - age).abs() < 1e-12);
        assert!((phi[6] - late).abs() < 1e-12);

        let total: f64 = phi.iter().sum();
        assert!((total - (ensemble.raw_output(&x) - explainer.expected_value())).abs() < 1e-12);
    }

    #[test]
    fn baseline_shapley_matches_linear_explainer_on_linear_margin() {
        // in probability space the logistic link adds interactions, so
        // compare on a scorer whose output is linear in the inputs
        struct Linear(Vec<f64>);
        impl RiskScorer for Linear {
            fn name(&self) -> &str {
                "linear"
            }
            fn score_probability(&self, x: &[f64]) -> Result<f64, ScoringError> {
                Ok(0.5 + x.iter().zip(&self.0).map(|(a, b)| a * b).sum::<f64>())
            }
        }
        let w = vec![0.01, -0.02, 0.03, 0.0, 0.01, -0.01, 0.02, 0.0, 0.01, 0.005];
        let baseline = vec![1.0; FEATURE_COUNT];
        let x = [2.0, 3.0, 0.0, 1.0, 4.0, 1.0, 2.0, 0.0, 1.0, 5.0];

        let shapley = BaselineShapley::new(baseline.clone()).unwrap();
        let phi = shapley.attribute(&x, &Linear(w.clone())).unwrap();

        let logistic = Arc::new(LogisticModel::new(w, 0.0).unwrap());
        let linear = LinearExplainer::new(logistic.clone(), Some(baseline)).unwrap();
        let expected = linear.attribute(&x, logistic.as_ref()).unwrap();
        for (a, b) in phi.iter().zip(&expected) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn baseline_shapley_propagates_scorer_faults() {
        struct Broken;
        impl RiskScorer for Broken {
            fn name(&self) -> &str {
                "broken"
            }
            fn score_probability(&self, _x: &[f64]) -> Result<f64, ScoringError> {
                Err(ScoringError::Backend("weights unavailable".into()))
            }
        }
        let shapley = BaselineShapley::new(vec![0.0; FEATURE_COUNT]).unwrap();
        assert_eq!(
            shapley.attribute(&[1.0; FEATURE_COUNT], &Broken),
            Err(AttributionError::Scorer(ScoringError::Backend(
                "weights unavailable".into()
            )))
        );
        assert!(BaselineShapley::new(vec![0.0; 2]).is_err());
    }

    proptest! {
        #[test]
        fn baseline_shapley_is_efficient(
            x in prop::array::uniform10(-3.0_f64..3.0),
            w in prop::array::uniform10(-1.0_f64..1.0),
        ) {
            let model = LogisticModel::new(w.to_vec(), 0.1).unwrap();
            let baseline = vec![0.0; FEATURE_COUNT];
            let shapley = BaselineShapley::new(baseline.clone()).unwrap();
            let phi = shapley.attribute(&x, &model).unwrap();
            let gap = model.score_probability(&x).unwrap()
                - model.score_probability(&baseline).unwrap();
            prop_assert!((phi.iter().sum::<f64>() - gap).abs() < 1e-9);
        }
    }
}
