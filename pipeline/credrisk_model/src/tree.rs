//! Decision tree ensembles.
//!
//! Trees are stored flat: node 0 is the root and every split points at
//! children with larger indices, which rules out cycles. A sample goes left
//! when `x[feature] <= threshold`.
//!
//! Each node records its `cover`, the number (or weight) of training samples
//! that reached it. Covers drive the path-dependent conditional expectation
//! used by [`crate::TreePathExplainer`].

use serde::{Deserialize, Serialize};

use credrisk_core::scorer::check_input;
use credrisk_core::{RiskScorer, ScoringError, FEATURE_COUNT};

use crate::error::ModelError;
use crate::math::sigmoid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        cover: f64,
    },
    Leaf {
        value: f64,
        cover: f64,
    },
}

impl TreeNode {
    fn cover(&self) -> f64 {
        match self {
            TreeNode::Split { cover, .. } | TreeNode::Leaf { cover, .. } => *cover,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

impl Tree {
    /// Leaf value reached by `x`.
    pub fn predict(&self, x: &[f64]) -> f64 {
        let mut node = 0;
        loop {
            match &self.nodes[node] {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => node = if x[*feature] <= *threshold { *left } else { *right },
            }
        }
    }

    /// Expected output when only the features in `known` are observed.
    ///
    /// Splits on known features follow `x`; splits on unknown features
    /// average both subtrees weighted by their training cover. With every
    /// feature known this is [`Tree::predict`].
    pub fn conditional_expectation(&self, x: &[f64], known: u32) -> f64 {
        self.expect_from(0, x, known)
    }

    fn expect_from(&self, node: usize, x: &[f64], known: u32) -> f64 {
        match &self.nodes[node] {
            TreeNode::Leaf { value, .. } => *value,
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
                ..
            } => {
                if known & (1 << *feature) != 0 {
                    let next = if x[*feature] <= *threshold { *left } else { *right };
                    self.expect_from(next, x, known)
                } else {
                    let cl = self.nodes[*left].cover();
                    let cr = self.nodes[*right].cover();
                    let l = self.expect_from(*left, x, known);
                    let r = self.expect_from(*right, x, known);
                    (cl * l + cr * r) / (cl + cr)
                }
            }
        }
    }

    fn validate(
        &self,
        tree: usize,
        n_features: usize,
        leaf_range: Option<(f64, f64)>,
    ) -> Result<(), ModelError> {
        let invalid = |node: usize, reason: String| ModelError::InvalidTree { tree, node, reason };
        if self.nodes.is_empty() {
            return Err(invalid(0, "tree has no nodes".into()));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            let cover = node.cover();
            if !cover.is_finite() || cover < 0.0 {
                return Err(invalid(i, format!("cover {cover} must be finite and non-negative")));
            }
            match node {
                TreeNode::Leaf { value, .. } => {
                    if !value.is_finite() {
                        return Err(invalid(i, format!("leaf value {value} is not finite")));
                    }
                    if let Some((lo, hi)) = leaf_range {
                        if !(lo..=hi).contains(value) {
                            return Err(invalid(
                                i,
                                format!("leaf value {value} outside [{lo}, {hi}]"),
                            ));
                        }
                    }
                }
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= n_features {
                        return Err(invalid(i, format!("feature index {feature} out of range")));
                    }
                    if !threshold.is_finite() {
                        return Err(invalid(i, format!("threshold {threshold} is not finite")));
                    }
                    for child in [*left, *right] {
                        if child <= i || child >= self.nodes.len() {
                            return Err(invalid(i, format!("child index {child} is invalid")));
                        }
                    }
                    if self.nodes[*left].cover() + self.nodes[*right].cover() <= 0.0 {
                        return Err(invalid(i, "children have zero total cover".into()));
                    }
                }
            }
        }
        Ok(())
    }
}

/// How per-tree outputs combine into a probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "aggregation", rename_all = "snake_case")]
pub enum Aggregation {
    /// Gradient boosting: trees add up to a log-odds margin.
    Boosted { base_score: f64 },
    /// Random forest: leaves hold probabilities and trees are averaged.
    Forest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    #[serde(flatten)]
    pub aggregation: Aggregation,
    pub trees: Vec<Tree>,
}

impl TreeEnsemble {
    pub fn new(aggregation: Aggregation, trees: Vec<Tree>) -> Result<Self, ModelError> {
        let ensemble = Self { aggregation, trees };
        ensemble.validate()?;
        Ok(ensemble)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::EmptyEnsemble);
        }
        let leaf_range = match self.aggregation {
            Aggregation::Boosted { base_score } => {
                if !base_score.is_finite() {
                    return Err(ModelError::NonFinite {
                        what: "base score".into(),
                        value: base_score,
                    });
                }
                None
            }
            Aggregation::Forest => Some((0.0, 1.0)),
        };
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(i, FEATURE_COUNT, leaf_range)?;
        }
        Ok(())
    }

    /// Ensemble output before any link function: the margin for boosted
    /// ensembles, the probability for forests.
    pub fn raw_output(&self, x: &[f64]) -> f64 {
        self.combine(self.trees.iter().map(|t| t.predict(x)))
    }

    /// [`TreeEnsemble::raw_output`] when only features in `known` are
    /// observed.
    pub fn conditional_raw_output(&self, x: &[f64], known: u32) -> f64 {
        self.combine(self.trees.iter().map(|t| t.conditional_expectation(x, known)))
    }

    fn combine(&self, outputs: impl Iterator<Item = f64>) -> f64 {
        match self.aggregation {
            Aggregation::Boosted { base_score } => base_score + outputs.sum::<f64>(),
            Aggregation::Forest => outputs.sum::<f64>() / self.trees.len() as f64,
        }
    }
}

impl RiskScorer for TreeEnsemble {
    fn name(&self) -> &str {
        match self.aggregation {
            Aggregation::Boosted { .. } => "boosted_trees",
            Aggregation::Forest => "random_forest",
        }
    }

    fn score_probability(&self, features: &[f64]) -> Result<f64, ScoringError> {
        check_input(features, FEATURE_COUNT)?;
        let raw = self.raw_output(features);
        Ok(match self.aggregation {
            Aggregation::Boosted { .. } => sigmoid(raw),
            Aggregation::Forest => raw.clamp(0.0, 1.0),
        })
    }
}
