//! Persisted model artifacts.
//!
//! An artifact is a single JSON document:
//!
//! ```json
//! {
//!   "metadata": { "id": "gbt-credit", "version": "1.2.0", "feature_names": ["..."] },
//!   "preprocessing": { "normalization": "per_vector" },
//!   "model": { "kind": "tree_ensemble", "aggregation": "boosted", "base_score": -1.2, "trees": [] },
//!   "explainer": { "kind": "tree_path" }
//! }
//! ```
//!
//! It is loaded once at startup. Every structural problem is reported as a
//! [`ModelError`] and must stop the process from serving requests.

use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use credrisk_core::{
    AttributionEngine, NormalizationPolicy, PipelineConfig, PopulationStats, RiskPipeline,
    RiskScorer, SCHEMA,
};

use crate::error::ModelError;
use crate::logistic::{LinearExplainer, LogisticModel};
use crate::shapley::{BaselineShapley, TreePathExplainer};
use crate::tree::TreeEnsemble;

/// Semantic version of a trained model.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModelVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ModelVersion {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    pub fn parse(s: &str) -> Result<Self, ModelError> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 3 {
            return Err(ModelError::InvalidVersion(s.to_string()));
        }
        let num = |p: &str| {
            p.parse::<u32>()
                .map_err(|_| ModelError::InvalidVersion(s.to_string()))
        };
        Ok(Self::new(num(parts[0])?, num(parts[1])?, num(parts[2])?))
    }
}

impl fmt::Display for ModelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl TryFrom<String> for ModelVersion {
    type Error = ModelError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<ModelVersion> for String {
    fn from(v: ModelVersion) -> Self {
        v.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub id: String,
    pub version: ModelVersion,
    /// Training columns (or input field names) in the order the model
    /// expects them.
    pub feature_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    Logistic(LogisticModel),
    TreeEnsemble(TreeEnsemble),
}

impl ModelSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            ModelSpec::Logistic(_) => "logistic",
            ModelSpec::TreeEnsemble(_) => "tree_ensemble",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExplainerSpec {
    Linear {
        #[serde(default)]
        baseline: Option<Vec<f64>>,
    },
    TreePath,
    BaselineShapley {
        baseline: Vec<f64>,
    },
}

impl ExplainerSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            ExplainerSpec::Linear { .. } => "linear",
            ExplainerSpec::TreePath => "tree_path",
            ExplainerSpec::BaselineShapley { .. } => "baseline_shapley",
        }
    }
}

/// The on-disk document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub metadata: ArtifactMetadata,
    /// Transform the model was trained behind.
    #[serde(default)]
    pub preprocessing: NormalizationPolicy,
    pub model: ModelSpec,
    /// Defaults to `linear` for logistic models and `tree_path` for
    /// ensembles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explainer: Option<ExplainerSpec>,
}

impl ModelArtifact {
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check everything that would otherwise surface as a per-request fault.
    pub fn validate(&self) -> Result<(), ModelError> {
        if !SCHEMA.matches(&self.metadata.feature_names) {
            return Err(ModelError::SchemaMismatch {
                found: self.metadata.feature_names.clone(),
            });
        }
        if let NormalizationPolicy::Population(stats) = &self.preprocessing {
            for (i, (m, s)) in stats.mean.iter().zip(&stats.std).enumerate() {
                if !m.is_finite() {
                    return Err(ModelError::NonFinite {
                        what: format!("population mean {i}"),
                        value: *m,
                    });
                }
                if !s.is_finite() || *s < 0.0 {
                    return Err(ModelError::NonFinite {
                        what: format!("population std {i}"),
                        value: *s,
                    });
                }
            }
        }
        match &self.model {
            ModelSpec::Logistic(m) => m.validate(),
            ModelSpec::TreeEnsemble(t) => t.validate(),
        }
    }

    /// Validate and construct the shared scorer and explainer handles.
    pub fn build(self) -> Result<LoadedModel, ModelError> {
        self.validate()?;
        let explainer_spec = self.explainer.unwrap_or(match self.model {
            ModelSpec::Logistic(_) => ExplainerSpec::Linear { baseline: None },
            ModelSpec::TreeEnsemble(_) => ExplainerSpec::TreePath,
        });
        let model_kind = self.model.kind();

        let (scorer, explainer): (Arc<dyn RiskScorer>, Arc<dyn AttributionEngine>) =
            match (self.model, explainer_spec) {
                (ModelSpec::Logistic(m), ExplainerSpec::Linear { baseline }) => {
                    let m = Arc::new(m);
                    let e: Arc<dyn AttributionEngine> =
                        Arc::new(LinearExplainer::new(m.clone(), baseline)?);
                    let m: Arc<dyn RiskScorer> = m;
                    (m, e)
                }
                (ModelSpec::TreeEnsemble(t), ExplainerSpec::TreePath) => {
                    let t = Arc::new(t);
                    let e: Arc<dyn AttributionEngine> = Arc::new(TreePathExplainer::new(t.clone()));
                    let t: Arc<dyn RiskScorer> = t;
                    (t, e)
                }
                (model, ExplainerSpec::BaselineShapley { baseline }) => {
                    let scorer: Arc<dyn RiskScorer> = match model {
                        ModelSpec::Logistic(m) => Arc::new(m),
                        ModelSpec::TreeEnsemble(t) => Arc::new(t),
                    };
                    let e: Arc<dyn AttributionEngine> = Arc::new(BaselineShapley::new(baseline)?);
                    (scorer, e)
                }
                (_, spec) => {
                    return Err(ModelError::IncompatibleExplainer {
                        explainer: spec.kind(),
                        model: model_kind,
                    })
                }
            };

        info!(
            "loaded model {} v{} ({model_kind}, explainer {}, normalization {})",
            self.metadata.id,
            self.metadata.version,
            explainer.name(),
            self.preprocessing.as_str()
        );

        Ok(LoadedModel {
            metadata: self.metadata,
            normalization: self.preprocessing,
            scorer,
            explainer,
        })
    }
}

/// Read, validate and build the artifact at `path`.
pub fn load_artifact(path: impl AsRef<Path>) -> Result<LoadedModel, ModelError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    ModelArtifact::from_json(&json)?.build()
}

/// Process-wide, read-only model state.
#[derive(Clone)]
pub struct LoadedModel {
    pub metadata: ArtifactMetadata,
    /// Transform recorded in the artifact.
    pub normalization: NormalizationPolicy,
    pub scorer: Arc<dyn RiskScorer>,
    pub explainer: Arc<dyn AttributionEngine>,
}

impl fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModel")
            .field("metadata", &self.metadata)
            .field("normalization", &self.normalization)
            .field("scorer", &self.scorer.name())
            .field("explainer", &self.explainer.name())
            .finish()
    }
}

impl LoadedModel {
    /// A pipeline using the artifact's normalization unless overridden.
    pub fn pipeline(&self, normalization: Option<NormalizationPolicy>) -> RiskPipeline {
        let normalization = normalization.unwrap_or_else(|| self.normalization.clone());
        RiskPipeline::new(
            self.scorer.clone(),
            self.explainer.clone(),
            PipelineConfig::with_normalization(normalization),
        )
    }

    /// Population statistics recorded in the artifact, if any.
    pub fn population_stats(&self) -> Option<&PopulationStats> {
        match &self.normalization {
            NormalizationPolicy::Population(stats) => Some(stats),
            _ => None,
        }
    }
}
