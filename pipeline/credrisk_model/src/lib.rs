//! Concrete classifiers and attribution engines for the credit risk pipeline.
//!
//! A model is persisted as a JSON artifact describing the classifier, the
//! preprocessing it was trained behind and, optionally, which explainer to
//! pair it with. [`load_artifact`] turns that file into shared scorer and
//! explainer handles ready to be injected into a
//! [`credrisk_core::RiskPipeline`].

pub mod artifact;
pub mod error;
pub mod logistic;
mod math;
pub mod shapley;
pub mod tree;

pub use artifact::{
    load_artifact, ArtifactMetadata, ExplainerSpec, LoadedModel, ModelArtifact, ModelSpec,
    ModelVersion,
};
pub use error::ModelError;
pub use logistic::{LinearExplainer, LogisticModel};
pub use shapley::{exact_shapley, BaselineShapley, TreePathExplainer};
pub use tree::{Aggregation, Tree, TreeEnsemble, TreeNode};
