//! Startup-time model loading errors.
//!
//! Any of these means the process must not serve requests.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating a model artifact.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read model artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("model artifact is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("artifact feature names {found:?} do not match the feature schema")]
    SchemaMismatch { found: Vec<String> },
    #[error("{what} has {got} values, expected {expected}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("{what} is not finite: {value}")]
    NonFinite { what: String, value: f64 },
    #[error("tree {tree}, node {node}: {reason}")]
    InvalidTree {
        tree: usize,
        node: usize,
        reason: String,
    },
    #[error("ensemble has no trees")]
    EmptyEnsemble,
    #[error("{explainer} explainer cannot be paired with a {model} model")]
    IncompatibleExplainer {
        explainer: &'static str,
        model: &'static str,
    },
    #[error("invalid model version: {0}")]
    InvalidVersion(String),
}
