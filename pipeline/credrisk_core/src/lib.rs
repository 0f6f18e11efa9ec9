//! Credit risk scoring and explanation pipeline.
//!
//! Turns ten named applicant attributes into a risk label, a probability and
//! a ranked list of per-feature attributions. The classifier and the
//! attribution method are capabilities injected at construction time, so the
//! pipeline never depends on a particular model family.
//!
//! ```no_run
//! use std::sync::Arc;
//! use credrisk_core::{PipelineConfig, RawInput, RiskPipeline};
//! # fn demo(
//! #     scorer: Arc<dyn credrisk_core::RiskScorer>,
//! #     explainer: Arc<dyn credrisk_core::AttributionEngine>,
//! # ) -> Result<(), credrisk_core::RiskError> {
//! let pipeline = RiskPipeline::new(scorer, explainer, PipelineConfig::default());
//! let input = RawInput::from_pairs([("credit_utilization", "0.5"), ("applicant_age", "45")]);
//! let result = pipeline.score_and_explain(&input)?;
//! println!("{} ({}%)", result.label, result.probability_percent());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod attribution;
pub mod config;
pub mod error;
pub mod input;
pub mod normalize;
pub mod pipeline;
pub mod rank;
pub mod schema;
pub mod scorer;

pub use attribution::AttributionEngine;
pub use config::{NormalizationPolicy, PipelineConfig, PopulationStats};
pub use error::{AssemblyError, AttributionError, RiskError, ScoringError, Stage};
pub use input::{assemble, FeatureVector, RawInput, RawValue};
pub use normalize::normalize;
pub use pipeline::{RiskLabel, RiskPipeline, ScoredResult, DECISION_THRESHOLD};
pub use rank::{rank, Contribution};
pub use schema::{Feature, FeatureSchema, FEATURE_COUNT, SCHEMA};
pub use scorer::RiskScorer;
