//! Feature vector rescaling.
//!
//! Every transform re-validates its output, so a vector that leaves this
//! module is finite or the request fails at the assemble stage naming the
//! offending field.

use crate::config::{NormalizationPolicy, PopulationStats};
use crate::error::AssemblyError;
use crate::input::FeatureVector;
use crate::schema::FEATURE_COUNT;

/// Standardize `vector` against the mean and population standard deviation
/// of its own components.
///
/// A standard deviation of exactly zero is replaced by one, so a vector of
/// identical values maps to all zeros. Statistics are taken on the
/// components divided by the largest magnitude, which gives the same result
/// without overflowing for values near `f64::MAX`.
pub fn normalize(vector: &FeatureVector) -> Result<FeatureVector, AssemblyError> {
    let values = vector.as_slice();
    let scale = values.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    if scale == 0.0 {
        return Ok(FeatureVector::from_array([0.0; FEATURE_COUNT]));
    }

    let n = values.len() as f64;
    let mean = values.iter().map(|v| v / scale).sum::<f64>() / n;
    let variance = values
        .iter()
        .map(|v| (v / scale - mean).powi(2))
        .sum::<f64>()
        / n;
    let std = guard_zero(variance.sqrt());

    let mut out = [0.0_f64; FEATURE_COUNT];
    for (o, v) in out.iter_mut().zip(values) {
        *o = (v / scale - mean) / std;
    }
    FeatureVector::new(&out)
}

/// Standardize each component against training-set statistics.
///
/// Fails when a component lands outside the finite range, e.g. a huge input
/// divided by a tiny training deviation.
pub fn standardize(
    vector: &FeatureVector,
    stats: &PopulationStats,
) -> Result<FeatureVector, AssemblyError> {
    let mut out = [0.0_f64; FEATURE_COUNT];
    for (i, (o, v)) in out.iter_mut().zip(vector.as_slice()).enumerate() {
        *o = (v - stats.mean[i]) / guard_zero(stats.std[i]);
    }
    FeatureVector::new(&out)
}

/// Apply `policy` to `vector`.
pub fn apply(
    policy: &NormalizationPolicy,
    vector: FeatureVector,
) -> Result<FeatureVector, AssemblyError> {
    match policy {
        NormalizationPolicy::Disabled => Ok(vector),
        NormalizationPolicy::PerVector => normalize(&vector),
        NormalizationPolicy::Population(stats) => standardize(&vector, stats),
    }
}

fn guard_zero(std: f64) -> f64 {
    if std == 0.0 {
        1.0
    } else {
        std
    }
}
