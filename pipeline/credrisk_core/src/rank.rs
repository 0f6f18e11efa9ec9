//! Ordering attributions by influence.

use serde::Serialize;

/// A feature and its signed attribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Contribution {
    /// Schema field name.
    pub feature: &'static str,
    /// Signed attribution value.
    pub value: f64,
}

/// Pair `names` with `values` and sort by descending absolute value.
///
/// The sort is stable, so equal magnitudes keep their input order.
pub fn rank<I>(names: I, values: &[f64]) -> Vec<Contribution>
where
    I: IntoIterator<Item = &'static str>,
{
    let mut pairs: Vec<Contribution> = names
        .into_iter()
        .zip(values.iter().copied())
        .map(|(feature, value)| Contribution { feature, value })
        .collect();
    pairs.sort_by(|a, b| b.value.abs().total_cmp(&a.value.abs()));
    pairs
}
