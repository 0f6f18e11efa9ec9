use std::hint::black_box;
use std::path::PathBuf;

use criterion::{criterion_group, criterion_main, Criterion};
use credrisk_core::RawInput;
use credrisk_model::{load_artifact, ExplainerSpec, LogisticModel, ModelArtifact, ModelSpec};

fn applicant() -> RawInput {
    RawInput::from_pairs([
        ("credit_utilization", "0.82"),
        ("applicant_age", "29"),
        ("late_30_59", "2"),
        ("debt_ratio", "0.61"),
        ("monthly_income", "3100"),
        ("open_credit_lines", "11"),
        ("late_90", "1"),
        ("dependents", "3"),
        ("real_estate_loans", "0"),
        ("late_60_89", "1"),
    ])
}

fn bench_explainers(c: &mut Criterion) {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../models/credit_risk_model.json");
    let json = std::fs::read_to_string(&path).expect("shipped model artifact");
    let input = applicant();

    let tree = ModelArtifact::from_json(&json).unwrap().build().unwrap();
    let tree = tree.pipeline(None);
    c.bench_function("score_and_explain tree_path", |b| {
        b.iter(|| tree.score_and_explain(black_box(&input)))
    });

    let mut artifact = ModelArtifact::from_json(&json).unwrap();
    artifact.explainer = Some(ExplainerSpec::BaselineShapley {
        baseline: vec![0.0; credrisk_core::FEATURE_COUNT],
    });
    let shapley = artifact.build().unwrap().pipeline(None);
    c.bench_function("score_and_explain baseline_shapley", |b| {
        b.iter(|| shapley.score_and_explain(black_box(&input)))
    });

    let mut artifact = ModelArtifact::from_json(&json).unwrap();
    artifact.model = ModelSpec::Logistic(
        LogisticModel::new(vec![0.9, -0.5, 0.6, 0.2, -0.3, 0.05, 0.8, 0.1, -0.05, 0.4], -2.0)
            .unwrap(),
    );
    artifact.explainer = None;
    let linear = artifact.build().unwrap().pipeline(None);
    c.bench_function("score_and_explain linear", |b| {
        b.iter(|| linear.score_and_explain(black_box(&input)))
    });

    let loaded = load_artifact(&path).unwrap();
    c.bench_function("score only", |b| {
        b.iter(|| loaded.scorer.score_probability(black_box(&[0.0; 10])))
    });
}

criterion_group!(benches, bench_explainers);
criterion_main!(benches);
