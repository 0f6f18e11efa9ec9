use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

fn shipped_model() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../models/credit_risk_model.json")
}

fn credrisk() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_credrisk"));
    cmd.arg("--model").arg(shipped_model()).env_remove("RUST_LOG");
    cmd
}

const APPLICANT: &str = r#"{
    "credit_utilization": 0.5,
    "applicant_age": "45",
    "late_30_59": 0,
    "debt_ratio": 0.3,
    "monthly_income": "5000",
    "open_credit_lines": 5,
    "late_90": 0,
    "dependents": 2,
    "real_estate_loans": 1,
    "late_60_89": 0,
    "submitted_by": "branch-12"
}"#;

#[test]
fn scores_a_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("applicant.json");
    fs::write(&input, APPLICANT).unwrap();

    let out = credrisk().arg("score").arg(&input).output().expect("spawn credrisk");
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8_lossy(&out.stdout);
    let mut lines = stdout.lines();
    assert_eq!(lines.next(), Some("Low Risk (12.46%)"));
    assert_eq!(lines.count(), 10);
}

#[test]
fn reads_stdin_and_prints_json() {
    let mut child = credrisk()
        .args(["--format", "json", "score"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("spawn credrisk");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(APPLICANT.as_bytes())
        .unwrap();
    let out = child.wait_with_output().unwrap();
    assert!(out.status.success());

    let doc: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(doc["label"], "Low Risk");
    assert_eq!(doc["probability_percent"], 12.46);
    assert_eq!(doc["contributions"].as_array().unwrap().len(), 10);
}

#[test]
fn missing_field_exits_with_request_status() {
    let out = credrisk()
        .args(["score", "-f", "credit_utilization=0.5", "-f", "applicant_age=45"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("assemble stage"), "{stderr}");
    assert!(stderr.contains("late_30_59"), "{stderr}");
    assert!(out.stdout.is_empty());
}

#[test]
fn invalid_value_is_named() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("applicant.json");
    fs::write(&input, APPLICANT).unwrap();

    let out = credrisk()
        .args(["--format", "json", "score"])
        .arg(&input)
        .args(["-f", "monthly_income=abc"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(2));
    let doc: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(doc["error"]["stage"], "assemble");
    assert_eq!(doc["error"]["field"], "monthly_income");
}

#[test]
fn unreadable_model_exits_with_startup_status() {
    let dir = tempfile::tempdir().unwrap();
    let out = Command::new(env!("CARGO_BIN_EXE_credrisk"))
        .arg("--model")
        .arg(dir.path().join("missing.json"))
        .arg("inspect")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("failed to read model artifact"));

    let out = credrisk()
        .args(["score", "--normalization", "population", "-f", "late_90=0"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn inspect_and_schema_describe_the_model() {
    let out = credrisk().args(["--format", "json", "inspect"]).output().unwrap();
    assert!(out.status.success());
    let doc: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(doc["id"], "credit-risk-gbt");
    assert_eq!(doc["version"], "1.0.0");
    assert_eq!(doc["explainer"], "tree_path");
    assert_eq!(doc["scorer"], "boosted_trees");

    let out = credrisk().arg("schema").output().unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert_eq!(stdout.lines().count(), 10);
    assert!(stdout.lines().next().unwrap().contains("RevolvingUtilizationOfUnsecuredLines"));
}
