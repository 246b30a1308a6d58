mod common;

use assert_cmd::Command;
use serde_json::Value;

use common::TestWorkspace;

fn run_chart(args: &[&str]) -> Value {
    let assert = Command::cargo_bin("dataset-profiler")
        .expect("binary exists")
        .args(["chart"])
        .args(args)
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("stdout utf8");
    serde_json::from_str(&stdout).expect("points json")
}

#[test]
fn chart_projects_label_and_value_fields() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("scores.csv", "name,score\nAlice,90\nBob,85\n");

    let points = run_chart(&["-i", input.to_str().unwrap()]);
    let points = points.as_array().expect("array output");
    assert_eq!(points.len(), 2);
    assert_eq!(points[0]["name"], "Alice");
    assert_eq!(points[0]["value"], 90.0);
    assert_eq!(points[0]["rawData"]["name"], "Alice");
}

#[test]
fn chart_without_numeric_fields_is_empty_not_an_error() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("labels.csv", "name,tag\nAlice,x\nBob,y\n");

    let points = run_chart(&["-i", input.to_str().unwrap()]);
    assert_eq!(points, serde_json::json!([]));
}

#[test]
fn chart_caps_output_at_twenty_points() {
    let workspace = TestWorkspace::new();
    let rows: String = (0..40).map(|n| format!("{n}\n")).collect();
    let input = workspace.write("long.csv", &format!("v\n{rows}"));

    let points = run_chart(&["-i", input.to_str().unwrap()]);
    assert_eq!(points.as_array().unwrap().len(), 20);
}

#[test]
fn chart_projects_a_stored_summary() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("scores.csv", "grade,score\nb,85\na,95\na,90\n");
    let summary_path = workspace.path().join("summary.json");

    Command::cargo_bin("dataset-profiler")
        .expect("binary exists")
        .args([
            "summarize",
            "-i",
            input.to_str().unwrap(),
            "-o",
            summary_path.to_str().unwrap(),
        ])
        .assert()
        .success();

    let points = run_chart(&[
        "-i",
        summary_path.to_str().unwrap(),
        "--from-summary",
    ]);
    let points = points.as_array().expect("array output");
    let labels: Vec<&str> = points
        .iter()
        .map(|point| point["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        labels,
        vec![
            "score (min)",
            "score (max)",
            "score (mean)",
            "grade: a",
            "grade: b"
        ]
    );
    assert_eq!(points[0]["value"], 85.0);
    assert_eq!(points[3]["value"], 2.0);
    assert!(points[0].get("rawData").is_none());
}
