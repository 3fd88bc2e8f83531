#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Drives the `assessrank` binary against a small on-disk catalog.

use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

fn write_fixture(dir: &Path) {
    let catalog = serde_json::json!([
        {
            "name": "Core Java (Entry Level)",
            "url": "https://catalog.test/solutions/products/core-java/",
            "description": "Multi-choice test of Java fundamentals.",
            "test_type": "Knowledge & Skills",
            "duration": 30,
            "adaptive_support": "No",
            "remote_support": "Yes"
        },
        {
            "name": "Verify Numerical Reasoning",
            "url": "https://catalog.test/products/numerical/",
            "description": "Measures numerical reasoning ability.",
            "test_type": "Ability & Aptitude",
            "duration": 18,
            "adaptive_support": "Yes",
            "remote_support": "Yes"
        },
        {
            "name": "Occupational Personality Questionnaire",
            "url": "https://catalog.test/products/opq/",
            "description": "Personality and behavioural preferences at work.",
            "test_type": "Personality & Behavior",
            "duration": 25
        }
    ]);
    let training = serde_json::json!([
        {"Query": "java developer", "Assessment_url": "https://catalog.test/products/core-java/"},
        {"Query": "analyst with numbers", "Assessment_url": "https://catalog.test/products/numerical/"}
    ]);
    std::fs::write(dir.join("catalog.json"), catalog.to_string()).unwrap();
    std::fs::write(dir.join("training.json"), training.to_string()).unwrap();
    std::fs::write(
        dir.join("assessrank.toml"),
        format!(
            "[data]\ncatalog = {:?}\ntraining = {:?}\nstate = {:?}\n",
            dir.join("catalog.json"),
            dir.join("training.json"),
            dir.join("state").join("engine.json"),
        ),
    )
    .unwrap();
}

fn assessrank(dir: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_assessrank"))
        .arg("--config")
        .arg(dir.join("assessrank.toml"))
        .args(args)
        .env_remove("GROQ_API_KEY")
        .env("RUST_LOG", "warn")
        .current_dir(dir)
        .output()
        .unwrap()
}

#[test]
fn recommend_prints_ranked_json() {
    let tmp = tempfile::tempdir().unwrap();
    write_fixture(tmp.path());

    let out = assessrank(tmp.path(), &["recommend", "java developer", "-k", "2"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let recs: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let recs = recs.as_array().unwrap();
    assert_eq!(recs.len(), 2);
    assert_eq!(recs[0]["item"]["id"], "https://catalog.test/products/core-java/");
}

#[test]
fn export_then_recommend_from_state() {
    let tmp = tempfile::tempdir().unwrap();
    write_fixture(tmp.path());

    let fresh = assessrank(tmp.path(), &["recommend", "numerical reasoning", "-k", "3"]);
    assert!(fresh.status.success());

    let out = assessrank(tmp.path(), &["export"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(tmp.path().join("state").join("engine.json").exists());

    let restored = assessrank(tmp.path(), &["recommend", "numerical reasoning", "-k", "3"]);
    assert!(restored.status.success());
    assert_eq!(fresh.stdout, restored.stdout);
}

#[test]
fn evaluate_reports_recall() {
    let tmp = tempfile::tempdir().unwrap();
    write_fixture(tmp.path());

    let out = assessrank(tmp.path(), &["evaluate", "-k", "3"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["k"], 3);
    assert_eq!(report["mean_recall"], 1.0);
}

#[test]
fn out_of_range_top_k_fails() {
    let tmp = tempfile::tempdir().unwrap();
    write_fixture(tmp.path());

    let out = assessrank(tmp.path(), &["recommend", "java", "-k", "0"]);
    assert!(!out.status.success());
}

#[test]
fn predict_writes_detailed_and_submission_tables() {
    let tmp = tempfile::tempdir().unwrap();
    write_fixture(tmp.path());
    std::fs::write(
        tmp.path().join("queries.csv"),
        "Query\njava developer\n\"analyst, numerical reasoning\"\n",
    )
    .unwrap();

    let out = assessrank(
        tmp.path(),
        &["predict", "--queries", "queries.csv", "--output", "predicted", "-k", "2"],
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let detailed =
        std::fs::read_to_string(tmp.path().join("predicted/test_predictions_detailed.csv"))
            .unwrap();
    let lines: Vec<&str> = detailed.lines().collect();
    assert_eq!(lines[0], "Query,Rank,Assessment_Name,Assessment_URL,Relevance_Score");
    assert_eq!(lines.len(), 5);
    assert!(lines[1].starts_with(
        "java developer,1,Core Java (Entry Level),https://catalog.test/products/core-java/,"
    ));
    assert!(lines[2].starts_with("java developer,2,"));
    assert!(lines[3].starts_with("\"analyst, numerical reasoning\",1,"));

    let submission =
        std::fs::read_to_string(tmp.path().join("predicted/test_predictions.csv")).unwrap();
    let lines: Vec<&str> = submission.lines().collect();
    assert_eq!(lines[0], "Query,Assessment_url");
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[1], "java developer,https://catalog.test/products/core-java/");
}

#[test]
fn serve_exits_when_engine_cannot_start() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(
        tmp.path().join("assessrank.toml"),
        format!("[data]\ncatalog = {:?}\n", tmp.path().join("missing.json")),
    )
    .unwrap();

    let mut child = Command::new(env!("CARGO_BIN_EXE_assessrank"))
        .arg("--config")
        .arg(tmp.path().join("assessrank.toml"))
        .args(["serve", "--host", "127.0.0.1", "--port", "0"])
        .env_remove("GROQ_API_KEY")
        .env("RUST_LOG", "warn")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(30);
    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break Some(status);
        }
        if Instant::now() > deadline {
            break None;
        }
        std::thread::sleep(Duration::from_millis(50));
    };
    let Some(status) = status else {
        child.kill().unwrap();
        panic!("serve kept running after a failed engine build");
    };
    assert!(!status.success());
}
