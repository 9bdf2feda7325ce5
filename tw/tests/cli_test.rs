//! Integration tests for the `tw` binary

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// `tw` with config and log locations confined to a temp dir
fn tw(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tw").expect("Failed to find tw binary");
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("XDG_DATA_HOME", home.path().join("data"));
    cmd
}

fn saved_plan() -> serde_json::Value {
    json!({
        "plan": {
            "flights": [{ "summary": "NBO -> DXB", "est_price": 980.0 }],
            "stays": [{ "name": "Atlantis The Palm", "est_price_per_night": 1250.5, "currency": "AED" }],
            "activities": [{
                "date": "2025-11-10",
                "morning": { "title": "Emirates Golf Club", "duration_hours": 0.75 },
                "notes": ["Tee time 07:30"]
            }]
        },
        "request": {
            "origin": "NBO",
            "destination": "Dubai",
            "start_date": "2025-11-10",
            "end_date": "2025-11-16",
            "adults": 2,
            "budget_level": "mid",
            "trip_type": "honeymoon",
            "hobbies": ["golf"],
            "constraints": {}
        }
    })
}

#[test]
fn test_help_lists_commands() {
    let home = TempDir::new().unwrap();
    tw(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("export"))
        .stdout(predicate::str::contains("health"))
        .stdout(predicate::str::contains("Logs are written to"));
}

#[test]
fn test_export_writes_pdf() {
    let home = TempDir::new().unwrap();
    let input = home.path().join("plan.json");
    std::fs::write(&input, saved_plan().to_string()).unwrap();
    let output = home.path().join("itinerary.pdf");

    tw(&home)
        .args(["export", "plan.json", "--output", "itinerary.pdf"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Itinerary written to"));

    let bytes = std::fs::read(&output).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[test]
fn test_export_into_directory_uses_derived_name() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join("plan.json"), saved_plan().to_string()).unwrap();
    let out_dir = home.path().join("reports");
    std::fs::create_dir(&out_dir).unwrap();

    tw(&home).args(["export", "plan.json", "-o", "reports"]).assert().success();

    let names: Vec<String> = std::fs::read_dir(&out_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names.len(), 1);
    assert!(names[0].starts_with("trip-nbo-dubai-"), "unexpected name {}", names[0]);
}

#[test]
fn test_export_rejects_invalid_json() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join("plan.json"), "{ not json").unwrap();

    tw(&home)
        .args(["export", "plan.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse plan JSON"));
}

#[test]
fn test_plan_rejects_reversed_dates() {
    let home = TempDir::new().unwrap();
    tw(&home)
        .args([
            "plan",
            "--origin",
            "NBO",
            "--destination",
            "Dubai",
            "--start",
            "2025-11-16",
            "--end",
            "2025-11-10",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("End date must not be before start date"));
}

#[test]
fn test_plan_rejects_too_many_adults() {
    let home = TempDir::new().unwrap();
    tw(&home)
        .args([
            "plan",
            "--origin",
            "NBO",
            "--destination",
            "Dubai",
            "--start",
            "2025-11-10",
            "--end",
            "2025-11-16",
            "--adults",
            "12",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Adults must be between 1 and 8"));
}

fn write_config(home: &TempDir, server: &MockServer, streaming: bool) {
    let yaml = format!(
        "service:\n  base-url: {}\ntransport:\n  streaming: {}\n",
        server.uri(),
        streaming
    );
    std::fs::write(home.path().join("tw.yml"), yaml).unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_health_against_service() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    let home = TempDir::new().unwrap();
    write_config(&home, &server, true);

    tw(&home)
        .args(["--config", "tw.yml", "health"])
        .assert()
        .success()
        .stdout(predicate::str::contains("reachable"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_plan_saves_and_exports() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/plan-trip"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "plan": saved_plan()["plan"].clone(),
            "logs": [],
            "success": true,
            "message": "ok"
        })))
        .mount(&server)
        .await;
    let home = TempDir::new().unwrap();
    write_config(&home, &server, false);

    tw(&home)
        .args([
            "--config",
            "tw.yml",
            "plan",
            "--origin",
            "NBO",
            "--destination",
            "Dubai",
            "--start",
            "2025-11-10",
            "--end",
            "2025-11-16",
            "--interest",
            "golf",
            "--save",
            "saved.json",
            "--export",
            "trip.pdf",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Flights"))
        .stdout(predicate::str::contains("Emirates Golf Club"));

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(home.path().join("saved.json")).unwrap()).unwrap();
    assert_eq!(saved["request"]["hobbies"], json!(["golf"]));
    assert!(std::fs::read(home.path().join("trip.pdf")).unwrap().starts_with(b"%PDF"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_plan_failure_exits_nonzero() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/plan-trip"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "detail": "End date must be after start date" })))
        .mount(&server)
        .await;
    let home = TempDir::new().unwrap();
    write_config(&home, &server, false);

    tw(&home)
        .args([
            "--config",
            "tw.yml",
            "plan",
            "--origin",
            "NBO",
            "--destination",
            "Dubai",
            "--start",
            "2025-11-10",
            "--end",
            "2025-11-10",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("End date must be after start date"));
}
