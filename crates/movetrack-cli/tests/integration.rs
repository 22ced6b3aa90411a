#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn movetrack(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("movetrack").unwrap();
    cmd.current_dir(dir.path())
        .env("MOVETRACK_ROOT", dir.path())
        .env("MOVETRACK_ACTOR", "dispatcher")
        .env_remove("RUST_LOG");
    cmd
}

fn init_project(dir: &TempDir) {
    movetrack(dir).arg("init").assert().success();
}

fn json_of(dir: &TempDir, args: &[&str]) -> serde_json::Value {
    let output = movetrack(dir).arg("--json").args(args).output().unwrap();
    assert!(
        output.status.success(),
        "{args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

fn create_move(dir: &TempDir) -> String {
    let mv = json_of(dir, &["move", "create", "--client", "Ada"]);
    mv["number"].as_str().unwrap().to_string()
}

// ---------------------------------------------------------------------------
// movetrack init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_directory_tree() {
    let dir = TempDir::new().unwrap();
    movetrack(&dir).arg("init").assert().success();

    assert!(dir.path().join(".movetrack").is_dir());
    assert!(dir.path().join(".movetrack/documents").is_dir());
    assert!(dir.path().join(".movetrack/config.yaml").exists());
    assert!(dir.path().join(".movetrack/tracker.redb").exists());

    let gitignore = std::fs::read_to_string(dir.path().join(".gitignore")).unwrap();
    assert!(gitignore.contains(".movetrack/tracker.redb"));
}

#[test]
fn init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    movetrack(&dir).arg("init").assert().success();
    movetrack(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("exists:  .movetrack/config.yaml"));

    let gitignore = std::fs::read_to_string(dir.path().join(".gitignore")).unwrap();
    assert_eq!(gitignore.matches(".movetrack/tracker.redb").count(), 1);
}

#[test]
fn commands_before_init_fail() {
    let dir = TempDir::new().unwrap();
    movetrack(&dir)
        .args(["move", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}

// ---------------------------------------------------------------------------
// movetrack move
// ---------------------------------------------------------------------------

#[test]
fn move_create_list_show() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    movetrack(&dir)
        .args(["move", "create", "--type", "international_air", "--priority", "urgent"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created move MV-000001"));
    create_move(&dir);

    let list = json_of(&dir, &["move", "list"]);
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["move_type"], "international_air");
    assert_eq!(list[0]["priority"], "urgent");
    assert_eq!(list[1]["number"], "MV-000002");

    let detail = json_of(&dir, &["move", "show", "MV-000002"]);
    assert_eq!(detail["client"], "Ada");
    assert_eq!(detail["current"], "inspection");

    movetrack(&dir)
        .args(["move", "show", "MV-000099"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("move not found"));
}

#[test]
fn move_create_rejects_unknown_type() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    movetrack(&dir)
        .args(["move", "create", "--type", "lunar"])
        .assert()
        .failure();
}

// ---------------------------------------------------------------------------
// movetrack milestone / doc
// ---------------------------------------------------------------------------

#[test]
fn complete_is_gated_on_documents() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let number = create_move(&dir);

    movetrack(&dir)
        .args(["milestone", "complete", &number, "inspection"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Survey report"));

    movetrack(&dir)
        .args(["doc", "check", &number, "inspection"])
        .assert()
        .success()
        .stdout(predicate::str::contains("- Survey report"));

    movetrack(&dir)
        .args(["doc", "add", &number, "--type", "survey  REPORT"])
        .assert()
        .success();

    let completion = json_of(&dir, &["milestone", "complete", &number, "inspection"]);
    assert_eq!(completion["move"]["current"], "quotation");
    assert_eq!(completion["milestone"]["completed"], true);

    let docs = json_of(&dir, &["doc", "list", &number]);
    assert_eq!(docs.as_array().unwrap().len(), 1);
}

#[test]
fn complete_out_of_order_fails() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let number = create_move(&dir);

    movetrack(&dir)
        .args(["milestone", "complete", &number, "quotation"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("only the current milestone can be completed"));
}

#[test]
fn plan_records_event_with_actor() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let number = create_move(&dir);

    let milestone = json_of(
        &dir,
        &[
            "milestone", "plan", &number, "packing", "--date", "2031-03-02", "--responsible", "Crew A",
        ],
    );
    assert_eq!(milestone["planned_date"], "2031-03-02");
    assert_eq!(milestone["responsible"], "Crew A");

    let page = json_of(&dir, &["events", &number, "--kind", "milestone_edited"]);
    let events = page["events"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["actor"], "dispatcher");
    assert!(events[0]["before"].is_null());

    let all = json_of(&dir, &["events", &number, "--all", "--limit", "1"]);
    assert_eq!(all.as_array().unwrap().len(), 2);
}

#[test]
fn plan_rejects_kind_outside_sequence() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let number = create_move(&dir);

    movetrack(&dir)
        .args(["milestone", "plan", &number, "customs", "--notes", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not part of the domestic sequence"));
}

#[test]
fn timeline_lists_every_milestone() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let number = create_move(&dir);

    let timeline = json_of(&dir, &["timeline", &number]);
    assert_eq!(timeline["entries"].as_array().unwrap().len(), 14);
    assert_eq!(timeline["progress"], 0);

    movetrack(&dir)
        .args(["timeline", &number])
        .assert()
        .success()
        .stdout(predicate::str::contains("> Inspection"));

    movetrack(&dir)
        .args(["doc", "add", &number, "--type", "Survey report"])
        .assert()
        .success();
    movetrack(&dir)
        .args(["milestone", "complete", &number, "inspection"])
        .assert()
        .success();
    movetrack(&dir)
        .args(["timeline", &number])
        .assert()
        .success()
        .stdout(predicate::str::contains("x Inspection"))
        .stdout(predicate::str::contains("> Quotation"));
}

// ---------------------------------------------------------------------------
// movetrack alerts / sweep
// ---------------------------------------------------------------------------

#[test]
fn overdue_alert_lifecycle() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let number = create_move(&dir);

    let overdue = (chrono::Utc::now() - chrono::Duration::days(5))
        .date_naive()
        .to_string();
    movetrack(&dir)
        .args(["milestone", "plan", &number, "inspection", "--date", &overdue])
        .assert()
        .success();

    let alerts = json_of(&dir, &["alerts", "list", &number, "--active"]);
    let alerts = alerts.as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["severity"], "critical");
    let id = alerts[0]["id"].as_str().unwrap().to_string();

    let acked = json_of(&dir, &["alerts", "ack", &id]);
    assert_eq!(acked["acknowledged_by"], "dispatcher");

    movetrack(&dir).args(["alerts", "resolve", &id]).assert().success();
    movetrack(&dir)
        .args(["alerts", "resolve", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already resolved"));

    let active = json_of(&dir, &["alerts", "list", &number, "--active"]);
    assert!(active.as_array().unwrap().is_empty());
}

#[test]
fn sweep_evaluates_open_moves() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    create_move(&dir);

    let report = json_of(&dir, &["sweep"]);
    assert_eq!(report["evaluated"], 1);
    assert_eq!(report["skipped"], 0);
}

// ---------------------------------------------------------------------------
// movetrack config
// ---------------------------------------------------------------------------

#[test]
fn config_validate_default_is_clean() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    movetrack(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config is valid"));
}

#[test]
fn config_validate_reports_errors() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    std::fs::write(
        dir.path().join(".movetrack/config.yaml"),
        "project:\n  name: test\nsla:\n  warning_window_days: -1\n",
    )
    .unwrap();
    movetrack(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("warning_window_days"));
}
