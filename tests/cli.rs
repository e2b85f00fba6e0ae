use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

/// A harvester command isolated from the developer's environment and `.env` file.
fn harvest_cmd(workdir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("jira-harvest").expect("Binary exists");
    cmd.env_clear()
        .current_dir(workdir)
        .env("ENABLE_LOGGING", "false");
    cmd
}

#[test]
fn missing_tracker_settings_fail_before_any_request() {
    let workdir = tempdir().unwrap();
    harvest_cmd(workdir.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("JIRA_BASE_URL"));
}

#[test]
fn rejected_credentials_abort_the_run() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/rest/api/2/myself")
        .with_status(401)
        .with_body("Unauthorized")
        .create();
    let listing = server
        .mock("GET", "/rest/api/2/project")
        .expect(0)
        .create();

    let workdir = tempdir().unwrap();
    harvest_cmd(workdir.path())
        .env("JIRA_BASE_URL", server.url())
        .env("USER_EMAIL", "harvest@acme.test")
        .env("JIRA_API_TOKEN", "wrong-token")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("authentication").and(predicate::str::contains("401")));
    listing.assert();
}

#[test]
fn run_with_no_changed_projects_succeeds_and_writes_nothing() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/rest/api/2/myself")
        .with_status(200)
        .with_body(r#"{"displayName":"Harvest Bot"}"#)
        .create();
    server
        .mock("GET", "/rest/api/2/project")
        .with_status(200)
        .with_body("[]")
        .create();

    let workdir = tempdir().unwrap();
    let save_path = workdir.path().join("data");
    harvest_cmd(workdir.path())
        .env("JIRA_BASE_URL", server.url())
        .env("USER_EMAIL", "harvest@acme.test")
        .env("JIRA_API_TOKEN", "tracker-token")
        .env("SAVE_PATH", &save_path)
        .assert()
        .success();
    assert!(!save_path.join("jira").exists());
}

#[test]
fn log_file_is_created_when_logging_is_enabled() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/rest/api/2/myself")
        .with_status(200)
        .with_body(r#"{"displayName":"Harvest Bot"}"#)
        .create();
    server
        .mock("GET", "/rest/api/2/project")
        .with_status(200)
        .with_body("[]")
        .create();

    let workdir = tempdir().unwrap();
    let log_dir = workdir.path().join("logs");
    harvest_cmd(workdir.path())
        .env("ENABLE_LOGGING", "true")
        .env("CONSOLE_LOG", "false")
        .env("LOG_PATH", &log_dir)
        .env("JIRA_BASE_URL", server.url())
        .env("USER_EMAIL", "harvest@acme.test")
        .env("JIRA_API_TOKEN", "tracker-token")
        .assert()
        .success();

    let logs: Vec<_> = std::fs::read_dir(&log_dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(logs.len(), 1);
    let text = std::fs::read_to_string(&logs[0]).unwrap();
    assert!(text.contains("Harvest run complete"));
}
