use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const SECRET: &str = "integration-secret";

fn desk_cmd(db: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_inquiry-desk"));
    cmd.env("CRM_DATABASE", db)
        .env("CRM_JWT_SECRET", SECRET)
        .env_remove("CRM_TOKEN_TTL_HOURS")
        .env_remove("RUST_LOG");
    cmd
}

fn run(db: &Path, args: &[&str]) -> Output {
    desk_cmd(db).args(args).output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn test_setup_seeds_once() {
    let tmp = TempDir::new().unwrap();
    let db = tmp.path().join("crm.db");

    let first = run(&db, &["setup"]);
    assert!(first.status.success(), "{}", stderr(&first));
    let out = stdout(&first);
    assert!(out.contains("Admin user created: admin@example.com"));
    assert!(out.contains("Sample inquiry created with reference code: INQ"));
    assert!(out.contains("Users:      1"));
    assert!(out.contains("Inquiries:  1"));
    assert!(out.contains("Follow-ups: 1"));
    assert!(db.exists());

    let second = run(&db, &["setup"]);
    assert!(second.status.success());
    let out = stdout(&second);
    assert!(out.contains("Admin user already exists"));
    assert!(out.contains("Sample data already exists"));
    assert!(out.contains("Inquiries:  1"));
}

#[test]
fn test_database_flag_overrides_env() {
    let tmp = TempDir::new().unwrap();
    let env_db = tmp.path().join("env.db");
    let flag_db = tmp.path().join("nested").join("flag.db");

    let output = desk_cmd(&env_db)
        .args(["setup", "--database"])
        .arg(&flag_db)
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", stderr(&output));
    assert!(flag_db.exists());
    assert!(!env_db.exists());
}

#[test]
fn test_user_add_list_remove() {
    let tmp = TempDir::new().unwrap();
    let db = tmp.path().join("crm.db");

    let added = run(&db, &["user", "add", "Dana Staff", "Dana@Example.com"]);
    assert!(added.status.success(), "{}", stderr(&added));
    assert!(stdout(&added).contains("dana@example.com"));

    let duplicate = run(&db, &["user", "add", "Dana Again", "dana@example.com"]);
    assert!(!duplicate.status.success());
    assert!(stderr(&duplicate).contains("already exists"));

    let listed = run(&db, &["user", "list", "--json"]);
    assert!(listed.status.success());
    let users: serde_json::Value = serde_json::from_slice(&listed.stdout).unwrap();
    assert_eq!(users.as_array().unwrap().len(), 1);
    assert_eq!(users[0]["email"], "dana@example.com");
    assert_eq!(users[0]["name"], "Dana Staff");

    let removed = run(&db, &["user", "remove", "DANA@example.com"]);
    assert!(removed.status.success(), "{}", stderr(&removed));

    let listed = run(&db, &["user", "list"]);
    assert!(stdout(&listed).contains("No users found."));

    let again = run(&db, &["user", "remove", "dana@example.com"]);
    assert!(!again.status.success());
    assert!(stderr(&again).contains("not found"));
}

#[test]
fn test_user_add_rejects_bad_email() {
    let tmp = TempDir::new().unwrap();
    let db = tmp.path().join("crm.db");

    let output = run(&db, &["user", "add", "Dana", "not-an-email"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("email"));
}

#[test]
fn test_token_issue_prints_compact_token() {
    let tmp = TempDir::new().unwrap();
    let db = tmp.path().join("crm.db");
    assert!(run(&db, &["setup"]).status.success());

    let output = run(&db, &["token", "issue", "admin@example.com", "--ttl-hours", "2"]);
    assert!(output.status.success(), "{}", stderr(&output));
    let token = stdout(&output);
    let token = token.trim();
    assert_eq!(token.split('.').count(), 3);
    assert!(!token.contains(char::is_whitespace));
}

#[test]
fn test_token_issue_failures() {
    let tmp = TempDir::new().unwrap();
    let db = tmp.path().join("crm.db");
    assert!(run(&db, &["setup"]).status.success());

    let unknown = run(&db, &["token", "issue", "nobody@example.com"]);
    assert!(!unknown.status.success());
    assert!(stderr(&unknown).contains("not found"));

    let zero = run(&db, &["token", "issue", "admin@example.com", "--ttl-hours", "0"]);
    assert!(!zero.status.success());

    let no_secret = desk_cmd(&db)
        .env_remove("CRM_JWT_SECRET")
        .args(["token", "issue", "admin@example.com"])
        .output()
        .unwrap();
    assert!(!no_secret.status.success());
    assert!(stderr(&no_secret).contains("CRM_JWT_SECRET"));
}

#[test]
fn test_serve_without_secret_fails_fast() {
    let tmp = TempDir::new().unwrap();
    let db = tmp.path().join("crm.db");

    let output = desk_cmd(&db)
        .env_remove("CRM_JWT_SECRET")
        .args(["serve", "--port", "0"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(stderr(&output).contains("CRM_JWT_SECRET"));
}
