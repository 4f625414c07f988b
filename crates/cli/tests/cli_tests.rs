// Integration tests for the bookcheck binary: exit codes and the --json stdout contract.
//
// Run with: cargo test -p bookcheck-cli --test cli_tests -- --nocapture

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const KEY: &str = "cw_0x689RpI-jtRR7oE8h_eQsKImvJapLeSbXpwF4e4=";

const ENV_VARS: [&str; 8] = [
    "BOOKCHECK_CONFIG",
    "BOOKCHECK_SECRET_KEY",
    "BOOKCHECK_BUCKET",
    "AWS_REGION",
    "AWS_ACCESS_KEY_ID",
    "AWS_SECRET_ACCESS_KEY",
    "AWS_SESSION_TOKEN",
    "RUST_LOG",
];

fn fixture(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
        .to_string_lossy()
        .into_owned()
}

/// A bookcheck command isolated from the caller's environment and config.
fn bookcheck(config: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_bookcheck"));
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"));
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.arg("--config").arg(config);
    cmd
}

fn write_config(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("config.toml");
    std::fs::write(&path, body).unwrap();
    path
}

fn keyed_config(dir: &Path) -> PathBuf {
    write_config(dir, &format!("[crypto]\nsecret_key = \"{KEY}\"\n"))
}

fn code(output: &Output) -> i32 {
    output.status.code().expect("process exited by signal")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Assert stdout is a single, parseable JSON value.
fn assert_single_json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let trimmed = stdout.trim();
    assert!(!trimmed.is_empty(), "stdout should not be empty");
    serde_json::from_str(trimmed).unwrap_or_else(|e| {
        panic!("stdout must be valid JSON.\nParse error: {e}\nstdout:\n{trimmed}")
    })
}

// ===========================================================================
// bookcheck compare
// ===========================================================================

#[test]
fn compare_clean_ticket_passes() {
    let dir = tempfile::tempdir().unwrap();
    let config = keyed_config(dir.path());

    let output = bookcheck(&config)
        .args(["compare", &fixture("ticket.csv"), &fixture("journal.sql"), "--json"])
        .output()
        .expect("bookcheck compare");

    assert_eq!(code(&output), 0, "stderr: {}", stderr(&output));
    let val = assert_single_json(&output);

    assert_eq!(val["meta"]["identifier"], "J-123");
    assert_eq!(val["summary"]["verdict"], "pass");
    assert_eq!(val["summary"]["same"], 4);
    assert_eq!(val["summary"]["info"], 1);

    let outcomes = val["outcomes"].as_array().expect("outcomes must be array");
    assert_eq!(outcomes.len(), 5);
    assert_eq!(outcomes[0]["field"], "Formatted ISBN");
    assert_eq!(outcomes[4]["status"], "info");

    // human summary goes to stderr, never stdout
    assert!(stderr(&output).contains("J-123: 5 fields, 4 same"));
}

#[test]
fn compare_drift_exits_one_with_expected_values() {
    let dir = tempfile::tempdir().unwrap();
    let config = keyed_config(dir.path());
    let report = dir.path().join("report.json");

    let output = bookcheck(&config)
        .args(["compare", &fixture("ticket_drift.csv"), &fixture("journal.sql"), "--quiet"])
        .arg("--output")
        .arg(&report)
        .output()
        .unwrap();

    assert_eq!(code(&output), 1);
    assert!(output.stdout.is_empty(), "no --json, nothing on stdout");
    assert!(stderr(&output).contains("error: 2 mismatched, 0 failed field(s)"));

    let val: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    let outcomes = val["outcomes"].as_array().unwrap();
    assert_eq!(outcomes[1]["status"], "mismatch");
    assert_eq!(outcomes[1]["expected"], "Modern Review (2nd)");
    assert_eq!(outcomes[2]["status"], "same", "2.0 and 2 are the same edition");
    assert_eq!(outcomes[3]["expected"], "");
}

#[test]
fn compare_cover_decrypts_and_signs() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        &format!(
            "[crypto]\nsecret_key = \"{KEY}\"\n\n[storage]\nbucket = \"covers\"\n\
             access_key_id = \"AKIDEXAMPLE\"\nsecret_access_key = \"SECRET\"\nurl_expiry_secs = 600\n"
        ),
    );

    let output = bookcheck(&config)
        .args(["compare", &fixture("ticket_cover.csv"), &fixture("journal_cover.sql"), "--json", "-q"])
        .output()
        .unwrap();

    assert_eq!(code(&output), 0, "stderr: {}", stderr(&output));
    let val = assert_single_json(&output);
    let outcomes = val["outcomes"].as_array().unwrap();
    assert_eq!(outcomes.len(), 6);

    let url = outcomes[4]["signed_url"].as_str().expect("signed url");
    assert!(url.starts_with("https://covers.s3.amazonaws.com/covers/9780323987654/cover.jpg?"));
    assert!(url.contains("X-Amz-Expires=600"));
    assert_eq!(outcomes[5]["decrypted"], "Jane Doe");
}

#[test]
fn compare_secret_from_environment() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "");

    let output = bookcheck(&config)
        .env("BOOKCHECK_SECRET_KEY", "some other passphrase")
        .args(["compare", &fixture("ticket_cover.csv"), &fixture("journal_cover.sql"), "--json", "-q"])
        .output()
        .unwrap();

    // wrong key: the field fails, the run still completes
    assert_eq!(code(&output), 1);
    let val = assert_single_json(&output);
    let pm = &val["outcomes"][5];
    assert_eq!(pm["status"], "error");
    assert_eq!(pm["needs_manual_decryption"], true);
    assert!(val["outcomes"][4].get("signed_url").is_none());
}

#[test]
fn compare_without_secret() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "");

    // no stored cover: nothing encrypted is read
    let output = bookcheck(&config)
        .args(["compare", &fixture("ticket.csv"), &fixture("journal.sql")])
        .output()
        .unwrap();
    assert_eq!(code(&output), 0, "stderr: {}", stderr(&output));

    let output = bookcheck(&config)
        .args(["compare", &fixture("ticket_cover.csv"), &fixture("journal_cover.sql"), "--json", "-q"])
        .output()
        .unwrap();
    assert_eq!(code(&output), 1);
    let val = assert_single_json(&output);
    let pm = &val["outcomes"][5];
    assert_eq!(pm["status"], "error");
    assert_eq!(pm["needs_manual_decryption"], true);
    assert_eq!(pm["error"], "decryption failed: no cipher secret configured");

    let output = bookcheck(&config).args(["decrypt", "gAAAAA"]).output().unwrap();
    assert_eq!(code(&output), 6);
    assert!(stderr(&output).contains("hint:  set BOOKCHECK_SECRET_KEY"));
}

#[test]
fn compare_missing_record_exits_four() {
    let dir = tempfile::tempdir().unwrap();
    let config = keyed_config(dir.path());
    let dump = dir.path().join("empty.sql");
    std::fs::write(&dump, "-- nothing exported\n").unwrap();

    let output = bookcheck(&config)
        .args(["compare", &fixture("ticket.csv")])
        .arg(&dump)
        .output()
        .unwrap();

    assert_eq!(code(&output), 4);
    assert!(stderr(&output).contains("no matching record for 'J-123'"));
}

#[test]
fn compare_unreadable_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let config = keyed_config(dir.path());

    let missing = bookcheck(&config)
        .args(["compare", "does-not-exist.csv", &fixture("journal.sql")])
        .output()
        .unwrap();
    assert_eq!(code(&missing), 3);

    let header_only = dir.path().join("header.csv");
    std::fs::write(&header_only, "Formatted ISBN,Book Title\n").unwrap();
    let output = bookcheck(&config)
        .arg("compare")
        .arg(&header_only)
        .arg(fixture("journal.sql"))
        .output()
        .unwrap();
    assert_eq!(code(&output), 5);

    let pdf = bookcheck(&config)
        .args(["compare", "ticket.pdf", &fixture("journal.sql")])
        .output()
        .unwrap();
    assert_eq!(code(&pdf), 2);
}

// ===========================================================================
// bookcheck extract / encrypt / decrypt / keygen / validate
// ===========================================================================

#[test]
fn extract_prints_record_json() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "");

    let output = bookcheck(&config)
        .args(["extract", &fixture("journal_cover.sql")])
        .output()
        .unwrap();

    assert_eq!(code(&output), 0, "stderr: {}", stderr(&output));
    let val = assert_single_json(&output);
    assert_eq!(val["identifier"], "9780323987654");
    assert_eq!(val["cslStylePath"], "csl/elsevier-harvard.csl");
    assert_eq!(val["coverImagePath"], "covers/9780323987654/cover.jpg");
}

#[test]
fn decrypt_fixture_token() {
    let dir = tempfile::tempdir().unwrap();
    let config = keyed_config(dir.path());
    let token = "gAAAAABq1QTVvWAKOmK_PpeEru_K3KeTT9TVd-uADRW8BA1nf5DLrAY8sCWitN2Ijq4N11c-ebMQOj8OyylpVOPjz9UQPjH9gw==";

    let output = bookcheck(&config).args(["decrypt", token]).output().unwrap();
    assert_eq!(code(&output), 0);
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "Jane Doe");

    let wrong = bookcheck(&config)
        .env("BOOKCHECK_SECRET_KEY", "not it")
        .args(["decrypt", token])
        .output()
        .unwrap();
    assert_eq!(code(&wrong), 7);
    assert!(stderr(&wrong).contains("decryption failed"));
    assert!(stderr(&wrong).contains("secret taken from environment"));
}

#[test]
fn encrypt_then_decrypt() {
    let dir = tempfile::tempdir().unwrap();
    let config = keyed_config(dir.path());

    let output = bookcheck(&config)
        .args(["encrypt", "Ana María"])
        .output()
        .unwrap();
    assert_eq!(code(&output), 0);
    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    assert!(token.starts_with("gAAAAA"));

    let output = bookcheck(&config).args(["decrypt", &token]).output().unwrap();
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "Ana María");
}

#[test]
fn keygen_prints_usable_key() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "");

    let output = bookcheck(&config).arg("keygen").output().unwrap();
    assert_eq!(code(&output), 0);
    let key = String::from_utf8_lossy(&output.stdout).trim().to_string();
    assert_eq!(key.len(), 44);

    let encrypted = bookcheck(&config)
        .env("BOOKCHECK_SECRET_KEY", &key)
        .args(["encrypt", "x"])
        .output()
        .unwrap();
    assert_eq!(code(&encrypted), 0);
}

#[test]
fn validate_reports_config_errors() {
    let dir = tempfile::tempdir().unwrap();

    let good = keyed_config(dir.path());
    let output = bookcheck(&good).arg("validate").output().unwrap();
    assert_eq!(code(&output), 0, "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("secret:     config file"));

    let bad = write_config(dir.path(), "[storage]\nurl_expiry_secs = 0\n");
    let output = bookcheck(&bad).arg("validate").output().unwrap();
    assert_eq!(code(&output), 6);

    let broken = write_config(dir.path(), "[storage\n");
    let output = bookcheck(&broken).arg("validate").output().unwrap();
    assert_eq!(code(&output), 6);

    let output = bookcheck(&dir.path().join("absent.toml"))
        .arg("validate")
        .output()
        .unwrap();
    assert_eq!(code(&output), 2);
}
