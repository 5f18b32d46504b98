// SPDX-License-Identifier: Apache-2.0

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

const SECRET: &str = "cli-contract-secret-0123456789";

fn bazaar() -> Command {
    let mut cmd = Command::cargo_bin("bazaar").expect("bazaar binary");
    cmd.env_remove("BAZAAR_TOKEN_SECRET").env_remove("RUST_LOG");
    cmd
}

fn json_stdout(cmd: &mut Command) -> Value {
    let output = cmd.output().expect("run bazaar");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("json stdout")
}

#[test]
fn help_lists_operator_commands() {
    bazaar()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("migrate"))
        .stdout(predicate::str::contains("inspect-db"))
        .stdout(predicate::str::contains("set-commission"));
}

#[test]
fn unknown_flag_is_a_usage_error_with_machine_output() {
    let output = bazaar()
        .args(["--json", "--unknown-flag"])
        .output()
        .expect("run bad cli");
    assert_eq!(output.status.code(), Some(2));
    let err: Value = serde_json::from_slice(&output.stderr).expect("machine error");
    assert_eq!(err["code"], "usage_error");
}

#[test]
fn migrate_then_inspect_reports_schema_and_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("bazaar.sqlite");
    let db = db.to_str().expect("utf8 path");

    let migrated = json_stdout(bazaar().args(["--json", "migrate", "--db", db]));
    assert_eq!(migrated["schema_version"], 1);

    let report = json_stdout(bazaar().args(["--json", "inspect-db", "--db", db]));
    assert_eq!(report["schema_version"], report["supported_schema_version"]);
    assert_eq!(report["row_counts"]["users"], 0);
    assert_eq!(report["row_counts"]["settings"], 1);
    assert_eq!(report["commission_bps"], 1000);
}

#[test]
fn inspect_of_missing_file_is_a_dependency_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("nope.sqlite");
    bazaar()
        .args(["inspect-db", "--db", missing.to_str().expect("utf8 path")])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("database not found"));
    assert!(!missing.exists());
}

#[test]
fn promote_and_commission_change_the_database() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("bazaar.sqlite");
    let db = db.to_str().expect("utf8 path");

    let promoted = json_stdout(bazaar().args(["--json", "user", "promote", "--db", db, "--user", "ops-lead"]));
    assert_eq!(promoted["role"], "admin");

    bazaar()
        .args(["user", "promote", "--db", db, "--user", "ops-lead", "--role", "emperor"])
        .assert()
        .code(3);

    let rate = json_stdout(bazaar().args(["--json", "set-commission", "--db", db, "--rate", "0.125"]));
    assert_eq!(rate["commission_bps"], 1250);
    bazaar()
        .args(["set-commission", "--db", db, "--rate", "1.5"])
        .assert()
        .code(3);

    let report = json_stdout(bazaar().args(["--json", "inspect-db", "--db", db]));
    assert_eq!(report["row_counts"]["users"], 1);
    assert_eq!(report["commission_bps"], 1250);
}

#[test]
fn issued_tokens_verify_with_the_same_secret_only() {
    let issued = json_stdout(
        bazaar()
            .env("BAZAAR_TOKEN_SECRET", SECRET)
            .args(["--json", "token", "issue", "--sub", "alice", "--ttl-secs", "600"]),
    );
    let token = issued["token"].as_str().expect("token").to_string();
    assert_eq!(issued["sub"], "alice");

    let verified = json_stdout(
        bazaar().args(["--json", "token", "verify", "--token", &token, "--secret", SECRET]),
    );
    assert_eq!(verified["sub"], "alice");
    assert_eq!(verified["exp"], issued["exp"]);

    bazaar()
        .args(["token", "verify", "--token", &token, "--secret", "a-different-secret-entirely"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("token rejected"));
}

#[test]
fn token_issue_requires_a_usable_secret() {
    bazaar()
        .args(["token", "issue", "--sub", "alice"])
        .assert()
        .code(2);
    bazaar()
        .args(["token", "issue", "--sub", "alice", "--secret", "short"])
        .assert()
        .code(3);
    bazaar()
        .args(["token", "issue", "--sub", "Not Valid!", "--secret", SECRET])
        .assert()
        .code(3);
}
