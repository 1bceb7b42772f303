//! CLI Tests
//!
//! Exit codes and the stdout/stderr split of the binary.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;
use token_janitor::store::{OwnerRef, StoreDocument, TokenRecord, UserInfo};

fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("token-janitor").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

fn write_store(dir: &TempDir) -> PathBuf {
    let alice = UserInfo {
        uid: "1000".into(),
        resolver: "ldap".into(),
        realm: "corp".into(),
        username: "alice".into(),
        givenname: "Alice".into(),
        surname: "Smith".into(),
        attributes: Default::default(),
    };
    let owned = TokenRecord::new("A1", "hotp")
        .with_description("temp-a")
        .with_otpkey("3132")
        .with_owner(OwnerRef {
            user_id: "1000".into(),
            resolver: "ldap".into(),
            realm: "corp".into(),
        });
    let document = StoreDocument {
        tokens: vec![
            owned,
            TokenRecord::new("A2", "totp").with_description("temp-a").with_otpkey("3334"),
            TokenRecord::new("B1", "spass").with_description("perm-b"),
        ],
        users: vec![alice],
        realms: vec!["lab".into()],
    };

    let path = dir.path().join("tokens.json");
    std::fs::write(&path, serde_json::to_vec_pretty(&document).unwrap()).unwrap();
    path
}

fn serials(path: &Path) -> Vec<String> {
    let document: StoreDocument = serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
    document.tokens.into_iter().map(|t| t.serial).collect()
}

#[test]
fn list_goes_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let store = write_store(&dir);

    cmd()
        .arg("--store")
        .arg(&store)
        .args(["find", "--description", "^temp", "action", "list"])
        .assert()
        .success()
        .stdout("'A1','hotp','alice','Alice','Smith','1000','ldap','corp'\n'A2','totp'\n")
        .stderr(contains("tokens processed"));
}

#[test]
fn listuser_sum() {
    let dir = tempfile::tempdir().unwrap();
    let store = write_store(&dir);

    cmd()
        .arg("--store")
        .arg(&store)
        .args(["find", "action", "listuser", "--sum"])
        .assert()
        .success()
        .stdout(contains("'alice','Alice','Smith','1000','ldap','corp',1"))
        .stdout(contains("N/A, , , , , ,2"));
}

#[test]
fn delete_by_pattern_in_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let store = write_store(&dir);

    cmd()
        .arg("--store")
        .arg(&store)
        .args(["find", "--description", "^temp", "--chunksize", "1", "action", "delete"])
        .assert()
        .success()
        .stdout("Deleting token A1\nDeleting token A2\n");

    assert_eq!(serials(&store), vec!["B1"]);
}

#[test]
fn csv_export_reports_skips_on_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let store = write_store(&dir);

    cmd()
        .arg("--store")
        .arg(&store)
        .args(["find", "action", "export", "--format", "csv"])
        .assert()
        .success()
        .stdout("alice@corp, A1, 3132, hotp, 6\nn/a, A2, 3334, totp, 6, 30\n")
        .stderr(contains("Skipping token B1"));
}

#[test]
fn pskc_export_key_only_on_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let store = write_store(&dir);

    cmd()
        .arg("--store")
        .arg(&store)
        .args(["find", "--tokentype", "hotp", "action", "export"])
        .assert()
        .success()
        .stdout(contains("<KeyContainer").and(contains("AES encryption key").not()))
        .stderr(contains("1 tokens exported.").and(contains("AES encryption key")));
}

#[test]
fn malformed_criterion_exits_non_zero() {
    let dir = tempfile::tempdir().unwrap();
    let store = write_store(&dir);

    cmd()
        .arg("--store")
        .arg(&store)
        .args(["find", "--tokeninfo", "hashlib >= sha1", "action", "delete"])
        .assert()
        .code(1)
        .stdout("")
        .stderr(contains("JANITOR_INVALID_CRITERION"));

    assert_eq!(serials(&store).len(), 3);
}

#[test]
fn unknown_field_exits_non_zero() {
    let dir = tempfile::tempdir().unwrap();
    let store = write_store(&dir);

    cmd()
        .arg("--store")
        .arg(&store)
        .args(["find", "--tokenattribute", "color == red", "action", "list"])
        .assert()
        .code(1)
        .stderr(contains("color"));
}

#[test]
fn unknown_action_is_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = write_store(&dir);

    cmd()
        .arg("--store")
        .arg(&store)
        .args(["find", "action", "mark"])
        .assert()
        .code(2);
}

#[test]
fn unknown_realm_exits_non_zero() {
    let dir = tempfile::tempdir().unwrap();
    let store = write_store(&dir);

    cmd()
        .arg("--store")
        .arg(&store)
        .args(["find", "action", "set_realms", "--realms", "mars"])
        .assert()
        .code(1)
        .stderr(contains("JANITOR_INVALID_ACTION"));
}

#[test]
fn missing_store_is_config_error() {
    cmd()
        .args(["find", "action", "list"])
        .assert()
        .code(1)
        .stderr(contains("JANITOR_CONFIG_ERROR"));
}

#[test]
fn config_file_supplies_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = write_store(&dir);
    let config = dir.path().join("janitor.json");
    std::fs::write(
        &config,
        serde_json::json!({ "store_path": store, "chunk_size": 2, "log_level": "warn" }).to_string(),
    )
    .unwrap();

    cmd()
        .arg("--config")
        .arg(&config)
        .args(["find", "--serial", "^B", "action", "set_description", "--description", "retired"])
        .assert()
        .success()
        .stdout("Setting description for token B1: retired\n")
        .stderr(contains("tokens processed").not());
}

#[test]
fn disable_twice_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let store = write_store(&dir);

    for expected in ["Disabling token B1\n", ""] {
        cmd()
            .arg("--store")
            .arg(&store)
            .args(["find", "--serial", "^B1$", "action", "disable"])
            .assert()
            .success()
            .stdout(expected);
    }
}

#[test]
fn boolean_column_filter() {
    let dir = tempfile::tempdir().unwrap();
    let store = write_store(&dir);

    cmd()
        .arg("--store")
        .arg(&store)
        .args(["find", "--serial", "^B1$", "action", "disable"])
        .assert()
        .success();

    cmd()
        .arg("--store")
        .arg(&store)
        .args(["find", "--tokenattribute", "active == False", "action", "list"])
        .assert()
        .success()
        .stdout("'B1','spass'\n");

    cmd()
        .arg("--store")
        .arg(&store)
        .args(["find", "--tokenattribute", "active == maybe", "action", "list"])
        .assert()
        .code(1)
        .stdout("")
        .stderr(contains("JANITOR_INVALID_CRITERION"));
}
