use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use filetime::FileTime;
use predicates::str::contains;
use tempfile::TempDir;

const ENV_VARS: &[&str] = &[
    "QUAY_ORG_REPOS",
    "SYNC_INTERVAL_MINUTES",
    "PORT",
    "STORE_ROOT",
    "REGISTRY_HOST",
    "PULL_TOOL",
    "PULL_TIMEOUT_SECONDS",
    "LOG_FORMAT",
];

/// `tagmirror` with a clean environment rooted at `store`.
fn tagmirror_cmd(store: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("tagmirror"));
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.env("STORE_ROOT", store);
    cmd
}

fn seed_tag(store: &Path, dir: &str, tag: &str, unix_seconds: i64) {
    let path = store.join(dir).join(tag);
    std::fs::create_dir_all(&path).unwrap();
    filetime::set_file_mtime(&path, FileTime::from_unix_time(unix_seconds, 0)).unwrap();
}

#[test]
fn sync_without_repositories_is_a_configuration_error() {
    let store = TempDir::new().unwrap();
    tagmirror_cmd(store.path())
        .arg("sync")
        .assert()
        .failure()
        .stderr(contains("QUAY_ORG_REPOS"));
}

#[test]
fn serve_without_port_refuses_to_start() {
    let store = TempDir::new().unwrap();
    tagmirror_cmd(store.path())
        .env("QUAY_ORG_REPOS", "org/image")
        .arg("serve")
        .assert()
        .failure()
        .stderr(contains("PORT"));
}

#[test]
fn serve_with_unparsable_port_refuses_to_start() {
    let store = TempDir::new().unwrap();
    tagmirror_cmd(store.path())
        .env("QUAY_ORG_REPOS", "org/image")
        .env("PORT", "eighty")
        .arg("serve")
        .assert()
        .failure()
        .stderr(contains("invalid listen port 'eighty'"));
}

#[test]
fn status_lists_mirrored_tags() {
    let store = TempDir::new().unwrap();
    // Mon, 02 Jan 2006 15:04:05 -0700
    seed_tag(store.path(), "image", "v1", 1_136_239_445);
    seed_tag(store.path(), "image", "v2", 1_136_325_845);
    seed_tag(store.path(), "unlisted", "v1", 1_136_239_445);

    tagmirror_cmd(store.path())
        .env("QUAY_ORG_REPOS", "org/image")
        .arg("status")
        .assert()
        .success()
        .stdout(contains("2 tags"))
        .stdout(contains("org/image"))
        .stdout(contains("2006-01-02 22:04:05 UTC"));
}

#[test]
fn status_json_flags_interrupted_pulls() {
    let store = TempDir::new().unwrap();
    seed_tag(store.path(), "image", "broken", 0);

    let output = tagmirror_cmd(store.path())
        .args(["--repos", "org/image", "status", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let records: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(records[0]["tag"], "broken");
    assert_eq!(records[0]["pending"], true);
    assert!(records[0]["last_modified"].is_null());
}

#[test]
fn status_on_empty_store_suggests_sync() {
    let store = TempDir::new().unwrap();
    tagmirror_cmd(store.path())
        .env("QUAY_ORG_REPOS", "org/image")
        .arg("status")
        .assert()
        .success()
        .stdout(contains("Nothing mirrored yet"));
}

#[test]
fn sync_reports_unreachable_registry_per_repository() {
    let store = TempDir::new().unwrap();
    tagmirror_cmd(store.path())
        .env("QUAY_ORG_REPOS", "org/image,org/other")
        .env("REGISTRY_HOST", "127.0.0.1:1")
        .arg("sync")
        .assert()
        .failure()
        .stdout(contains("org/image"))
        .stdout(contains("org/other"))
        .stderr(contains("2 of 2 repositories failed to sync"));
}

#[test]
fn tags_rejects_repository_without_usable_directory_name() {
    let store = TempDir::new().unwrap();
    tagmirror_cmd(store.path())
        .args(["tags", "org/.."])
        .assert()
        .failure()
        .stderr(contains("invalid repository entry"));
}
