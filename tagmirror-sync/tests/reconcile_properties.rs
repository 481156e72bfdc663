use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tagmirror_core::{parse_last_modified, ArtifactReference, Repository, Tag, TagTimestamp};
use tagmirror_sync::{
    run_pass, ArtifactFetcher, FetchError, FreshnessStore, MtimeFreshness, Reconciler, SyncError,
    TagCatalog, TagResult,
};
use tempfile::TempDir;

const V1_FIRST: &str = "Mon, 02 Jan 2006 15:04:05 -0700";
const V1_REBUILT: &str = "Tue, 03 Jan 2006 15:04:05 -0700";

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn parsed(raw: &str) -> DateTime<Utc> {
    parse_last_modified(raw).expect("fixture timestamp")
}

/// Catalog whose contents the test rewrites between passes.
#[derive(Default)]
struct ScriptedCatalog {
    tags: Mutex<HashMap<String, Option<Vec<Tag>>>>,
}

impl ScriptedCatalog {
    fn set(&self, remote: &str, tags: &[(&str, &str)]) {
        let tags = tags
            .iter()
            .map(|(name, raw)| {
                let last_modified = parse_last_modified(raw)
                    .map(TagTimestamp::Known)
                    .unwrap_or_else(|_| TagTimestamp::Unparsable(raw.to_string()));
                Tag::new(*name, last_modified)
            })
            .collect();
        self.tags
            .lock()
            .unwrap()
            .insert(remote.to_string(), Some(tags));
    }

    fn fail(&self, remote: &str) {
        self.tags.lock().unwrap().insert(remote.to_string(), None);
    }
}

impl TagCatalog for ScriptedCatalog {
    fn list_tags(&self, repository: &Repository) -> Result<Vec<Tag>, SyncError> {
        match self.tags.lock().unwrap().get(&repository.remote_name.0) {
            Some(Some(tags)) => Ok(tags.clone()),
            _ => Err(SyncError::CatalogStatus {
                url: repository.remote_name.0.clone(),
                status: 503,
            }),
        }
    }
}

/// Fetcher that writes a marker file and records every call.
#[derive(Default)]
struct FakeFetcher {
    calls: Mutex<Vec<(String, PathBuf)>>,
    fail_next: Mutex<bool>,
}

impl FakeFetcher {
    fn calls(&self) -> Vec<(String, PathBuf)> {
        self.calls.lock().unwrap().clone()
    }

    fn fail_next_pull(&self) {
        *self.fail_next.lock().unwrap() = true;
    }
}

impl ArtifactFetcher for FakeFetcher {
    fn pull(&self, reference: &ArtifactReference, destination: &Path) -> Result<(), FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((reference.to_string(), destination.to_path_buf()));

        fs::write(destination.join("report.json"), reference.to_string()).expect("write payload");

        let mut fail = self.fail_next.lock().unwrap();
        if *fail {
            *fail = false;
            return Err(FetchError::Exit {
                tool: "oras".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "connection reset".to_string(),
            });
        }
        Ok(())
    }
}

struct Fixture {
    store: TempDir,
    catalog: Arc<ScriptedCatalog>,
    fetcher: Arc<FakeFetcher>,
    reconciler: Reconciler,
}

fn fixture() -> Fixture {
    init_logging();
    let store = TempDir::new().expect("store");
    let catalog = Arc::new(ScriptedCatalog::default());
    let fetcher = Arc::new(FakeFetcher::default());
    let reconciler = Reconciler::new(store.path(), "quay.io", catalog.clone(), fetcher.clone());
    Fixture {
        store,
        catalog,
        fetcher,
        reconciler,
    }
}

fn recorded(path: &Path) -> Option<DateTime<Utc>> {
    MtimeFreshness.recorded(path).expect("probe")
}

#[test]
fn first_sync_creates_directory_pulls_and_sets_mtime() {
    let fx = fixture();
    let repo = Repository::parse("org/repo").unwrap();
    fx.catalog.set("org/repo", &[("v1", V1_FIRST)]);

    let report = fx.reconciler.reconcile(&repo, false).expect("reconcile");

    let expected = fx.store.path().join("repo").join("v1");
    assert!(expected.is_dir());
    assert_eq!(
        fx.fetcher.calls(),
        vec![("quay.io/org/repo:v1".to_string(), expected.clone())]
    );
    assert_eq!(recorded(&expected), Some(parsed(V1_FIRST)));
    assert_eq!(report.counts().created, 1);
}

#[test]
fn second_pass_with_unchanged_catalog_is_a_no_op() {
    let fx = fixture();
    let repo = Repository::parse("org/repo").unwrap();
    fx.catalog.set("org/repo", &[("v1", V1_FIRST), ("v0", V1_FIRST)]);

    fx.reconciler.reconcile(&repo, false).expect("first pass");
    let dir = fx.store.path().join("repo").join("v1");
    let sentinel = dir.join("report.json");
    let before_mtime = recorded(&dir);
    let before_content = fs::read_to_string(&sentinel).unwrap();
    let calls_before = fx.fetcher.calls().len();

    let report = fx.reconciler.reconcile(&repo, false).expect("second pass");

    assert_eq!(fx.fetcher.calls().len(), calls_before, "no pull on second pass");
    assert_eq!(recorded(&dir), before_mtime);
    assert_eq!(fs::read_to_string(&sentinel).unwrap(), before_content);
    assert!(report
        .results
        .iter()
        .all(|r| matches!(r, TagResult::Unchanged { .. })));
}

#[test]
fn newer_remote_timestamp_replaces_exactly_once() {
    let fx = fixture();
    let repo = Repository::parse("org/repo").unwrap();
    fx.catalog.set("org/repo", &[("v1", V1_FIRST)]);
    fx.reconciler.reconcile(&repo, false).expect("first pass");

    let dir = fx.store.path().join("repo").join("v1");
    fs::write(dir.join("stale-only.txt"), "old build").unwrap();
    // Writing into the directory moved its mtime; restore the marker.
    MtimeFreshness.record(&dir, parsed(V1_FIRST)).unwrap();

    fx.catalog.set("org/repo", &[("v1", V1_REBUILT)]);
    let report = fx.reconciler.reconcile(&repo, false).expect("replace pass");
    assert_eq!(report.counts().replaced, 1);
    assert!(!dir.join("stale-only.txt").exists(), "old tree removed");
    assert_eq!(recorded(&dir), Some(parsed(V1_REBUILT)));
    assert_eq!(fx.fetcher.calls().len(), 2);

    let again = fx.reconciler.reconcile(&repo, false).expect("settled pass");
    assert_eq!(again.counts().unchanged, 1);
    assert_eq!(fx.fetcher.calls().len(), 2, "replace happens only once");
}

#[test]
fn equal_or_older_remote_timestamp_never_downgrades() {
    let fx = fixture();
    let repo = Repository::parse("org/repo").unwrap();
    fx.catalog.set("org/repo", &[("v1", V1_REBUILT)]);
    fx.reconciler.reconcile(&repo, false).expect("first pass");

    for older in [V1_REBUILT, V1_FIRST] {
        fx.catalog.set("org/repo", &[("v1", older)]);
        let report = fx.reconciler.reconcile(&repo, false).expect("pass");
        assert_eq!(report.counts().unchanged, 1, "timestamp {older}");
    }

    let dir = fx.store.path().join("repo").join("v1");
    assert_eq!(fx.fetcher.calls().len(), 1);
    assert_eq!(recorded(&dir), Some(parsed(V1_REBUILT)));
    assert!(dir.join("report.json").exists());
}

#[test]
fn catalog_failure_for_one_repository_does_not_block_the_next() {
    let fx = fixture();
    let repos = Repository::parse_list("org/broken,org/healthy").unwrap();
    fx.catalog.fail("org/broken");
    fx.catalog.set("org/healthy", &[("v1", V1_FIRST)]);

    let pass = run_pass(&fx.reconciler, &repos, false);

    assert!(pass.repositories[0].result.is_err());
    let healthy = pass.repositories[1].result.as_ref().expect("healthy repo");
    assert_eq!(healthy.counts().created, 1);
    assert!(fx.store.path().join("healthy").join("v1").is_dir());
    assert!(!fx.store.path().join("broken").exists());
}

#[test]
fn failed_pull_aborts_repository_and_heals_next_pass() {
    let fx = fixture();
    let repo = Repository::parse("org/repo").unwrap();
    fx.catalog.set("org/repo", &[("v1", V1_FIRST), ("v2", V1_FIRST)]);

    fx.fetcher.fail_next_pull();
    let err = fx.reconciler.reconcile(&repo, false).unwrap_err();
    assert!(matches!(err, SyncError::Pull { .. }), "got {err:?}");
    assert_eq!(fx.fetcher.calls().len(), 1, "remaining tags are not attempted");

    let v1 = fx.store.path().join("repo").join("v1");
    assert!(v1.is_dir(), "partial output is left in place");
    assert!(recorded(&v1).unwrap() < parsed(V1_FIRST));

    let report = fx.reconciler.reconcile(&repo, false).expect("healing pass");
    let counts = report.counts();
    assert_eq!(counts.replaced, 1, "partial v1 is pulled again");
    assert_eq!(counts.created, 1, "v2 is pulled for the first time");
    assert_eq!(recorded(&v1), Some(parsed(V1_FIRST)));
}

#[test]
fn failed_pull_of_tag_with_unparsable_timestamp_heals_next_pass() {
    let fx = fixture();
    let repo = Repository::parse("org/repo").unwrap();
    fx.catalog.set("org/repo", &[("latest", "garbage")]);

    fx.fetcher.fail_next_pull();
    fx.reconciler.reconcile(&repo, false).unwrap_err();

    let report = fx.reconciler.reconcile(&repo, false).expect("healing pass");
    assert_eq!(report.counts().replaced, 1);
    assert_eq!(fx.fetcher.calls().len(), 2, "interrupted pull is retried");

    let latest = fx.store.path().join("repo").join("latest");
    let settled = recorded(&latest).expect("record");
    assert!(settled.timestamp() > 0, "completed pull no longer reads as pending");

    let again = fx.reconciler.reconcile(&repo, false).expect("settled pass");
    assert_eq!(again.counts().unchanged, 1);
    assert_eq!(fx.fetcher.calls().len(), 2);
}

/// Mtime store whose removal of one tag always fails.
struct LockedTagStore {
    locked: String,
}

impl FreshnessStore for LockedTagStore {
    fn recorded(&self, path: &Path) -> Result<Option<DateTime<Utc>>, SyncError> {
        MtimeFreshness.recorded(path)
    }

    fn record(&self, path: &Path, at: DateTime<Utc>) -> Result<(), SyncError> {
        MtimeFreshness.record(path, at)
    }

    fn remove(&self, path: &Path) -> Result<(), SyncError> {
        if path.ends_with(&self.locked) {
            return Err(SyncError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "locked"),
            });
        }
        MtimeFreshness.remove(path)
    }
}

#[test]
fn removal_failure_skips_only_that_tag() {
    let fx = fixture();
    let reconciler = fx.reconciler.clone().with_freshness(Arc::new(LockedTagStore {
        locked: "locked".to_string(),
    }));
    let repo = Repository::parse("org/repo").unwrap();
    fx.catalog.set("org/repo", &[("locked", V1_FIRST), ("v1", V1_FIRST)]);
    reconciler.reconcile(&repo, false).expect("first pass");

    fx.catalog.set("org/repo", &[("locked", V1_REBUILT), ("v1", V1_REBUILT)]);
    let report = reconciler.reconcile(&repo, false).expect("pass continues");

    let locked = fx.store.path().join("repo").join("locked");
    assert!(matches!(report.results[0], TagResult::Failed { .. }), "got {:?}", report.results[0]);
    assert!(matches!(report.results[1], TagResult::Replaced { .. }));
    assert_eq!(recorded(&locked), Some(parsed(V1_FIRST)));
    assert!(locked.join("report.json").exists(), "old content kept");
    assert_eq!(fx.fetcher.calls().len(), 3);
}
