mod downloader;
pub mod entry;
pub mod filter;
pub mod listing;
pub mod reconciler;
pub mod store;
mod uploader;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;

use crate::error::SyncError;
use crate::util::path as sync_path;

use entry::FileEntry;
use filter::FilterCriteria;
use listing::DirectoryListing;
use reconciler::{SyncDecision, SyncPlan};
use store::RemoteStore;

/// Which side is authoritative for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Direction {
    /// Local directory is the source, Dropbox the mirror.
    #[value(name = "todropbox")]
    ToDropbox,
    /// Dropbox is the source, the local directory the mirror.
    #[value(name = "tolocal")]
    ToLocal,
}

impl Direction {
    pub fn transfer_decision(self) -> SyncDecision {
        match self {
            Direction::ToDropbox => SyncDecision::Upload,
            Direction::ToLocal => SyncDecision::Download,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ToDropbox => f.write_str("todropbox"),
            Direction::ToLocal => f.write_str("tolocal"),
        }
    }
}

/// What the walker does when a non-root directory cannot be listed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingFailurePolicy {
    /// Log, count the directory as failed and carry on with the rest.
    #[default]
    Skip,
    /// End the run with the error.
    Abort,
}

/// Everything a run needs besides the remote store.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub local_root: PathBuf,
    /// Normalized Dropbox path; `""` is the Dropbox root.
    pub remote_root: String,
    pub direction: Direction,
    pub filter: FilterCriteria,
    pub on_listing_failure: ListingFailurePolicy,
}

/// Outcome counts for one directory pair.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DirectoryReport {
    pub matched: usize,
    pub transferred: usize,
    pub skipped: usize,
    pub transfer_failures: usize,
    pub deleted: usize,
    pub delete_failures: usize,
}

impl DirectoryReport {
    pub fn failures(&self) -> usize {
        self.transfer_failures + self.delete_failures
    }
}

/// Totals for a whole run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub directories: usize,
    pub failed_directories: usize,
    pub transferred: usize,
    pub skipped: usize,
    pub deleted: usize,
    pub failures: usize,
}

impl SyncReport {
    fn add(&mut self, dir: &DirectoryReport) {
        self.directories += 1;
        self.transferred += dir.transferred;
        self.skipped += dir.skipped;
        self.deleted += dir.deleted;
        self.failures += dir.failures();
    }

    /// No item and no directory failed.
    pub fn is_clean(&self) -> bool {
        self.failures == 0 && self.failed_directories == 0
    }
}

/// One directory pair waiting on the walker's stack.
struct PendingDir {
    /// `/`-separated path below both roots, built from NFC names.
    relative: String,
    /// The local directory as it is spelled on disk.
    local: PathBuf,
}

/// Walks the source tree one directory at a time and mirrors each
/// directory's files onto the destination.
pub struct SyncEngine {
    store: Arc<dyn RemoteStore>,
    settings: SyncSettings,
}

impl SyncEngine {
    pub fn new(store: Arc<dyn RemoteStore>, settings: SyncSettings) -> Self {
        Self { store, settings }
    }

    /// Run one full pass.
    ///
    /// Item failures are counted in the report. Directory failures follow
    /// the listing failure policy, except that the root pair and fatal
    /// errors always end the run.
    pub async fn run(&self) -> Result<SyncReport, SyncError> {
        let started = Instant::now();
        let mut report = SyncReport::default();
        let mut stack = vec![PendingDir {
            relative: String::new(),
            local: self.settings.local_root.clone(),
        }];

        tracing::info!(
            local = %self.settings.local_root.display(),
            remote = %display_remote(&self.settings.remote_root),
            direction = %self.settings.direction,
            "starting sync"
        );

        while let Some(pending) = stack.pop() {
            let relative = pending.relative.clone();
            match self.sync_directory(pending).await {
                Ok((dir_report, children)) => {
                    report.add(&dir_report);
                    stack.extend(children);
                }
                Err(e)
                    if relative.is_empty()
                        || e.is_fatal()
                        || self.settings.on_listing_failure == ListingFailurePolicy::Abort =>
                {
                    tracing::error!(
                        dir = sync_path::display_relative(&relative),
                        error = %e,
                        "sync aborted"
                    );
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(
                        dir = sync_path::display_relative(&relative),
                        error = %e,
                        "skipping directory"
                    );
                    report.failed_directories += 1;
                }
            }
        }

        tracing::info!(
            directories = report.directories,
            failed_directories = report.failed_directories,
            transferred = report.transferred,
            skipped = report.skipped,
            deleted = report.deleted,
            failures = report.failures,
            elapsed = ?started.elapsed(),
            "sync finished"
        );
        Ok(report)
    }

    /// Sync one directory pair. Returns its report and the source side's
    /// subdirectories.
    async fn sync_directory(
        &self,
        pending: PendingDir,
    ) -> Result<(DirectoryReport, Vec<PendingDir>), SyncError> {
        let PendingDir {
            relative,
            local: local_dir,
        } = pending;
        let remote_dir = sync_path::join_remote(&self.settings.remote_root, &relative);
        let direction = self.settings.direction;

        tracing::debug!(dir = sync_path::display_relative(&relative), "syncing directory");

        self.prepare_local(&local_dir).await?;
        let remote = self.list_remote(&remote_dir).await?;
        let local = listing::list_local(&local_dir).await?;
        let on_disk = local.local_paths();

        let (source, destination) = match direction {
            Direction::ToDropbox => (local, remote),
            Direction::ToLocal => (remote, local),
        };

        let source_files = source.files.len();
        let matched = self.settings.filter.apply(source.files).await;
        tracing::info!("Filter source files: {} -> {}", source_files, matched.len());

        let destination_files = destination.files.len();
        let plan = reconciler::reconcile(matched, destination.files, direction).await;
        for (name, decision) in plan.decisions() {
            tracing::trace!(file = name, ?decision, "planned");
        }

        let children = source
            .directories
            .iter()
            .filter(|dir| !self.settings.filter.excludes_name(dir.name()))
            .map(|dir| PendingDir {
                relative: sync_path::join_relative(&relative, dir.name()),
                local: local_target(&on_disk, &local_dir, dir.name()),
            })
            .collect();

        let mut report = DirectoryReport {
            matched: plan.matched(),
            ..Default::default()
        };
        let pair = Pair {
            local_dir: &local_dir,
            on_disk: &on_disk,
            remote_dir: &remote_dir,
        };
        self.execute(plan, destination_files, &pair, &mut report).await?;
        Ok((report, children))
    }

    /// Make sure the local side of a pair is a usable directory.
    async fn prepare_local(&self, local_dir: &Path) -> Result<(), SyncError> {
        match tokio::fs::metadata(local_dir).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(SyncError::Config(format!(
                "{} is not a directory",
                local_dir.display()
            ))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => match self.settings.direction {
                Direction::ToDropbox => Err(SyncError::NotFound(format!(
                    "local directory {}",
                    local_dir.display()
                ))),
                Direction::ToLocal => {
                    tracing::info!(dir = %local_dir.display(), "creating local directory");
                    tokio::fs::create_dir_all(local_dir).await.map_err(|e| {
                        SyncError::io(format!("cannot create {}", local_dir.display()), e)
                    })
                }
            },
            Err(e) => Err(SyncError::io(
                format!("cannot stat {}", local_dir.display()),
                e,
            )),
        }
    }

    /// List the remote side. A missing folder is created when pushing.
    async fn list_remote(&self, remote_dir: &str) -> Result<DirectoryListing, SyncError> {
        match listing::list_remote(self.store.as_ref(), remote_dir).await {
            Err(e) if e.is_not_found() && self.settings.direction == Direction::ToDropbox => {
                tracing::info!(path = %display_remote(remote_dir), "creating Dropbox folder");
                self.store.create_folder(remote_dir).await?;
                Ok(DirectoryListing::default())
            }
            other => other,
        }
    }

    /// Run a plan: deletions first, then transfers. Item failures are
    /// counted; only fatal errors are returned.
    async fn execute(
        &self,
        plan: SyncPlan,
        destination_files: usize,
        pair: &Pair<'_>,
        report: &mut DirectoryReport,
    ) -> Result<(), SyncError> {
        if !plan.deletions.is_empty() {
            tracing::debug!(count = plan.deletions.len(), "files to delete");
            for entry in &plan.deletions {
                match self.delete(entry).await {
                    Ok(()) => report.deleted += 1,
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        tracing::warn!(file = entry.name(), error = %e, "delete failed");
                        report.delete_failures += 1;
                    }
                }
            }
            tracing::info!("Success delete {}/{}", report.deleted, destination_files);
        }

        for entry in &plan.skipped {
            tracing::debug!(file = entry.name(), "skip existing");
        }
        report.skipped = plan.skipped.len();

        for entry in &plan.transfers {
            let result = match plan.direction {
                Direction::ToDropbox => {
                    uploader::upload(self.store.as_ref(), entry, pair.remote_dir).await
                }
                Direction::ToLocal => {
                    let dest = local_target(pair.on_disk, pair.local_dir, entry.name());
                    downloader::download(self.store.as_ref(), entry, &dest).await
                }
            };
            match result {
                Ok(()) => report.transferred += 1,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(file = entry.name(), error = %e, "transfer failed");
                    report.transfer_failures += 1;
                }
            }
        }

        let verb = match plan.direction {
            Direction::ToDropbox => "Upload",
            Direction::ToLocal => "Download",
        };
        tracing::info!("{verb} {}", transfer_summary(report));
        Ok(())
    }

    /// Delete one destination file. A file that is already gone counts as
    /// deleted.
    async fn delete(&self, entry: &FileEntry) -> Result<(), SyncError> {
        let started = Instant::now();
        scopeguard::defer! {
            tracing::debug!(file = entry.name(), elapsed = ?started.elapsed(), "delete finished");
        }
        match entry.delete(self.store.as_ref()).await {
            Err(e) if e.is_not_found() => {
                tracing::debug!(file = entry.name(), "already deleted");
                Ok(())
            }
            other => other,
        }
    }
}

/// Both sides of the directory pair being executed.
struct Pair<'a> {
    local_dir: &'a Path,
    /// Existing local entries by NFC name.
    on_disk: &'a HashMap<String, PathBuf>,
    remote_dir: &'a str,
}

/// Local path for `name`: the existing entry's own spelling when there is
/// one, otherwise the name under `local_dir`.
fn local_target(on_disk: &HashMap<String, PathBuf>, local_dir: &Path, name: &str) -> PathBuf {
    on_disk
        .get(name)
        .cloned()
        .unwrap_or_else(|| local_dir.join(name))
}

/// `N/M` plus the non-zero skip and failure counts.
fn transfer_summary(report: &DirectoryReport) -> String {
    let mut line = format!("{}/{}", report.transferred, report.matched);
    if report.skipped > 0 {
        line.push_str(&format!(" Skip {}", report.skipped));
    }
    if report.transfer_failures > 0 {
        line.push_str(&format!(" Fails {}", report.transfer_failures));
    }
    line
}

fn display_remote(path: &str) -> &str {
    if path.is_empty() { "/" } else { path }
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::time::{Duration, SystemTime};

    use super::*;
    use crate::sync::entry::tests::at;
    use crate::sync::store::memory::MemoryStore;
    use chrono::Utc;

    fn settings(local_root: &Path, remote_root: &str, direction: Direction) -> SyncSettings {
        SyncSettings {
            local_root: local_root.to_path_buf(),
            remote_root: remote_root.to_string(),
            direction,
            filter: FilterCriteria::new(Utc::now()),
            on_listing_failure: ListingFailurePolicy::Skip,
        }
    }

    fn set_age(path: &Path, days: u64) {
        let mtime = SystemTime::now() - Duration::from_secs(days * 24 * 60 * 60);
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(mtime)
            .unwrap();
    }

    #[tokio::test]
    async fn push_mirrors_the_local_tree() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"alpha").unwrap();
        std::fs::write(dir.path().join(".hidden"), b"h").unwrap();
        std::fs::create_dir_all(dir.path().join("sub/deeper")).unwrap();
        std::fs::write(dir.path().join("sub/b.txt"), b"beta").unwrap();
        std::fs::write(dir.path().join("sub/deeper/c.txt"), b"gamma").unwrap();

        let store = Arc::new(MemoryStore::new());
        store.add_file("/backup/stale.txt", b"old", at(10));

        let engine = SyncEngine::new(
            store.clone(),
            settings(dir.path(), "/backup", Direction::ToDropbox),
        );
        let report = engine.run().await.unwrap();

        assert!(report.is_clean());
        assert_eq!(report.directories, 3);
        assert_eq!(report.transferred, 3);
        assert_eq!(report.deleted, 1);
        assert_eq!(store.file_contents("/backup/a.txt").unwrap(), b"alpha");
        assert_eq!(store.file_contents("/backup/sub/b.txt").unwrap(), b"beta");
        assert_eq!(
            store.file_contents("/backup/sub/deeper/c.txt").unwrap(),
            b"gamma"
        );
        assert!(!store.contains("/backup/.hidden"));
        assert!(!store.contains("/backup/stale.txt"));
    }

    #[tokio::test]
    async fn second_push_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"alpha").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/b.txt"), b"beta").unwrap();

        let store = Arc::new(MemoryStore::new());
        let engine = SyncEngine::new(
            store.clone(),
            settings(dir.path(), "/backup", Direction::ToDropbox),
        );
        engine.run().await.unwrap();
        let second = engine.run().await.unwrap();

        assert_eq!(second.transferred, 0);
        assert_eq!(second.deleted, 0);
        assert_eq!(second.skipped, 2);
    }

    #[tokio::test]
    async fn pull_into_missing_directory() {
        let store = Arc::new(MemoryStore::new());
        store.add_file("/photos/a.jpg", b"a", at(1_700_000_000));
        store.add_file("/photos/b.jpg", b"bb", at(1_700_000_000));
        store.add_file("/photos/2024/c.jpg", b"ccc", at(1_700_000_000));

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("mirror");
        let engine = SyncEngine::new(
            store.clone(),
            settings(&target, "/photos", Direction::ToLocal),
        );
        let report = engine.run().await.unwrap();

        assert!(report.is_clean());
        assert_eq!(report.transferred, 3);
        assert_eq!(std::fs::read(target.join("a.jpg")).unwrap(), b"a");
        assert_eq!(std::fs::read(target.join("2024/c.jpg")).unwrap(), b"ccc");

        let second = engine.run().await.unwrap();
        assert_eq!(second.transferred, 0);
        assert_eq!(second.skipped, 3);
    }

    #[tokio::test]
    async fn pull_deletes_local_extras() {
        let store = Arc::new(MemoryStore::new());
        store.add_file("/docs/keep.txt", b"keep", at(1_700_000_000));

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("extra.txt"), b"x").unwrap();
        std::fs::write(dir.path().join(".profile"), b"x").unwrap();

        let engine = SyncEngine::new(store, settings(dir.path(), "/docs", Direction::ToLocal));
        let report = engine.run().await.unwrap();

        assert_eq!(report.deleted, 2);
        assert!(dir.path().join("keep.txt").exists());
        assert!(!dir.path().join("extra.txt").exists());
        assert!(!dir.path().join(".profile").exists());
    }

    #[tokio::test]
    async fn aged_out_files_are_removed_from_dropbox() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old.log");
        std::fs::write(&old, b"old").unwrap();
        std::fs::write(dir.path().join("new.log"), b"new").unwrap();

        let store = Arc::new(MemoryStore::new());
        let engine = SyncEngine::new(
            store.clone(),
            settings(dir.path(), "/logs", Direction::ToDropbox),
        );
        engine.run().await.unwrap();
        assert!(store.contains("/logs/old.log"));

        set_age(&old, 10);
        let mut aged = settings(dir.path(), "/logs", Direction::ToDropbox);
        aged.filter = FilterCriteria::new(Utc::now()).with_max_age_days(Some(7));
        let report = SyncEngine::new(store.clone(), aged).run().await.unwrap();

        assert_eq!(report.deleted, 1);
        assert!(!store.contains("/logs/old.log"));
        assert!(store.contains("/logs/new.log"));
        assert!(old.exists());
    }

    #[tokio::test]
    async fn push_to_dropbox_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"alpha").unwrap();

        let store = Arc::new(MemoryStore::new());
        let engine = SyncEngine::new(store.clone(), settings(dir.path(), "", Direction::ToDropbox));
        engine.run().await.unwrap();

        assert_eq!(store.file_contents("/a.txt").unwrap(), b"alpha");
    }

    #[tokio::test]
    async fn missing_local_root_aborts_push() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let engine = SyncEngine::new(
            store.clone(),
            settings(&dir.path().join("missing"), "/backup", Direction::ToDropbox),
        );

        assert!(engine.run().await.unwrap_err().is_not_found());
        assert!(!store.contains("/backup"));
    }

    #[tokio::test]
    async fn local_root_that_is_a_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file");
        std::fs::write(&file, b"x").unwrap();

        let engine = SyncEngine::new(
            Arc::new(MemoryStore::new()),
            settings(&file, "/backup", Direction::ToDropbox),
        );
        assert!(engine.run().await.unwrap_err().is_fatal());
    }

    #[tokio::test]
    async fn missing_remote_root_aborts_pull() {
        let dir = tempfile::tempdir().unwrap();
        let engine = SyncEngine::new(
            Arc::new(MemoryStore::new()),
            settings(dir.path(), "/nowhere", Direction::ToLocal),
        );
        assert!(engine.run().await.unwrap_err().is_not_found());
    }

    fn tree_with_broken_subfolder() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.add_file("/src/a.txt", b"a", at(1_700_000_000));
        store.add_file("/src/broken/b.txt", b"b", at(1_700_000_000));
        store.add_file("/src/ok/c.txt", b"c", at(1_700_000_000));
        store.break_listing("/src/broken");
        store
    }

    #[tokio::test]
    async fn skip_policy_continues_past_listing_failures() {
        let dir = tempfile::tempdir().unwrap();
        let engine = SyncEngine::new(
            tree_with_broken_subfolder(),
            settings(dir.path(), "/src", Direction::ToLocal),
        );
        let report = engine.run().await.unwrap();

        assert_eq!(report.failed_directories, 1);
        assert!(!report.is_clean());
        assert!(dir.path().join("a.txt").exists());
        assert!(dir.path().join("ok/c.txt").exists());
        assert!(!dir.path().join("broken/b.txt").exists());
    }

    #[tokio::test]
    async fn abort_policy_stops_at_the_first_listing_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings(dir.path(), "/src", Direction::ToLocal);
        settings.on_listing_failure = ListingFailurePolicy::Abort;

        let engine = SyncEngine::new(tree_with_broken_subfolder(), settings);
        let err = engine.run().await.unwrap_err();
        assert!(matches!(err, SyncError::Backend(_)));
    }

    #[tokio::test]
    async fn root_listing_failure_ends_the_run_under_skip() {
        let store = tree_with_broken_subfolder();
        store.break_listing("/src");

        let dir = tempfile::tempdir().unwrap();
        let engine = SyncEngine::new(store, settings(dir.path(), "/src", Direction::ToLocal));
        assert!(engine.run().await.is_err());
    }

    #[tokio::test]
    async fn push_walks_directories_with_decomposed_names() {
        let dir = tempfile::tempdir().unwrap();
        let nfd = dir.path().join("Solidarita\u{308}t");
        std::fs::create_dir(&nfd).unwrap();
        std::fs::write(nfd.join("a.txt"), b"alpha").unwrap();

        let store = Arc::new(MemoryStore::new());
        let engine = SyncEngine::new(
            store.clone(),
            settings(dir.path(), "/backup", Direction::ToDropbox),
        );
        let report = engine.run().await.unwrap();

        assert!(report.is_clean());
        assert_eq!(report.directories, 2);
        assert_eq!(
            store.file_contents("/backup/Solidarit\u{e4}t/a.txt").unwrap(),
            b"alpha"
        );
    }

    #[tokio::test]
    async fn pull_reuses_local_names_in_decomposed_form() {
        let store = Arc::new(MemoryStore::new());
        store.add_file("/photos/Solidarit\u{e4}t/a.txt", b"new", at(1_700_000_000));
        store.add_file("/photos/Solidarit\u{e4}t.txt", b"new", at(1_700_000_000));

        let dir = tempfile::tempdir().unwrap();
        let nfd_dir = dir.path().join("Solidarita\u{308}t");
        let nfd_file = dir.path().join("Solidarita\u{308}t.txt");
        std::fs::create_dir(&nfd_dir).unwrap();
        std::fs::write(nfd_dir.join("a.txt"), b"old").unwrap();
        std::fs::write(&nfd_file, b"old").unwrap();

        let engine = SyncEngine::new(store, settings(dir.path(), "/photos", Direction::ToLocal));
        let report = engine.run().await.unwrap();

        assert!(report.is_clean());
        assert_eq!(report.transferred, 2);
        assert_eq!(report.deleted, 0);
        assert_eq!(std::fs::read(nfd_dir.join("a.txt")).unwrap(), b"new");
        assert_eq!(std::fs::read(&nfd_file).unwrap(), b"new");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);

        let second = engine.run().await.unwrap();
        assert_eq!(second.transferred, 0);
        assert_eq!(second.skipped, 2);
    }

    #[tokio::test]
    async fn failed_upload_does_not_stop_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.txt", "b.txt", "c.txt"] {
            std::fs::write(dir.path().join(name), name.as_bytes()).unwrap();
        }

        let store = Arc::new(MemoryStore::new());
        store.add_file("/backup/stale.txt", b"old", at(10));
        store.fail_path("/backup/b.txt");

        let engine = SyncEngine::new(
            store.clone(),
            settings(dir.path(), "/backup", Direction::ToDropbox),
        );
        let (report, _) = engine
            .sync_directory(PendingDir {
                relative: String::new(),
                local: dir.path().to_path_buf(),
            })
            .await
            .unwrap();

        assert_eq!(report.matched, 3);
        assert_eq!(report.transferred, 2);
        assert_eq!(report.transfer_failures, 1);
        assert_eq!(report.deleted, 1);
        assert_eq!(transfer_summary(&report), "2/3 Fails 1");
        assert_eq!(store.deleted_paths(), vec!["/backup/stale.txt"]);
        assert!(store.contains("/backup/a.txt"));
        assert!(!store.contains("/backup/b.txt"));
        assert!(store.contains("/backup/c.txt"));
    }

    #[tokio::test]
    async fn failed_download_is_counted_and_the_rest_arrive() {
        let store = Arc::new(MemoryStore::new());
        for name in ["a.txt", "b.txt", "c.txt"] {
            store.add_file(&format!("/docs/{name}"), b"x", at(1_700_000_000));
        }
        store.fail_path("/docs/b.txt");

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("extra.txt"), b"x").unwrap();

        let engine = SyncEngine::new(store, settings(dir.path(), "/docs", Direction::ToLocal));
        let report = engine.run().await.unwrap();

        assert_eq!(report.transferred, 2);
        assert_eq!(report.deleted, 1);
        assert_eq!(report.failures, 1);
        assert!(!report.is_clean());
        assert!(dir.path().join("a.txt").exists());
        assert!(!dir.path().join("b.txt").exists());
        assert!(dir.path().join("c.txt").exists());
        assert!(!dir.path().join("extra.txt").exists());
    }

    #[tokio::test]
    async fn failed_delete_is_counted_and_transfers_continue() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"alpha").unwrap();

        let store = Arc::new(MemoryStore::new());
        store.add_file("/backup/stale1.txt", b"old", at(10));
        store.add_file("/backup/stale2.txt", b"old", at(10));
        store.fail_path("/backup/stale1.txt");

        let engine = SyncEngine::new(
            store.clone(),
            settings(dir.path(), "/backup", Direction::ToDropbox),
        );
        let report = engine.run().await.unwrap();

        assert_eq!(report.deleted, 1);
        assert_eq!(report.failures, 1);
        assert_eq!(report.transferred, 1);
        assert!(store.contains("/backup/stale1.txt"));
        assert!(!store.contains("/backup/stale2.txt"));
        assert!(store.contains("/backup/a.txt"));
    }

    #[tokio::test]
    async fn delete_of_an_already_removed_file_counts_as_deleted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"alpha").unwrap();

        let store = Arc::new(MemoryStore::new());
        store.add_file("/backup/gone.txt", b"old", at(10));
        store.fail_path_with("/backup/gone.txt", SyncError::NotFound);

        let engine = SyncEngine::new(
            store.clone(),
            settings(dir.path(), "/backup", Direction::ToDropbox),
        );
        let report = engine.run().await.unwrap();

        assert!(report.is_clean());
        assert_eq!(report.deleted, 1);
        assert_eq!(report.transferred, 1);
    }

    #[test]
    fn summary_omits_zero_counts() {
        let mut report = DirectoryReport {
            matched: 5,
            transferred: 5,
            ..Default::default()
        };
        assert_eq!(transfer_summary(&report), "5/5");

        report.transferred = 2;
        report.skipped = 2;
        report.transfer_failures = 1;
        assert_eq!(transfer_summary(&report), "2/5 Skip 2 Fails 1");
    }

    #[test]
    fn direction_names_match_the_command_line() {
        use clap::ValueEnum;
        assert_eq!(
            Direction::from_str("todropbox", false).unwrap(),
            Direction::ToDropbox
        );
        assert_eq!(Direction::from_str("tolocal", false).unwrap(), Direction::ToLocal);
        assert_eq!(Direction::ToLocal.to_string(), "tolocal");
    }
}
