use std::collections::HashMap;
use std::path::{Path, PathBuf};

use unicode_normalization::UnicodeNormalization;

use crate::error::SyncError;

use super::entry::{EntryKind, FileEntry, LocalFileEntry, RemoteFileEntry};
use super::store::RemoteStore;

/// One directory's entries, split into files and subdirectories.
#[derive(Debug, Default)]
pub struct DirectoryListing {
    pub files: Vec<FileEntry>,
    pub directories: Vec<FileEntry>,
}

impl DirectoryListing {
    /// On-disk paths of the local entries, keyed by their NFC name.
    pub fn local_paths(&self) -> HashMap<String, PathBuf> {
        self.files
            .iter()
            .chain(&self.directories)
            .filter_map(|e| match e {
                FileEntry::Local(local) => Some((e.name().to_string(), local.path().to_path_buf())),
                FileEntry::Remote(_) => None,
            })
            .collect()
    }

    fn push(&mut self, entry: FileEntry) {
        match entry.kind() {
            EntryKind::File => self.files.push(entry),
            EntryKind::Directory => self.directories.push(entry),
        }
    }
}

/// List one local directory (not recursive). Symlinks are skipped; names
/// are normalized to NFC so they compare equal to Dropbox names.
pub async fn list_local(dir: &Path) -> Result<DirectoryListing, SyncError> {
    let mut read_dir = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| SyncError::io(format!("cannot read dir {}", dir.display()), e))?;

    let mut listing = DirectoryListing::default();
    loop {
        let entry = match read_dir.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                return Err(SyncError::io(
                    format!("cannot read dir {}", dir.display()),
                    e,
                ));
            }
        };

        let path = entry.path();
        let meta = match tokio::fs::symlink_metadata(&path).await {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot stat, skipping");
                continue;
            }
        };

        if meta.is_symlink() {
            tracing::debug!(path = %path.display(), "skipping symlink");
            continue;
        }
        if !meta.is_file() && !meta.is_dir() {
            tracing::debug!(path = %path.display(), "skipping special file");
            continue;
        }

        let name: String = entry.file_name().to_string_lossy().nfc().collect();
        listing.push(FileEntry::Local(LocalFileEntry::from_metadata(
            path, name, &meta,
        )));
    }

    tracing::debug!(
        dir = %dir.display(),
        files = listing.files.len(),
        directories = listing.directories.len(),
        "local listing"
    );
    Ok(listing)
}

/// List one remote folder (not recursive).
pub async fn list_remote(
    store: &dyn RemoteStore,
    path: &str,
) -> Result<DirectoryListing, SyncError> {
    let started = std::time::Instant::now();
    let items = store.list_folder(path).await?;

    let mut listing = DirectoryListing::default();
    for item in items {
        listing.push(FileEntry::Remote(RemoteFileEntry::from_item(item)));
    }

    tracing::debug!(
        path,
        files = listing.files.len(),
        directories = listing.directories.len(),
        elapsed = ?started.elapsed(),
        "remote listing"
    );
    Ok(listing)
}
