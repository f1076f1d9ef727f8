use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;

use crate::error::SyncError;
use crate::util::hash;

use super::store::{RemoteItem, RemoteStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// A file or directory on either side of a sync, listed from one directory.
///
/// Entries are built fresh by each listing call and dropped once their
/// directory has been processed. Size and content hash of local files are
/// resolved on first use and cached.
#[derive(Debug)]
pub enum FileEntry {
    Local(LocalFileEntry),
    Remote(RemoteFileEntry),
}

#[derive(Debug)]
pub struct LocalFileEntry {
    path: PathBuf,
    name: String,
    kind: EntryKind,
    modified: DateTime<Utc>,
    size: OnceCell<u64>,
    content_hash: OnceCell<String>,
}

#[derive(Debug, Clone)]
pub struct RemoteFileEntry {
    path: String,
    name: String,
    kind: EntryKind,
    modified: DateTime<Utc>,
    size: u64,
    content_hash: Option<String>,
}

impl LocalFileEntry {
    /// Build an entry from metadata already fetched by the listing.
    pub fn from_metadata(path: PathBuf, name: String, meta: &Metadata) -> Self {
        let kind = if meta.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        Self {
            path,
            name,
            kind,
            modified: mtime_whole_seconds(meta),
            size: OnceCell::new(),
            content_hash: OnceCell::new(),
        }
    }

    /// Stat a single path and build an entry for it.
    #[cfg(test)]
    pub async fn stat(path: &Path) -> Result<Self, SyncError> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| SyncError::io(format!("cannot stat {}", path.display()), e))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::from_metadata(path.to_path_buf(), name, &meta))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn size(&self) -> Result<u64, SyncError> {
        self.size
            .get_or_try_init(|| async {
                let meta = tokio::fs::metadata(&self.path).await.map_err(|e| {
                    SyncError::io(format!("cannot stat {}", self.path.display()), e)
                })?;
                Ok(meta.len())
            })
            .await
            .copied()
    }

    async fn content_hash(&self) -> Result<String, SyncError> {
        self.content_hash
            .get_or_try_init(|| hash::content_hash(&self.path))
            .await
            .cloned()
    }

    async fn create(&self) -> Result<(), SyncError> {
        tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map(|_| ())
            .map_err(|e| SyncError::io(format!("cannot create {}", self.path.display()), e))
    }

    async fn delete(&self) -> Result<(), SyncError> {
        let result = match self.kind {
            EntryKind::File => tokio::fs::remove_file(&self.path).await,
            EntryKind::Directory => tokio::fs::remove_dir_all(&self.path).await,
        };
        result.map_err(|e| SyncError::io(format!("cannot delete {}", self.path.display()), e))
    }
}

impl RemoteFileEntry {
    /// The modify time of a remote file is the later of the timestamp the
    /// uploader supplied and the time the server recorded.
    pub fn from_item(item: RemoteItem) -> Self {
        let modified = match (item.client_modified, item.server_modified) {
            (Some(client), Some(server)) => client.max(server),
            (Some(t), None) | (None, Some(t)) => t,
            (None, None) => DateTime::<Utc>::UNIX_EPOCH,
        };
        Self {
            path: item.path,
            name: item.name,
            kind: item.kind,
            modified,
            size: item.size,
            content_hash: item.content_hash,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl FileEntry {
    pub fn name(&self) -> &str {
        match self {
            FileEntry::Local(e) => &e.name,
            FileEntry::Remote(e) => &e.name,
        }
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            FileEntry::Local(e) => e.kind,
            FileEntry::Remote(e) => e.kind,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind() == EntryKind::Directory
    }

    pub fn modify_time(&self) -> DateTime<Utc> {
        match self {
            FileEntry::Local(e) => e.modified,
            FileEntry::Remote(e) => e.modified,
        }
    }

    pub async fn size(&self) -> Result<u64, SyncError> {
        match self {
            FileEntry::Local(e) => e.size().await,
            FileEntry::Remote(e) => Ok(e.size),
        }
    }

    pub async fn content_hash(&self) -> Result<String, SyncError> {
        match self {
            FileEntry::Local(e) => e.content_hash().await,
            FileEntry::Remote(e) => e
                .content_hash
                .clone()
                .ok_or_else(|| SyncError::Backend(format!("no content hash for {}", e.path))),
        }
    }

    /// Create an empty file if nothing exists yet. Remote content only ever
    /// arrives through an upload, so this is a no-op on that side.
    #[allow(dead_code)]
    pub async fn create(&self) -> Result<(), SyncError> {
        match self {
            FileEntry::Local(e) => e.create().await,
            FileEntry::Remote(_) => Ok(()),
        }
    }

    /// Remove the underlying object. Already-missing objects are reported as
    /// [`SyncError::NotFound`].
    pub async fn delete(&self, store: &dyn RemoteStore) -> Result<(), SyncError> {
        match self {
            FileEntry::Local(e) => e.delete().await,
            FileEntry::Remote(e) => store.delete(&e.path).await,
        }
    }

    /// Whether this (destination) entry already holds the content of
    /// `source`.
    ///
    /// Requires the same name and size, a modify time not newer than the
    /// source's, and the same content hash. A destination copy that is newer
    /// than its source never counts as synced. Hashes are only resolved once
    /// the cheap checks pass; any resolution failure means "not synced".
    pub async fn is_synced_with(&self, source: &FileEntry) -> bool {
        if self.name() != source.name() {
            return false;
        }

        match (self.size().await, source.size().await) {
            (Ok(a), Ok(b)) if a == b => {}
            (Ok(_), Ok(_)) => return false,
            (Err(e), _) | (_, Err(e)) => {
                tracing::debug!(file = self.name(), error = %e, "size unavailable");
                return false;
            }
        }

        if self.modify_time() > source.modify_time() {
            return false;
        }

        match (self.content_hash().await, source.content_hash().await) {
            (Ok(a), Ok(b)) => a == b,
            (Err(e), _) | (_, Err(e)) => {
                tracing::debug!(file = self.name(), error = %e, "content hash unavailable");
                false
            }
        }
    }
}

/// Local mtime in UTC, truncated to whole seconds.
fn mtime_whole_seconds(meta: &Metadata) -> DateTime<Utc> {
    let secs = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default();
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}
