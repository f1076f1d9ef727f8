use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};

use crate::error::SyncError;

use super::entry::FileEntry;
use super::store::RemoteStore;

/// Download one remote file to `dest`.
///
/// Writes to a `.cloudsync.tmp` sibling first, then renames into place.
/// The local mtime is set to the remote modify time afterwards so the copy
/// is not seen as newer than its source on the next run.
pub async fn download(
    store: &dyn RemoteStore,
    entry: &FileEntry,
    dest: &Path,
) -> Result<(), SyncError> {
    let FileEntry::Remote(remote) = entry else {
        return Err(SyncError::Config(format!(
            "download source {} is not a remote file",
            entry.name()
        )));
    };

    let name = entry.name();
    let started = Instant::now();
    scopeguard::defer! {
        tracing::debug!(file = name, elapsed = ?started.elapsed(), "download finished");
    }

    tracing::debug!(file = name, size = entry.size().await.unwrap_or_default(), "downloading");
    let (_, contents) = store.download(remote.path()).await?;

    let tmp_path = temp_path(dest);
    tokio::fs::write(&tmp_path, &contents)
        .await
        .map_err(|e| SyncError::io(format!("cannot write {}", tmp_path.display()), e))?;

    if let Err(e) = tokio::fs::rename(&tmp_path, dest).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(SyncError::io(
            format!("cannot move download into {}", dest.display()),
            e,
        ));
    }

    set_mtime(dest, SystemTime::from(entry.modify_time())).await?;
    tracing::info!(path = %dest.display(), size = contents.len(), "downloaded");
    Ok(())
}

fn temp_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".cloudsync.tmp");
    dest.with_file_name(name)
}

async fn set_mtime(path: &Path, mtime: SystemTime) -> Result<(), SyncError> {
    let file = tokio::fs::OpenOptions::new()
        .write(true)
        .open(path)
        .await
        .map_err(|e| SyncError::io(format!("cannot open {}", path.display()), e))?;
    file.into_std()
        .await
        .set_modified(mtime)
        .map_err(|e| SyncError::io(format!("cannot set mtime of {}", path.display()), e))
}
