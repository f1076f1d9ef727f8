use std::time::Instant;

use crate::error::SyncError;
use crate::util::path as sync_path;

use super::entry::FileEntry;
use super::store::RemoteStore;

/// Upload one local file into `remote_dir`, overwriting what is there.
///
/// The local modify time is sent along as the client timestamp so the
/// remote copy carries the source's age.
pub async fn upload(
    store: &dyn RemoteStore,
    entry: &FileEntry,
    remote_dir: &str,
) -> Result<(), SyncError> {
    let FileEntry::Local(local) = entry else {
        return Err(SyncError::Config(format!(
            "upload source {} is not a local file",
            entry.name()
        )));
    };

    let name = entry.name();
    let remote_path = sync_path::join_remote(remote_dir, name);
    let started = Instant::now();
    scopeguard::defer! {
        tracing::debug!(file = name, elapsed = ?started.elapsed(), "upload finished");
    }

    let contents = tokio::fs::read(local.path())
        .await
        .map_err(|e| SyncError::io(format!("cannot read {}", local.path().display()), e))?;
    let size = contents.len();

    tracing::debug!(file = name, size, "uploading");
    store
        .upload(&remote_path, contents, entry.modify_time())
        .await?;
    tracing::info!(path = %remote_path, size, "uploaded");
    Ok(())
}
