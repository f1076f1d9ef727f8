use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::SyncError;

use super::entry::EntryKind;

/// One item from a remote folder listing, independent of the backend's
/// wire format.
#[derive(Debug, Clone)]
pub struct RemoteItem {
    pub name: String,
    /// Full remote path (display casing).
    pub path: String,
    pub kind: EntryKind,
    pub size: u64,
    pub content_hash: Option<String>,
    pub client_modified: Option<DateTime<Utc>>,
    pub server_modified: Option<DateTime<Utc>>,
}

/// The authenticated account, used for the pre-flight check.
#[derive(Debug, Clone)]
pub struct AccountInfo {
    pub display_name: String,
    pub email: String,
    pub country: Option<String>,
    pub locale: String,
}

/// Remote operations consumed by the sync core.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn current_account(&self) -> Result<AccountInfo, SyncError>;

    /// List one folder (not recursive). `NotFound` when the folder is absent.
    async fn list_folder(&self, path: &str) -> Result<Vec<RemoteItem>, SyncError>;

    async fn create_folder(&self, path: &str) -> Result<(), SyncError>;

    /// Upload, overwriting any existing file at `path`.
    async fn upload(
        &self,
        path: &str,
        contents: Vec<u8>,
        client_modified: DateTime<Utc>,
    ) -> Result<RemoteItem, SyncError>;

    async fn download(&self, path: &str) -> Result<(RemoteItem, Vec<u8>), SyncError>;

    /// Delete a file or folder. `NotFound` when it is already gone.
    async fn delete(&self, path: &str) -> Result<(), SyncError>;
}
