//! Dropbox HTTP API v2 client.

pub mod client;
mod files;
mod folders;
pub mod types;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use client::DropboxClient;

use crate::error::SyncError;
use crate::sync::entry::EntryKind;
use crate::sync::store::{AccountInfo, RemoteItem, RemoteStore};
use crate::util::path as sync_path;

use types::{FileMetadata, FolderMetadata, Metadata};

#[async_trait]
impl RemoteStore for DropboxClient {
    async fn current_account(&self) -> Result<AccountInfo, SyncError> {
        self.get_current_account().await
    }

    async fn list_folder(&self, path: &str) -> Result<Vec<RemoteItem>, SyncError> {
        let entries = self.list_folder_entries(path).await?;
        Ok(entries
            .into_iter()
            .filter_map(|entry| match entry {
                Metadata::File(file) => Some(file_item(path, file)),
                Metadata::Folder(folder) => Some(folder_item(path, folder)),
                Metadata::Deleted(_) => None,
            })
            .collect())
    }

    async fn create_folder(&self, path: &str) -> Result<(), SyncError> {
        self.create_folder_path(path).await
    }

    async fn upload(
        &self,
        path: &str,
        contents: Vec<u8>,
        client_modified: DateTime<Utc>,
    ) -> Result<RemoteItem, SyncError> {
        let parent = parent_path(path);
        let metadata = self.upload_file(path, contents, client_modified).await?;
        Ok(file_item(parent, metadata))
    }

    async fn download(&self, path: &str) -> Result<(RemoteItem, Vec<u8>), SyncError> {
        let (metadata, contents) = self.download_file(path).await?;
        Ok((file_item(parent_path(path), metadata), contents))
    }

    async fn delete(&self, path: &str) -> Result<(), SyncError> {
        self.delete_path(path).await
    }
}

fn parent_path(path: &str) -> &str {
    path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
}

fn file_item(parent: &str, file: FileMetadata) -> RemoteItem {
    let path = file
        .path_display
        .unwrap_or_else(|| sync_path::join_remote(parent, &file.name));
    RemoteItem {
        name: file.name,
        path,
        kind: EntryKind::File,
        size: file.size,
        content_hash: file.content_hash,
        client_modified: Some(file.client_modified),
        server_modified: Some(file.server_modified),
    }
}

fn folder_item(parent: &str, folder: FolderMetadata) -> RemoteItem {
    let path = folder
        .path_display
        .unwrap_or_else(|| sync_path::join_remote(parent, &folder.name));
    RemoteItem {
        name: folder.name,
        path,
        kind: EntryKind::Directory,
        size: 0,
        content_hash: None,
        client_modified: None,
        server_modified: None,
    }
}
