use super::client::DropboxClient;
use super::types::{
    CreateFolderArg, CreateFolderResult, ListFolderArg, ListFolderContinueArg, ListFolderResult,
    Metadata,
};
use crate::error::SyncError;

impl DropboxClient {
    /// List all entries of a folder, following the cursor until `has_more`
    /// is false. Not recursive; deleted entries are left out.
    pub async fn list_folder_entries(&self, path: &str) -> Result<Vec<Metadata>, SyncError> {
        let mut page: ListFolderResult = self
            .rpc_request("/files/list_folder")
            .json(&ListFolderArg {
                path,
                recursive: false,
                include_deleted: false,
            })
            .send_json()
            .await?;

        let mut entries = Vec::new();
        loop {
            for entry in page.entries {
                match entry {
                    Metadata::Deleted(deleted) => {
                        tracing::trace!(name = %deleted.name, "skipping deleted entry");
                    }
                    other => entries.push(other),
                }
            }
            if !page.has_more {
                break;
            }
            let cursor = page.cursor;
            page = self
                .rpc_request("/files/list_folder/continue")
                .json(&ListFolderContinueArg { cursor: &cursor })
                .send_json()
                .await?;
        }

        Ok(entries)
    }

    /// Create a folder (and any missing parents).
    pub async fn create_folder_path(&self, path: &str) -> Result<(), SyncError> {
        let result: CreateFolderResult = self
            .rpc_request("/files/create_folder_v2")
            .json(&CreateFolderArg {
                path,
                autorename: false,
            })
            .send_json()
            .await?;

        tracing::debug!(
            path = result.metadata.path_display.as_deref().unwrap_or(path),
            "folder created"
        );
        Ok(())
    }
}
