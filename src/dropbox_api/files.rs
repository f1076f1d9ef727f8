use chrono::{DateTime, Utc};

use super::client::{API_RESULT_HEADER, DropboxClient};
use super::types::{
    CommitInfo, DeleteArg, DeleteResult, DownloadArg, FileMetadata, UploadSessionAppendArg,
    UploadSessionCursor, UploadSessionFinishArg, UploadSessionStartArg, UploadSessionStartResult,
};
use crate::error::SyncError;

/// Files from this size on go through an upload session; the single-request
/// endpoint rejects anything above 150 MiB.
const UPLOAD_SESSION_THRESHOLD: usize = 150 * 1024 * 1024;

/// Size of each upload session part.
const UPLOAD_PART_SIZE: usize = 32 * 1024 * 1024;

impl DropboxClient {
    /// Upload `contents` to `path`, overwriting any existing file. Picks a
    /// single request or an upload session by size.
    pub async fn upload_file(
        &self,
        path: &str,
        contents: Vec<u8>,
        client_modified: DateTime<Utc>,
    ) -> Result<FileMetadata, SyncError> {
        let commit = CommitInfo::overwrite(path, client_modified);
        if contents.len() >= UPLOAD_SESSION_THRESHOLD {
            return self.session_upload(contents, commit).await;
        }

        self.content_request("/files/upload", &commit)?
            .octet_stream(contents)
            .send_json()
            .await
    }

    /// Upload in parts: start, append, finish. The finish call commits the
    /// last part together with the file.
    async fn session_upload(
        &self,
        contents: Vec<u8>,
        commit: CommitInfo,
    ) -> Result<FileMetadata, SyncError> {
        let total = contents.len();
        let mut parts = contents.chunks(UPLOAD_PART_SIZE);
        let first = parts.next().unwrap_or_default();

        let started: UploadSessionStartResult = self
            .content_request("/files/upload_session/start", &UploadSessionStartArg { close: false })?
            .octet_stream(first.to_vec())
            .send_json()
            .await?;

        let mut cursor = UploadSessionCursor {
            session_id: started.session_id,
            offset: first.len() as u64,
        };
        tracing::debug!(path = %commit.path, total, session = %cursor.session_id, "upload session started");

        let mut last: &[u8] = &[];
        for part in parts {
            if !last.is_empty() {
                self.append_part(&cursor, last).await?;
                cursor.offset += last.len() as u64;
            }
            last = part;
        }

        self.content_request(
            "/files/upload_session/finish",
            &UploadSessionFinishArg {
                cursor,
                commit,
            },
        )?
        .octet_stream(last.to_vec())
        .send_json()
        .await
    }

    async fn append_part(&self, cursor: &UploadSessionCursor, part: &[u8]) -> Result<(), SyncError> {
        self.content_request(
            "/files/upload_session/append_v2",
            &UploadSessionAppendArg {
                cursor: cursor.clone(),
                close: false,
            },
        )?
        .octet_stream(part.to_vec())
        .send()
        .await?;
        tracing::trace!(offset = cursor.offset, len = part.len(), "upload part appended");
        Ok(())
    }

    /// Download a file; the metadata comes from the `Dropbox-API-Result`
    /// header.
    pub async fn download_file(&self, path: &str) -> Result<(FileMetadata, Vec<u8>), SyncError> {
        let resp = self
            .content_request("/files/download", &DownloadArg { path })?
            .send()
            .await?;

        let metadata: FileMetadata = resp
            .headers()
            .get(API_RESULT_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| SyncError::Backend(format!("{path}: missing {API_RESULT_HEADER}")))
            .and_then(|v| {
                serde_json::from_str(v).map_err(|e| {
                    SyncError::Backend(format!("{path}: invalid {API_RESULT_HEADER}: {e}"))
                })
            })?;

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| SyncError::Backend(format!("{path}: cannot read download body: {e}")))?;
        Ok((metadata, bytes.to_vec()))
    }

    /// Delete a file or folder.
    pub async fn delete_path(&self, path: &str) -> Result<(), SyncError> {
        let _: DeleteResult = self
            .rpc_request("/files/delete_v2")
            .json(&DeleteArg { path })
            .send_json()
            .await?;
        Ok(())
    }
}
