use std::io;

use thiserror::Error;

/// Errors produced by the sync core and the Dropbox client.
///
/// The walker decides per variant whether a failure ends the run or only
/// the item (or directory) it belongs to; see [`SyncError::is_fatal`].
#[derive(Debug, Error)]
pub enum SyncError {
    /// Missing or invalid argument / configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The access token was rejected by Dropbox.
    #[error("Dropbox rejected the access token: {0}")]
    Auth(String),

    /// The target does not exist (local path or remote path).
    #[error("not found: {0}")]
    NotFound(String),

    /// Any Dropbox API failure other than authentication.
    #[error("Dropbox API error: {0}")]
    Backend(String),

    /// Local filesystem failure.
    #[error("{context}: {source}")]
    LocalIo {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl SyncError {
    /// Wrap an I/O error. A missing file or directory becomes [`SyncError::NotFound`]
    /// so callers can treat it as already satisfied where that makes sense.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        let context = context.into();
        if source.kind() == io::ErrorKind::NotFound {
            return SyncError::NotFound(context);
        }
        SyncError::LocalIo { context, source }
    }

    /// Fatal errors end the whole run; everything else is scoped to one
    /// item or one directory.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::Config(_) | SyncError::Auth(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::NotFound(_))
    }
}
