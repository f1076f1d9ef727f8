use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

use crate::error::SyncError;

/// Dropbox hashes content in 4 MB blocks.
pub const BLOCK_SIZE: usize = 4 * 1024 * 1024;

/// Compute the Dropbox content hash of a local file.
///
/// The file is split into 4 MB blocks, each block is hashed with SHA-256,
/// and the concatenation of the block digests is hashed again. Returns the
/// lowercase hex digest (64 chars), the same value Dropbox reports as
/// `content_hash`.
pub async fn content_hash(path: &Path) -> Result<String, SyncError> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| SyncError::io(format!("cannot open {}", path.display()), e))?;

    let mut overall = Sha256::new();
    let mut block = vec![0u8; BLOCK_SIZE];

    loop {
        // A short read does not mean end of block; keep filling until the
        // block is full or the file is exhausted.
        let mut filled = 0;
        while filled < BLOCK_SIZE {
            let n = file
                .read(&mut block[filled..])
                .await
                .map_err(|e| SyncError::io(format!("cannot read {}", path.display()), e))?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            break;
        }
        overall.update(Sha256::digest(&block[..filled]));
        if filled < BLOCK_SIZE {
            break;
        }
    }

    Ok(hex::encode(overall.finalize()))
}

/// Dropbox content hash of an in-memory buffer.
#[cfg(test)]
pub fn content_hash_bytes(data: &[u8]) -> String {
    let mut overall = Sha256::new();
    for chunk in data.chunks(BLOCK_SIZE) {
        overall.update(Sha256::digest(chunk));
    }
    hex::encode(overall.finalize())
}
