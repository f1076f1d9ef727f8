use std::collections::{HashMap, HashSet};

use super::Direction;
use super::entry::FileEntry;

/// What happens to one entry of a directory pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDecision {
    /// Copy the local file to Dropbox.
    Upload,
    /// Copy the Dropbox file to the local directory.
    Download,
    /// Remove the file from the mirrored side.
    DeleteFromDestination,
    /// The destination already holds this content.
    SkipExisting,
}

/// The work for one directory pair: deletions run before transfers.
#[derive(Debug)]
pub struct SyncPlan {
    pub direction: Direction,
    /// Destination files absent from the matched source set.
    pub deletions: Vec<FileEntry>,
    /// Matched source files to upload or download.
    pub transfers: Vec<FileEntry>,
    /// Matched source files the destination already holds.
    pub skipped: Vec<FileEntry>,
}

impl SyncPlan {
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.deletions.is_empty() && self.transfers.is_empty()
    }

    /// Number of matched source files (transferred or skipped).
    pub fn matched(&self) -> usize {
        self.transfers.len() + self.skipped.len()
    }

    /// Every classified entry with its decision, deletions first.
    pub fn decisions(&self) -> impl Iterator<Item = (&str, SyncDecision)> {
        let transfer = self.direction.transfer_decision();
        self.deletions
            .iter()
            .map(|e| (e.name(), SyncDecision::DeleteFromDestination))
            .chain(self.transfers.iter().map(move |e| (e.name(), transfer)))
            .chain(
                self.skipped
                    .iter()
                    .map(|e| (e.name(), SyncDecision::SkipExisting)),
            )
    }
}

/// Compare one directory's matched source files with the destination's
/// files.
///
/// Mirroring is strict: every destination file whose name is not in the
/// matched source set is deleted, including files that exist on the source
/// side but were filtered out. Directories are not part of the plan.
pub async fn reconcile(
    matched_source: Vec<FileEntry>,
    destination: Vec<FileEntry>,
    direction: Direction,
) -> SyncPlan {
    let (deletions, remaining) = {
        let matched_names: HashSet<&str> = matched_source.iter().map(|e| e.name()).collect();
        let mut deletions = Vec::new();
        let mut remaining: HashMap<String, FileEntry> = HashMap::new();
        for entry in destination.into_iter().filter(|e| !e.is_dir()) {
            if matched_names.contains(entry.name()) {
                remaining.insert(entry.name().to_string(), entry);
            } else {
                deletions.push(entry);
            }
        }
        (deletions, remaining)
    };

    let mut transfers = Vec::new();
    let mut skipped = Vec::new();
    for source in matched_source.into_iter().filter(|e| !e.is_dir()) {
        let synced = match remaining.get(source.name()) {
            Some(existing) => existing.is_synced_with(&source).await,
            None => false,
        };
        if synced {
            skipped.push(source);
        } else {
            transfers.push(source);
        }
    }

    SyncPlan {
        direction,
        deletions,
        transfers,
        skipped,
    }
}
