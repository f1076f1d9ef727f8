use chrono::{DateTime, Duration, Utc};
use regex::Regex;

use crate::util::path as sync_path;

use super::entry::FileEntry;

/// Hidden files: a `.` at the start of the name or after a separator.
const HIDDEN_PATTERN: &str = r"(?:^|/)\.";
/// Temporary files: a `~` at the start of the name or after a separator.
const TEMP_PATTERN: &str = r"(?:^|/)~";

/// Decides which source-side files take part in a sync run.
///
/// Built once per run and read-only afterwards. `now` is captured at
/// construction so every directory is judged against the same clock.
#[derive(Debug, Clone)]
pub struct FilterCriteria {
    max_age_days: Option<u32>,
    max_size_bytes: Option<u64>,
    name_patterns: Vec<Regex>,
    exclude: Vec<String>,
    now: DateTime<Utc>,
}

impl FilterCriteria {
    pub fn new(now: DateTime<Utc>) -> Self {
        let name_patterns = [HIDDEN_PATTERN, TEMP_PATTERN]
            .iter()
            .map(|p| Regex::new(p).expect("built-in name pattern is valid"))
            .collect();
        Self {
            max_age_days: None,
            max_size_bytes: None,
            name_patterns,
            exclude: Vec::new(),
            now,
        }
    }

    pub fn with_max_age_days(mut self, days: Option<u32>) -> Self {
        self.max_age_days = days;
        self
    }

    pub fn with_max_size_bytes(mut self, bytes: Option<u64>) -> Self {
        self.max_size_bytes = bytes;
        self
    }

    pub fn with_exclude(mut self, masks: Vec<String>) -> Self {
        self.exclude = masks;
        self
    }

    /// Hidden, temporary or user-excluded names.
    pub fn excludes_name(&self, name: &str) -> bool {
        self.name_patterns.iter().any(|re| re.is_match(name))
            || sync_path::matches_exclude(name, &self.exclude)
    }

    /// Strictly younger than the age limit.
    pub fn within_age(&self, modified: DateTime<Utc>) -> bool {
        match self.max_age_days {
            Some(days) => self.now - modified < Duration::days(i64::from(days)),
            None => true,
        }
    }

    /// Strictly smaller than the size limit.
    pub fn within_size(&self, size: u64) -> bool {
        self.max_size_bytes.is_none_or(|max| size < max)
    }

    /// Whether `entry` is eligible for syncing. Entries whose size cannot be
    /// resolved are excluded, never raised.
    pub async fn matches(&self, entry: &FileEntry) -> bool {
        if self.excludes_name(entry.name()) {
            return false;
        }
        if !self.within_age(entry.modify_time()) {
            return false;
        }
        if self.max_size_bytes.is_some() {
            match entry.size().await {
                Ok(size) => return self.within_size(size),
                Err(e) => {
                    tracing::warn!(file = entry.name(), error = %e, "cannot read size, excluding");
                    return false;
                }
            }
        }
        true
    }

    /// Keep only the matching entries, preserving order.
    pub async fn apply(&self, entries: Vec<FileEntry>) -> Vec<FileEntry> {
        let mut matched = Vec::with_capacity(entries.len());
        for entry in entries {
            if self.matches(&entry).await {
                matched.push(entry);
            } else {
                tracing::trace!(file = entry.name(), "filtered out");
            }
        }
        matched
    }
}
