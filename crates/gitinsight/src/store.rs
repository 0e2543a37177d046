// Copyright (c) 2026 - present gitinsight contributors
// SPDX-License-Identifier: MIT

//! Commit snapshots
//!
//! A [`CommitStore`] is the parsed history of one repository at one point in
//! time. It is built once, never patched, and shared behind an `Arc` so
//! readers never need a lock.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use gitinsight_git::Commit;
use tracing::debug;

/// Immutable, versioned snapshot of a repository's history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitStore {
    repository: PathBuf,
    version: u64,
    built_at: DateTime<Utc>,
    commits: Vec<Commit>,
    duplicates_dropped: usize,
}

impl CommitStore {
    /// Build a snapshot from commits in traversal order (newest first)
    ///
    /// Repeated hashes keep their first occurrence; the relative order of
    /// everything else is untouched.
    pub fn build<I>(
        repository: impl Into<PathBuf>,
        version: u64,
        built_at: DateTime<Utc>,
        commits: I,
    ) -> Self
    where
        I: IntoIterator<Item = Commit>,
    {
        let mut seen = HashSet::new();
        let mut duplicates_dropped = 0;
        let commits: Vec<Commit> = commits
            .into_iter()
            .filter(|commit| {
                let fresh = seen.insert(commit.hash.clone());
                if !fresh {
                    duplicates_dropped += 1;
                }
                fresh
            })
            .collect();

        let repository = repository.into();
        if duplicates_dropped > 0 {
            debug!(
                path = %repository.display(),
                duplicates = duplicates_dropped,
                "Dropped duplicate commits"
            );
        }

        Self {
            repository,
            version,
            built_at,
            commits,
            duplicates_dropped,
        }
    }

    /// An empty snapshot
    #[must_use]
    pub fn empty(repository: impl Into<PathBuf>, version: u64, built_at: DateTime<Utc>) -> Self {
        Self::build(repository, version, built_at, std::iter::empty())
    }

    /// Repository this snapshot was read from
    #[must_use]
    pub fn repository(&self) -> &Path {
        &self.repository
    }

    /// Snapshot version; bumps on every successful refresh of a path
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// When the snapshot was built
    #[must_use]
    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Commits, newest first
    #[must_use]
    pub fn commits(&self) -> &[Commit] {
        &self.commits
    }

    /// Number of commits
    #[must_use]
    pub fn len(&self) -> usize {
        self.commits.len()
    }

    /// Whether the snapshot holds no commits
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// How many repeated hashes were discarded while building
    #[must_use]
    pub fn duplicates_dropped(&self) -> usize {
        self.duplicates_dropped
    }

    /// Look up a commit by full hash
    #[must_use]
    pub fn get(&self, hash: &str) -> Option<&Commit> {
        self.commits.iter().find(|c| c.hash == hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use similar_asserts::assert_eq;

    fn commit(hash_digit: char, author: &str, message: &str) -> Commit {
        Commit {
            hash: hash_digit.to_string().repeat(40),
            author: author.to_string(),
            timestamp: FixedOffset::east_opt(0)
                .unwrap()
                .with_ymd_and_hms(2024, 1, 1, 9, 0, 0)
                .unwrap(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_build_preserves_order() {
        let store = CommitStore::build(
            "/repo",
            1,
            Utc::now(),
            vec![commit('3', "A", "c"), commit('2', "B", "b"), commit('1', "A", "a")],
        );
        let messages: Vec<&str> = store.commits().iter().map(|c| c.message.as_str()).collect();
        assert_eq!(messages, vec!["c", "b", "a"]);
        assert_eq!(store.len(), 3);
        assert_eq!(store.version(), 1);
        assert_eq!(store.repository(), Path::new("/repo"));
    }

    #[test]
    fn test_build_keeps_first_duplicate() {
        let store = CommitStore::build(
            "/repo",
            1,
            Utc::now(),
            vec![
                commit('1', "A", "first"),
                commit('2', "B", "other"),
                commit('1', "A", "replayed"),
            ],
        );
        assert_eq!(store.len(), 2);
        assert_eq!(store.duplicates_dropped(), 1);
        assert_eq!(store.get(&"1".repeat(40)).map(|c| c.message.as_str()), Some("first"));
    }

    #[test]
    fn test_empty_store() {
        let store = CommitStore::empty("/repo", 7, Utc::now());
        assert!(store.is_empty());
        assert_eq!(store.version(), 7);
        assert_eq!(store.duplicates_dropped(), 0);
    }
}
