// Copyright (c) 2026 - present gitinsight contributors
// SPDX-License-Identifier: MIT

//! Aggregated views over a commit snapshot
//!
//! Every aggregator is a pure function of a [`CommitStore`] and its own
//! settings. They never fail: an empty store gives an all-zero histogram,
//! an empty ranking and an empty recent list.

use std::collections::HashMap;
use std::fmt;

use gitinsight_git::Commit;
use serde::{Deserialize, Serialize};

use crate::store::CommitStore;

/// Hours in a day, the histogram width
pub const HOURS: usize = 24;

/// Default size of the recent-commits window
pub const DEFAULT_RECENT_LIMIT: usize = 20;

/// Which view to compute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    /// Commits per hour of day, in each commit's own timezone
    HourHistogram,
    /// Commits per author, most active first
    AuthorRanking,
    /// The newest commits
    RecentCommits {
        /// Maximum number of commits returned
        limit: usize,
    },
}

impl ViewKind {
    /// Recent commits with the default window
    #[must_use]
    pub fn recent() -> Self {
        Self::RecentCommits {
            limit: DEFAULT_RECENT_LIMIT,
        }
    }

    /// Short, stable name used in logs and CLI output
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::HourHistogram => "hours",
            Self::AuthorRanking => "authors",
            Self::RecentCommits { .. } => "recent",
        }
    }

    /// Run the aggregator for this kind
    #[must_use]
    pub fn compute(&self, store: &CommitStore) -> ViewResult {
        let data = match *self {
            Self::HourHistogram => ViewData::HourHistogram(hour_histogram(store)),
            Self::AuthorRanking => ViewData::AuthorRanking(author_ranking(store)),
            Self::RecentCommits { limit } => ViewData::RecentCommits(recent_commits(store, limit)),
        };
        ViewResult {
            version: store.version(),
            kind: *self,
            data,
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A computed view, tagged with the snapshot version it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewResult {
    /// Snapshot version the view was computed from
    pub version: u64,
    /// The view that was computed
    pub kind: ViewKind,
    /// The view's data
    pub data: ViewData,
}

impl ViewResult {
    /// The histogram, if this is an hour view
    #[must_use]
    pub fn as_hour_histogram(&self) -> Option<&HourHistogram> {
        match &self.data {
            ViewData::HourHistogram(h) => Some(h),
            _ => None,
        }
    }

    /// The ranking, if this is an author view
    #[must_use]
    pub fn as_author_ranking(&self) -> Option<&AuthorRanking> {
        match &self.data {
            ViewData::AuthorRanking(r) => Some(r),
            _ => None,
        }
    }

    /// The commits, if this is a recent-commits view
    #[must_use]
    pub fn as_recent_commits(&self) -> Option<&[Commit]> {
        match &self.data {
            ViewData::RecentCommits(c) => Some(c),
            _ => None,
        }
    }
}

/// Payload of a [`ViewResult`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "view", content = "data", rename_all = "snake_case")]
pub enum ViewData {
    /// Commit counts per hour
    HourHistogram(HourHistogram),
    /// Commit counts per author
    AuthorRanking(AuthorRanking),
    /// Newest commits, newest first
    RecentCommits(Vec<Commit>),
}

/// Commit counts for each hour of the day
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourHistogram {
    counts: [u64; HOURS],
}

impl HourHistogram {
    /// Count for `hour` (0-23); out-of-range hours count as zero
    #[must_use]
    pub fn get(&self, hour: usize) -> u64 {
        self.counts.get(hour).copied().unwrap_or(0)
    }

    /// All 24 buckets, midnight first
    #[must_use]
    pub fn counts(&self) -> &[u64; HOURS] {
        &self.counts
    }

    /// Sum over all buckets
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// The busiest hour, earliest on ties; `None` when empty
    #[must_use]
    pub fn peak_hour(&self) -> Option<usize> {
        let max = *self.counts.iter().max()?;
        if max == 0 {
            return None;
        }
        self.counts.iter().position(|&c| c == max)
    }
}

/// One row of an [`AuthorRanking`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorCount {
    /// Author name, exactly as recorded
    pub author: String,
    /// Number of commits
    pub count: u64,
}

/// Authors sorted by commit count (descending), then name (ascending)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRanking {
    entries: Vec<AuthorCount>,
}

impl AuthorRanking {
    /// All rows in rank order
    #[must_use]
    pub fn entries(&self) -> &[AuthorCount] {
        &self.entries
    }

    /// The first `n` rows
    #[must_use]
    pub fn top(&self, n: usize) -> &[AuthorCount] {
        &self.entries[..n.min(self.entries.len())]
    }

    /// Number of distinct authors
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no authors
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all counts
    #[must_use]
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|e| e.count).sum()
    }
}

/// Bucket commits by hour in the timezone each commit was authored in
#[must_use]
pub fn hour_histogram(store: &CommitStore) -> HourHistogram {
    let mut counts = [0u64; HOURS];
    for commit in store.commits() {
        // hour() is always < 24
        counts[commit.hour() as usize] += 1;
    }
    HourHistogram { counts }
}

/// Count commits per exact author string and rank them
#[must_use]
pub fn author_ranking(store: &CommitStore) -> AuthorRanking {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for commit in store.commits() {
        *counts.entry(commit.author.as_str()).or_default() += 1;
    }

    let mut entries: Vec<AuthorCount> = counts
        .into_iter()
        .map(|(author, count)| AuthorCount {
            author: author.to_string(),
            count,
        })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.author.cmp(&b.author)));

    AuthorRanking { entries }
}

/// The first `limit` commits in store order
#[must_use]
pub fn recent_commits(store: &CommitStore, limit: usize) -> Vec<Commit> {
    store.commits().iter().take(limit).cloned().collect()
}
