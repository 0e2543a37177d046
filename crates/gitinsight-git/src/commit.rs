// Copyright (c) 2026 - present gitinsight contributors
// SPDX-License-Identifier: MIT

//! Normalized commit record

use chrono::{DateTime, FixedOffset, Timelike};
use serde::{Deserialize, Serialize};

/// Author name used when the tool reports an empty identity
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Number of hash characters shown in compact listings
pub const SHORT_HASH_LEN: usize = 8;

/// A single commit as reported by the version-control tool
///
/// The timestamp keeps the offset the commit was authored with, so
/// `hour()` answers "what time was it for the author", not for the viewer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Commit {
    /// Full object hash (40 hex characters, or 64 for SHA-256 repositories)
    pub hash: String,
    /// Author name, never empty
    pub author: String,
    /// Authored timestamp with the original timezone offset
    pub timestamp: DateTime<FixedOffset>,
    /// Summary line of the commit message (may be empty)
    pub message: String,
}

impl Commit {
    /// Validate that a hash is a SHA-1 or SHA-256 hex object id
    #[must_use]
    pub fn is_valid_hash(hash: &str) -> bool {
        (hash.len() == 40 || hash.len() == 64) && hash.chars().all(|c| c.is_ascii_hexdigit())
    }

    /// Get the abbreviated hash (first 8 characters)
    #[must_use]
    pub fn short_hash(&self) -> &str {
        &self.hash[..SHORT_HASH_LEN.min(self.hash.len())]
    }

    /// Hour of day (0-23) in the commit's own timezone
    #[must_use]
    pub fn hour(&self) -> u32 {
        self.timestamp.hour()
    }

    /// Get the first line of the message
    #[must_use]
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}
