// Copyright (c) 2026 - present gitinsight contributors
// SPDX-License-Identifier: MIT

//! Error types for gitinsight-git

use std::process::ExitStatus;

use thiserror::Error;

/// Errors that can occur while extracting commit history
#[derive(Debug, Error)]
pub enum GitError {
    /// Error from git2 library
    #[error("Git error: {0}")]
    Git2(#[from] git2::Error),

    /// The path has no version-control metadata
    #[error("Repository not found: {path}")]
    RepositoryNotFound {
        /// The path that was checked for a repository
        path: String,
    },

    /// The external tool could not be launched
    #[error("Failed to launch `{program}`: {source}")]
    ToolInvocation {
        /// Program that was executed
        program: String,
        /// Underlying spawn error
        #[source]
        source: std::io::Error,
    },

    /// The external tool exited with a non-zero status
    #[error("`{program}` exited with {status}: {stderr}")]
    ToolExit {
        /// Program that was executed
        program: String,
        /// Exit status reported by the process
        status: ExitStatus,
        /// Captured standard error output
        stderr: String,
    },

    /// Reading the tool's output stream failed
    #[error("I/O error reading tool output: {0}")]
    Io(#[from] std::io::Error),
}

impl GitError {
    /// Whether retrying on user request could succeed
    ///
    /// A missing repository is fatal for the path; tool failures are
    /// environmental and may clear up.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::RepositoryNotFound { .. })
    }
}

/// A raw block that could not be turned into a [`Commit`](crate::Commit)
///
/// This is a value, not a fault: callers count it and move on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Malformed commit record ({reason}): {raw:?}")]
pub struct ParseFailure {
    /// What was wrong with the block
    pub reason: String,
    /// The offending text, verbatim
    pub raw: String,
}

impl ParseFailure {
    pub(crate) fn new(reason: impl Into<String>, raw: &str) -> Self {
        Self {
            reason: reason.into(),
            raw: raw.to_string(),
        }
    }
}
