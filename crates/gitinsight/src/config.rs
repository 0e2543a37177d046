// Copyright (c) 2026 - present gitinsight contributors
// SPDX-License-Identifier: MIT

//! Configuration for the gitinsight command-line tool
//!
//! Command-line flags with environment-variable fallbacks, plus the helpers
//! that turn them into pipeline settings.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use gitinsight_git::GitCliSource;

use crate::views::{DEFAULT_RECENT_LIMIT, ViewKind};

/// Commit history analytics for a local git repository
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "gitinsight")]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Repository root to analyze
    ///
    /// Defaults to the current working directory.
    #[arg(env = "GITINSIGHT_REPO")]
    pub repo: Option<PathBuf>,

    /// Which view to print
    #[arg(long, value_enum, default_value_t = ViewSelection::All)]
    pub view: ViewSelection,

    /// Number of commits in the recent-commits view
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// git executable to run
    #[arg(long, env = "GITINSIGHT_GIT")]
    pub git: Option<String>,

    /// Only read the most recent N commits of the history
    ///
    /// Every view is computed over this window.
    #[arg(long, env = "GITINSIGHT_MAX_COMMITS")]
    pub max_commits: Option<usize>,

    /// Enable verbose logging (debug level)
    ///
    /// Logs are written to stderr so they never mix with the report.
    #[arg(short, long, default_value = "false")]
    pub verbose: bool,

    /// Quiet mode - suppress info-level logs
    #[arg(short, long, default_value = "false")]
    pub quiet: bool,
}

/// View selection on the command line
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewSelection {
    /// Commits by hour of day
    Hours,
    /// Commits by author
    Authors,
    /// Most recent commits
    Recent,
    /// All three views
    #[default]
    All,
}

/// How views are printed
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable tables
    #[default]
    Text,
    /// JSON array of view results
    Json,
}

impl Config {
    /// Repository path, using the current directory as default
    #[must_use]
    pub fn repo_path(&self) -> PathBuf {
        self.repo.clone().unwrap_or_else(|| {
            std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
        })
    }

    /// Size of the recent-commits window
    #[must_use]
    pub fn recent_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_RECENT_LIMIT)
    }

    /// git executable, `git` from `PATH` by default
    #[must_use]
    pub fn git_program(&self) -> &str {
        self.git.as_deref().unwrap_or("git")
    }

    /// Commit source configured from the flags
    #[must_use]
    pub fn commit_source(&self) -> GitCliSource {
        let source = GitCliSource::new().with_program(self.git_program());
        match self.max_commits {
            Some(n) => source.with_max_count(n),
            None => source,
        }
    }

    /// Views to compute, in print order
    #[must_use]
    pub fn view_kinds(&self) -> Vec<ViewKind> {
        let recent = ViewKind::RecentCommits {
            limit: self.recent_limit(),
        };
        match self.view {
            ViewSelection::Hours => vec![ViewKind::HourHistogram],
            ViewSelection::Authors => vec![ViewKind::AuthorRanking],
            ViewSelection::Recent => vec![recent],
            ViewSelection::All => vec![ViewKind::HourHistogram, ViewKind::AuthorRanking, recent],
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The repository path is specified but doesn't exist or isn't a directory
    /// - The recent-commits limit or the commit cap is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref repo) = self.repo {
            if !repo.exists() {
                return Err(ConfigError::RepositoryPathNotFound(repo.clone()));
            }
            if !repo.is_dir() {
                return Err(ConfigError::RepositoryPathNotDirectory(repo.clone()));
            }
        }
        if self.limit == Some(0) {
            return Err(ConfigError::InvalidLimit);
        }
        if self.max_commits == Some(0) {
            return Err(ConfigError::InvalidMaxCommits);
        }
        Ok(())
    }

    /// Get the log level based on verbose/quiet flags
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        if self.verbose {
            tracing::Level::DEBUG
        } else if self.quiet {
            tracing::Level::WARN
        } else {
            tracing::Level::INFO
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Repository path not found
    #[error("Repository path not found: {0}")]
    RepositoryPathNotFound(PathBuf),

    /// Repository path is not a directory
    #[error("Repository path is not a directory: {0}")]
    RepositoryPathNotDirectory(PathBuf),

    /// Recent-commits limit of zero
    #[error("--limit must be at least 1")]
    InvalidLimit,

    /// Commit cap of zero
    #[error("--max-commits must be at least 1")]
    InvalidMaxCommits,
}
