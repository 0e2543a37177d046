// Copyright (c) 2026 - present gitinsight contributors
// SPDX-License-Identifier: MIT

//! gitinsight-git: commit history extraction for gitinsight
//!
//! This library crate runs the version-control tool against a repository and
//! turns its output into normalized [`Commit`] records. It is the only part
//! of gitinsight that touches raw tool output.

#![warn(missing_docs)]

//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use gitinsight_git::{CommitSource, GitCliSource, ParseReport, parse_block};
//!
//! let source = GitCliSource::new();
//! let mut report = ParseReport::default();
//! for block in source.fetch(Path::new(".")).expect("fetch") {
//!     report.push(parse_block(&block.expect("read")));
//! }
//!
//! for c in &report.commits {
//!     println!("{} - {}", c.short_hash(), c.subject());
//! }
//! ```

pub mod commit;
pub mod error;
pub mod parser;
pub mod source;

pub use commit::Commit;
pub use error::{GitError, ParseFailure};
pub use parser::{ParseReport, parse_block, parse_blocks};
pub use source::{CommitSource, GitCliSource, RawBlocks};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::commit::Commit;
    pub use crate::error::{GitError, ParseFailure};
    pub use crate::parser::{ParseReport, parse_block, parse_blocks};
    pub use crate::source::{CommitSource, GitCliSource, RawBlocks};
}
