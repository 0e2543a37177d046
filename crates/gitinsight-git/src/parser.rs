// Copyright (c) 2026 - present gitinsight contributors
// SPDX-License-Identifier: MIT

//! Commit record parsing
//!
//! The source asks git for one record per commit in a fixed layout:
//!
//! ```text
//! <RS>hash<US>author<US>iso-8601 author date<US>subject
//! ```
//!
//! `RS` (0x1e) and `US` (0x1f) are ASCII control characters that cannot
//! appear in a subject line, so no escaping is needed. Parsing never fails
//! as a whole: each block becomes either a [`Commit`] or a [`ParseFailure`].

use chrono::DateTime;
use tracing::{debug, warn};

use crate::commit::{Commit, UNKNOWN_AUTHOR};
use crate::error::ParseFailure;

/// Marks the start of every record in the tool output
pub const RECORD_SEPARATOR: char = '\x1e';

/// Separates fields within a record
pub const FIELD_SEPARATOR: char = '\x1f';

/// The `git log --format` string matching [`parse_block`]
///
/// This is the wire contract with the tool; changing it breaks parsing.
pub const LOG_FORMAT: &str = "%x1e%H%x1f%an%x1f%aI%x1f%s";

const FIELD_COUNT: usize = 4;

/// Outcome of parsing a batch of blocks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseReport {
    /// Successfully parsed commits, in input order
    pub commits: Vec<Commit>,
    /// Blocks that were skipped, in input order
    pub failures: Vec<ParseFailure>,
}

impl ParseReport {
    /// Number of blocks seen
    #[must_use]
    pub fn total(&self) -> usize {
        self.commits.len() + self.failures.len()
    }

    /// Record the outcome of one block
    pub fn push(&mut self, outcome: Result<Commit, ParseFailure>) {
        match outcome {
            Ok(commit) => self.commits.push(commit),
            Err(failure) => {
                warn!(reason = %failure.reason, "Skipping malformed commit record");
                self.failures.push(failure);
            }
        }
    }
}

/// Parse one raw record into a commit
///
/// Surrounding newlines (git terminates each record with one) are ignored.
/// A leading record separator, if still attached, is ignored too.
///
/// # Errors
///
/// Returns a [`ParseFailure`] carrying the block text when a field is
/// missing, the hash is not a hex object id, or the date is not ISO-8601.
pub fn parse_block(raw: &str) -> Result<Commit, ParseFailure> {
    let block = raw
        .trim_start_matches(RECORD_SEPARATOR)
        .trim_matches(|c| c == '\n' || c == '\r');

    if block.trim().is_empty() {
        return Err(ParseFailure::new("empty record", raw));
    }

    let fields: Vec<&str> = block.splitn(FIELD_COUNT, FIELD_SEPARATOR).collect();
    let [hash, author, date, message] = fields.as_slice() else {
        return Err(ParseFailure::new(
            format!("expected {FIELD_COUNT} fields, found {}", fields.len()),
            raw,
        ));
    };

    let hash = hash.trim();
    if !Commit::is_valid_hash(hash) {
        return Err(ParseFailure::new("invalid hash", raw));
    }

    let timestamp = DateTime::parse_from_rfc3339(date.trim())
        .map_err(|e| ParseFailure::new(format!("unparsable timestamp: {e}"), raw))?;

    let author = match author.trim() {
        "" => UNKNOWN_AUTHOR,
        name => name,
    };

    Ok(Commit {
        hash: hash.to_ascii_lowercase(),
        author: author.to_string(),
        timestamp,
        message: message.lines().next().unwrap_or("").trim_end().to_string(),
    })
}

/// Parse a sequence of blocks, skipping malformed ones
pub fn parse_blocks<I, S>(blocks: I) -> ParseReport
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let report = blocks
        .into_iter()
        .fold(ParseReport::default(), |mut report, block| {
            report.push(parse_block(block.as_ref()));
            report
        });
    debug!(
        parsed = report.commits.len(),
        skipped = report.failures.len(),
        "Parsed commit records"
    );
    report
}

/// Split complete tool output into raw record blocks
///
/// Blank chunks (the text before the first separator, stray newlines) are
/// dropped.
pub fn split_records(output: &str) -> impl Iterator<Item = &str> {
    output
        .split(RECORD_SEPARATOR)
        .filter(|chunk| !chunk.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use similar_asserts::assert_eq;

    const H1: &str = "1111111111111111111111111111111111111111";
    const H2: &str = "2222222222222222222222222222222222222222";

    fn block(hash: &str, author: &str, date: &str, message: &str) -> String {
        format!("{hash}\x1f{author}\x1f{date}\x1f{message}\n")
    }

    #[test]
    fn test_parse_valid_block() {
        let commit = parse_block(&block(H1, "Ada", "2024-01-01T09:00:00+00:00", "init"))
            .expect("should parse");

        assert_eq!(commit.hash, H1);
        assert_eq!(commit.author, "Ada");
        assert_eq!(commit.message, "init");
        assert_eq!(
            commit.timestamp,
            FixedOffset::east_opt(0)
                .unwrap()
                .with_ymd_and_hms(2024, 1, 1, 9, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_parse_preserves_offset() {
        let commit = parse_block(&block(H1, "Ada", "2024-03-05T22:15:00-05:00", "late"))
            .expect("should parse");
        assert_eq!(commit.timestamp.offset().local_minus_utc(), -5 * 3600);
        assert_eq!(commit.hour(), 22);
    }

    #[test]
    fn test_parse_accepts_zulu_and_leading_separator() {
        let raw = format!("\x1e{}", block(H1, "Ada", "2024-01-01T09:00:00Z", "x"));
        let commit = parse_block(&raw).expect("should parse");
        assert_eq!(commit.hour(), 9);
    }

    #[test]
    fn test_parse_empty_message() {
        let commit =
            parse_block(&block(H1, "Ada", "2024-01-01T09:00:00Z", "")).expect("should parse");
        assert_eq!(commit.message, "");
    }

    #[test]
    fn test_parse_message_with_separator_kept_whole() {
        let commit = parse_block(&block(H1, "Ada", "2024-01-01T09:00:00Z", "a\x1fb"))
            .expect("should parse");
        assert_eq!(commit.message, "a\x1fb");
    }

    #[test]
    fn test_parse_empty_author_falls_back() {
        let commit =
            parse_block(&block(H1, "  ", "2024-01-01T09:00:00Z", "x")).expect("should parse");
        assert_eq!(commit.author, UNKNOWN_AUTHOR);
    }

    #[test]
    fn test_parse_missing_delimiter() {
        let raw = format!("{H1}\x1fAda\x1f2024-01-01T09:00:00Z");
        let failure = parse_block(&raw).expect_err("should fail");
        assert!(failure.reason.contains("expected 4 fields"));
        assert_eq!(failure.raw, raw);
    }

    #[test]
    fn test_parse_bad_timestamp() {
        let failure = parse_block(&block(H1, "Ada", "yesterday", "x")).expect_err("should fail");
        assert!(failure.reason.starts_with("unparsable timestamp"));
    }

    #[test]
    fn test_parse_bad_hash() {
        let failure = parse_block(&block("xyz", "Ada", "2024-01-01T09:00:00Z", "x"))
            .expect_err("should fail");
        assert_eq!(failure.reason, "invalid hash");
    }

    #[test]
    fn test_parse_empty_block() {
        assert!(parse_block("\n").is_err());
        assert!(parse_block("").is_err());
    }

    #[test]
    fn test_parse_blocks_skips_and_continues() {
        let blocks = vec![
            block(H1, "Ada", "2024-01-01T09:00:00Z", "one"),
            "garbage".to_string(),
            block(H2, "Bob", "2024-01-01T10:00:00Z", "two"),
        ];
        let report = parse_blocks(&blocks);

        assert_eq!(report.total(), 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].raw, "garbage");
        let hashes: Vec<&str> = report.commits.iter().map(|c| c.hash.as_str()).collect();
        assert_eq!(hashes, vec![H1, H2]);
    }

    #[test]
    fn test_split_records() {
        let output = format!(
            "\x1e{}\x1e{}",
            block(H1, "Ada", "2024-01-01T09:00:00Z", "one"),
            block(H2, "Bob", "2024-01-01T10:00:00Z", "two"),
        );
        let report = parse_blocks(split_records(&output));
        assert_eq!(report.commits.len(), 2);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn test_log_format_uses_separators() {
        assert!(LOG_FORMAT.starts_with("%x1e"));
        assert_eq!(LOG_FORMAT.matches("%x1f").count(), FIELD_COUNT - 1);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    /// A block that parses, or a garbage string that does not
    fn block_strategy() -> impl Strategy<Value = (bool, String)> {
        prop_oneof![
            (
                "[0-9a-f]{40}",
                "[A-Za-z ]{1,20}",
                0i64..2_000_000_000i64,
                "[^\n\x1e\x1f]{0,40}",
            )
                .prop_map(|(hash, author, secs, message)| {
                    let date = DateTime::from_timestamp(secs, 0)
                        .expect("timestamp in range")
                        .to_rfc3339();
                    (true, format!("{hash}\x1f{author}\x1f{date}\x1f{message}\n"))
                }),
            "[^\x1f]{0,60}".prop_map(|garbage| (false, garbage)),
        ]
    }

    proptest! {
        /// Property: parsed count equals input count minus malformed count,
        /// and parsed commits keep the input order
        #[test]
        fn prop_parse_is_order_preserving(blocks in proptest::collection::vec(block_strategy(), 0..40)) {
            let report = parse_blocks(blocks.iter().map(|(_, b)| b));
            let expected_valid: Vec<&String> =
                blocks.iter().filter(|(valid, _)| *valid).map(|(_, b)| b).collect();

            prop_assert_eq!(report.total(), blocks.len());
            prop_assert_eq!(report.commits.len(), expected_valid.len());
            for (commit, raw) in report.commits.iter().zip(expected_valid) {
                prop_assert!(raw.starts_with(&commit.hash));
            }
        }

        /// Property: parse_block never panics on arbitrary input
        #[test]
        fn prop_parse_block_total(raw in ".*") {
            let _ = parse_block(&raw);
        }
    }
}
