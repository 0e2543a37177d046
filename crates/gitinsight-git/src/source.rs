// Copyright (c) 2026 - present gitinsight contributors
// SPDX-License-Identifier: MIT

//! Commit sources
//!
//! A [`CommitSource`] turns a repository path into a lazy sequence of raw
//! record blocks. [`GitCliSource`] does this by running `git log` and
//! streaming its standard output; every call to [`CommitSource::fetch`]
//! starts a fresh process, so a sequence is restarted by fetching again.
//!
//! Reading the sequence blocks the calling thread while git produces
//! output. Run it on a worker, not on a UI or async executor thread.

use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;

use git2::Repository;
use tracing::debug;

use crate::error::GitError;
use crate::parser::{LOG_FORMAT, RECORD_SEPARATOR};

/// Lazy sequence of raw record blocks
pub type RawBlocks = Box<dyn Iterator<Item = Result<String, GitError>> + Send>;

/// Producer of raw commit records for a repository
pub trait CommitSource: Send + Sync {
    /// Start producing raw record blocks for the repository at `repo`
    ///
    /// Blocks arrive in the tool's traversal order (newest first). A failure
    /// that only shows up once the stream ends, such as a non-zero exit, is
    /// yielded as the final item.
    ///
    /// # Errors
    ///
    /// Returns `GitError::RepositoryNotFound` if `repo` has no repository
    /// metadata and `GitError::ToolInvocation` if the tool cannot start.
    fn fetch(&self, repo: &Path) -> Result<RawBlocks, GitError>;

    /// Human-readable equivalent of what `fetch` runs, for status display
    fn describe(&self, repo: &Path) -> String {
        format!("read commits from {}", repo.display())
    }
}

/// Reads history by running the `git` command-line tool
#[derive(Debug, Clone)]
pub struct GitCliSource {
    program: String,
    max_count: Option<usize>,
}

impl Default for GitCliSource {
    fn default() -> Self {
        Self {
            program: "git".to_string(),
            max_count: None,
        }
    }
}

impl GitCliSource {
    /// Create a source that runs `git` from `PATH`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different git executable
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Stop after the `n` most recent commits
    #[must_use]
    pub fn with_max_count(mut self, n: usize) -> Self {
        self.max_count = Some(n);
        self
    }

    /// The executable this source runs
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments passed after `-C <repo>`
    #[must_use]
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "log".to_string(),
            "--no-color".to_string(),
            "--encoding=UTF-8".to_string(),
            format!("--format={LOG_FORMAT}"),
        ];
        if let Some(n) = self.max_count {
            args.push(format!("--max-count={n}"));
        }
        args
    }

    /// The full command line, as a user would type it
    #[must_use]
    pub fn command_line(&self, repo: &Path) -> String {
        format!(
            "{} -C {} {}",
            self.program,
            repo.display(),
            self.args().join(" ")
        )
    }

    /// Fail early when `repo` is not a repository root
    fn open_repository(repo: &Path) -> Result<Repository, GitError> {
        Repository::open(repo).map_err(|_| GitError::RepositoryNotFound {
            path: repo.display().to_string(),
        })
    }
}

impl CommitSource for GitCliSource {
    fn fetch(&self, repo: &Path) -> Result<RawBlocks, GitError> {
        // `git log` exits non-zero on an unborn branch; no commits is
        // not a tool failure
        if Self::open_repository(repo)?.is_empty()? {
            debug!(path = %repo.display(), "Repository has no commits");
            return Ok(Box::new(std::iter::empty()));
        }

        debug!(command = %self.command_line(repo), "Spawning git");
        let mut child = Command::new(&self.program)
            .arg("-C")
            .arg(repo)
            .args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| GitError::ToolInvocation {
                program: self.program.clone(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("child stdout was not captured"))?;
        let stderr = child.stderr.take();

        // Drained on its own thread so a chatty stderr cannot stall stdout
        let stderr = stderr.map(|mut pipe| {
            std::thread::spawn(move || {
                let mut text = String::new();
                let _ = pipe.read_to_string(&mut text);
                text
            })
        });

        Ok(Box::new(LogStream {
            program: self.program.clone(),
            child: Some(child),
            reader: BufReader::new(stdout),
            stderr,
            buf: Vec::new(),
            done: false,
        }))
    }

    fn describe(&self, repo: &Path) -> String {
        self.command_line(repo)
    }
}

/// Streaming reader over a running `git log`
struct LogStream {
    program: String,
    child: Option<Child>,
    reader: BufReader<ChildStdout>,
    stderr: Option<JoinHandle<String>>,
    buf: Vec<u8>,
    done: bool,
}

impl LogStream {
    /// Reap the process and turn a non-zero exit into an error
    fn finish(&mut self) -> Result<(), GitError> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child.wait()?;
        let stderr = self
            .stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if status.success() {
            Ok(())
        } else {
            Err(GitError::ToolExit {
                program: self.program.clone(),
                status,
                stderr: stderr.trim().to_string(),
            })
        }
    }

    fn abort(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Iterator for LogStream {
    type Item = Result<String, GitError>;

    fn next(&mut self) -> Option<Self::Item> {
        let separator = RECORD_SEPARATOR as u8;
        while !self.done {
            self.buf.clear();
            match self.reader.read_until(separator, &mut self.buf) {
                Ok(0) => {
                    self.done = true;
                    return self.finish().err().map(Err);
                }
                Ok(_) => {
                    if self.buf.last() == Some(&separator) {
                        self.buf.pop();
                    }
                    let chunk = String::from_utf8_lossy(&self.buf);
                    if chunk.trim().is_empty() {
                        continue;
                    }
                    return Some(Ok(chunk.into_owned()));
                }
                Err(e) => {
                    self.done = true;
                    self.abort();
                    return Some(Err(GitError::Io(e)));
                }
            }
        }
        None
    }
}

impl Drop for LogStream {
    fn drop(&mut self) {
        // Dropped before EOF: don't leave the process behind
        self.abort();
    }
}
