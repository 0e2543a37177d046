// Copyright (c) 2026 - present gitinsight contributors
// SPDX-License-Identifier: MIT

//! Snapshot lifecycle and view memoization
//!
//! The [`CacheManager`] owns one [`CommitStore`] per repository path and a
//! memo table of computed views keyed by `(snapshot version, view kind)`.
//! Builds run on tokio's blocking pool; callers never wait on git. Instead
//! [`CacheManager::get_view`] answers immediately with [`ViewState::Pending`]
//! and a [`CacheEvent`] is broadcast when the build settles.
//!
//! Per path the state moves through
//!
//! ```text
//! Empty -> Loading -> Ready -> Refreshing -> Ready (new version)
//!              \                    \
//!               -> Failed            -> Failed (last good snapshot kept)
//! ```
//!
//! Only the most recently requested path may publish a build result. A build
//! that finishes after the user switched away is thrown away.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use gitinsight_git::{Commit, CommitSource, GitError, ParseReport, parse_block};
use lru::LruCache;
use serde::Serialize;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use crate::store::CommitStore;
use crate::views::{ViewKind, ViewResult};

/// Parsed commits between two progress events
pub const PROGRESS_INTERVAL: usize = 100;

/// Why a snapshot could not be built
#[derive(Debug, Error)]
pub enum BuildError {
    /// The source failed: missing repository, tool not found, tool exit
    #[error(transparent)]
    Source(#[from] GitError),

    /// Every record the tool produced was malformed, or there were none
    #[error("No commits could be read from {path} ({skipped} malformed records)")]
    NoData {
        /// Repository that was read
        path: String,
        /// Number of records that failed to parse
        skipped: usize,
    },

    /// The user switched repositories before the build finished
    #[error("Build for {path} was superseded by another repository selection")]
    Superseded {
        /// Repository whose build was discarded
        path: String,
    },
}

impl BuildError {
    /// Whether an explicit refresh might succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Source(e) => e.is_retryable(),
            Self::NoData { .. } | Self::Superseded { .. } => true,
        }
    }
}

/// Source of "now" for snapshot timestamps
pub trait Clock: Send + Sync {
    /// Current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Cache tuning
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// Repositories kept before the least recently used one is evicted
    pub capacity: NonZeroUsize,
    /// Buffered events per subscriber before it starts lagging
    pub event_capacity: usize,
    /// Computed views kept per repository; least recently used go first
    pub memo_capacity: NonZeroUsize,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            capacity: NonZeroUsize::new(4).unwrap_or(NonZeroUsize::MIN),
            event_capacity: 64,
            memo_capacity: NonZeroUsize::new(32).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

impl CacheOptions {
    /// Keep up to `n` repositories (at least one)
    #[must_use]
    pub fn with_capacity(mut self, n: usize) -> Self {
        self.capacity = NonZeroUsize::new(n).unwrap_or(NonZeroUsize::MIN);
        self
    }

    /// Set the per-subscriber event buffer (at least one)
    #[must_use]
    pub fn with_event_capacity(mut self, n: usize) -> Self {
        self.event_capacity = n.max(1);
        self
    }

    /// Keep up to `n` computed views per repository (at least one)
    #[must_use]
    pub fn with_memo_capacity(mut self, n: usize) -> Self {
        self.memo_capacity = NonZeroUsize::new(n).unwrap_or(NonZeroUsize::MIN);
        self
    }
}

/// Lifecycle state of one repository path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheState {
    /// Nothing built yet
    Empty,
    /// First build in flight
    Loading,
    /// Snapshot available
    Ready,
    /// Snapshot available, rebuild in flight
    Refreshing,
    /// Last build failed; an older snapshot may still be served
    Failed,
}

/// Notification broadcast to subscribers
#[derive(Debug, Clone)]
pub enum CacheEvent {
    /// A build was started
    Started {
        /// Repository being built
        path: PathBuf,
    },
    /// A build has parsed another batch of commits
    Progress {
        /// Repository being built
        path: PathBuf,
        /// Commits parsed so far
        parsed: usize,
    },
    /// A new snapshot was published
    Ready {
        /// Repository that was built
        path: PathBuf,
        /// Version of the new snapshot
        version: u64,
        /// Commits in the new snapshot
        commits: usize,
    },
    /// A build failed
    Failed {
        /// Repository that was built
        path: PathBuf,
        /// What went wrong
        error: Arc<BuildError>,
    },
    /// A finished build was dropped because its path is no longer current
    Discarded {
        /// Repository whose result was dropped
        path: PathBuf,
    },
}

impl CacheEvent {
    /// Repository the event is about
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Started { path }
            | Self::Progress { path, .. }
            | Self::Ready { path, .. }
            | Self::Failed { path, .. }
            | Self::Discarded { path } => path,
        }
    }
}

/// Answer to a view query
#[derive(Debug, Clone)]
pub enum ViewState {
    /// No data yet; a build is in flight
    Pending,
    /// Data is available
    Ready {
        /// The view
        view: Arc<ViewResult>,
        /// A newer snapshot is being built
        refreshing: bool,
        /// The latest refresh failed; `view` comes from an older snapshot
        stale_error: Option<Arc<BuildError>>,
    },
    /// The path has never been built successfully
    Failed(Arc<BuildError>),
}

impl ViewState {
    /// The view, if any data is available
    #[must_use]
    pub fn view(&self) -> Option<&Arc<ViewResult>> {
        match self {
            Self::Ready { view, .. } => Some(view),
            Self::Pending | Self::Failed(_) => None,
        }
    }

    /// Whether the caller should wait for a notification
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Point-in-time description of one repository's cache entry
#[derive(Debug, Clone)]
pub struct CacheStatus {
    /// Lifecycle state
    pub state: CacheState,
    /// Version of the current snapshot
    pub version: Option<u64>,
    /// Commits in the current snapshot
    pub commits: Option<usize>,
    /// When the current snapshot was built
    pub built_at: Option<DateTime<Utc>>,
    /// Error from the most recent failed build
    pub last_error: Option<Arc<BuildError>>,
    /// View queries answered from the memo table
    pub memo_hits: u64,
    /// View queries that had to run an aggregator
    pub memo_misses: u64,
}

impl CacheStatus {
    fn empty() -> Self {
        Self {
            state: CacheState::Empty,
            version: None,
            commits: None,
            built_at: None,
            last_error: None,
            memo_hits: 0,
            memo_misses: 0,
        }
    }
}

struct PathEntry {
    state: Option<CacheState>,
    /// Id of the build this entry is waiting for
    build: Option<u64>,
    snapshot: Option<Arc<CommitStore>>,
    last_error: Option<Arc<BuildError>>,
    memo: LruCache<(u64, ViewKind), Arc<ViewResult>>,
    memo_hits: u64,
    memo_misses: u64,
}

impl PathEntry {
    fn new(memo_capacity: NonZeroUsize) -> Self {
        Self {
            state: None,
            build: None,
            snapshot: None,
            last_error: None,
            memo: LruCache::new(memo_capacity),
            memo_hits: 0,
            memo_misses: 0,
        }
    }

    fn state(&self) -> CacheState {
        self.state.unwrap_or(CacheState::Empty)
    }

    /// State to return to when an in-flight build is dropped
    fn settled_state(&self) -> CacheState {
        match (&self.snapshot, &self.last_error) {
            (_, Some(_)) => CacheState::Failed,
            (Some(_), None) => CacheState::Ready,
            (None, None) => CacheState::Empty,
        }
    }

    fn status(&self) -> CacheStatus {
        CacheStatus {
            state: self.state(),
            version: self.snapshot.as_ref().map(|s| s.version()),
            commits: self.snapshot.as_ref().map(|s| s.len()),
            built_at: self.snapshot.as_ref().map(|s| s.built_at()),
            last_error: self.last_error.clone(),
            memo_hits: self.memo_hits,
            memo_misses: self.memo_misses,
        }
    }
}

struct Shared {
    selected: Option<PathBuf>,
    entries: LruCache<PathBuf, PathEntry>,
    memo_capacity: NonZeroUsize,
}

struct Inner {
    source: Arc<dyn CommitSource>,
    clock: Arc<dyn Clock>,
    runtime: Handle,
    shared: Mutex<Shared>,
    events: broadcast::Sender<CacheEvent>,
    versions: AtomicU64,
    builds_started: AtomicU64,
}

/// Per-repository snapshot cache with memoized views
///
/// Cheap to clone; clones share the same cache.
#[derive(Clone)]
pub struct CacheManager {
    inner: Arc<Inner>,
}

impl CacheManager {
    /// Create a manager that builds on `runtime`'s blocking pool
    #[must_use]
    pub fn new(source: Arc<dyn CommitSource>, options: CacheOptions, runtime: Handle) -> Self {
        Self::with_clock(source, Arc::new(SystemClock), options, runtime)
    }

    /// Create a manager with an explicit clock
    #[must_use]
    pub fn with_clock(
        source: Arc<dyn CommitSource>,
        clock: Arc<dyn Clock>,
        options: CacheOptions,
        runtime: Handle,
    ) -> Self {
        let (events, _) = broadcast::channel(options.event_capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                source,
                clock,
                runtime,
                shared: Mutex::new(Shared {
                    selected: None,
                    entries: LruCache::new(options.capacity),
                    memo_capacity: options.memo_capacity,
                }),
                events,
                versions: AtomicU64::new(0),
                builds_started: AtomicU64::new(0),
            }),
        }
    }

    /// Receive build notifications
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.inner.events.subscribe()
    }

    /// Make `path` the current repository
    ///
    /// Other cached paths stay available until evicted.
    pub fn select(&self, path: impl AsRef<Path>) {
        let mut shared = self.inner.lock();
        Inner::select(&mut shared, path.as_ref());
    }

    /// The current repository, if any
    #[must_use]
    pub fn selected(&self) -> Option<PathBuf> {
        self.inner.lock().selected.clone()
    }

    /// Query a view without blocking
    ///
    /// Selects `path`, starts the first build if nothing is cached, and
    /// answers from the memo table when the snapshot version is unchanged.
    pub fn get_view(&self, path: impl AsRef<Path>, kind: ViewKind) -> ViewState {
        let path = path.as_ref();
        let mut shared = self.inner.lock();
        let entry = Inner::select(&mut shared, path);

        match entry.state() {
            CacheState::Empty => {
                entry.state = Some(CacheState::Loading);
                entry.build = Some(self.inner.spawn_build(path));
                ViewState::Pending
            }
            CacheState::Loading => ViewState::Pending,
            state => {
                let Some(snapshot) = entry.snapshot.clone() else {
                    return match &entry.last_error {
                        Some(error) => ViewState::Failed(Arc::clone(error)),
                        None => ViewState::Pending,
                    };
                };

                let key = (snapshot.version(), kind);
                let view = if let Some(view) = entry.memo.get(&key).cloned() {
                    entry.memo_hits += 1;
                    view
                } else {
                    debug!(path = %path.display(), view = %kind, version = snapshot.version(), "Computing view");
                    entry.memo_misses += 1;
                    let view = Arc::new(kind.compute(&snapshot));
                    entry.memo.put(key, Arc::clone(&view));
                    view
                };

                ViewState::Ready {
                    view,
                    refreshing: state == CacheState::Refreshing,
                    stale_error: if state == CacheState::Failed {
                        entry.last_error.clone()
                    } else {
                        None
                    },
                }
            }
        }
    }

    /// Rebuild `path`, keeping current data servable meanwhile
    ///
    /// Does nothing if a build is already in flight. Returns the state after
    /// the request.
    pub fn refresh(&self, path: impl AsRef<Path>) -> CacheState {
        let path = path.as_ref();
        let mut shared = self.inner.lock();
        let entry = Inner::select(&mut shared, path);

        let next = match entry.state() {
            state @ (CacheState::Loading | CacheState::Refreshing) => return state,
            _ if entry.snapshot.is_some() => CacheState::Refreshing,
            _ => CacheState::Loading,
        };
        info!(path = %path.display(), "Refresh requested");
        entry.state = Some(next);
        entry.build = Some(self.inner.spawn_build(path));
        next
    }

    /// Wait until `path` has settled and return its snapshot
    ///
    /// Starts a build if nothing is cached. A refresh in flight is waited
    /// for.
    ///
    /// # Errors
    ///
    /// Returns the build error if the path has no usable snapshot, or
    /// `BuildError::Superseded` if another path was selected before the
    /// build finished.
    pub async fn load(&self, path: impl AsRef<Path>) -> Result<Arc<CommitStore>, Arc<BuildError>> {
        let path = path.as_ref();
        let mut events = self.subscribe();
        {
            let mut shared = self.inner.lock();
            let entry = Inner::select(&mut shared, path);
            if entry.state() == CacheState::Empty {
                entry.state = Some(CacheState::Loading);
                entry.build = Some(self.inner.spawn_build(path));
            }
        }

        loop {
            if let Some(outcome) = self.settled(path) {
                return outcome;
            }
            match events.recv().await {
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => {
                    return Err(Arc::new(BuildError::Superseded {
                        path: path.display().to_string(),
                    }));
                }
            }
        }
    }

    /// Wait for data and return a view
    ///
    /// # Errors
    ///
    /// Same as [`CacheManager::load`].
    pub async fn view(
        &self,
        path: impl AsRef<Path>,
        kind: ViewKind,
    ) -> Result<Arc<ViewResult>, Arc<BuildError>> {
        let path = path.as_ref();
        self.load(path).await?;
        match self.get_view(path, kind) {
            ViewState::Ready { view, .. } => Ok(view),
            ViewState::Failed(error) => Err(error),
            // Evicted or cleared between the two calls
            ViewState::Pending => Err(Arc::new(BuildError::Superseded {
                path: path.display().to_string(),
            })),
        }
    }

    /// Forget everything cached for `path`
    ///
    /// A build in flight for it is discarded on completion, even if the
    /// path has been requested again in the meantime.
    pub fn clear(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        if self.inner.lock().entries.pop(path).is_some() {
            debug!(path = %path.display(), "Cleared cache entry");
        }
    }

    /// Describe the cache entry for `path` without touching its recency
    #[must_use]
    pub fn status(&self, path: impl AsRef<Path>) -> CacheStatus {
        self.inner
            .lock()
            .entries
            .peek(path.as_ref())
            .map_or_else(CacheStatus::empty, PathEntry::status)
    }

    /// The current snapshot for `path`, if one has been published
    #[must_use]
    pub fn snapshot(&self, path: impl AsRef<Path>) -> Option<Arc<CommitStore>> {
        self.inner
            .lock()
            .entries
            .peek(path.as_ref())
            .and_then(|entry| entry.snapshot.clone())
    }

    /// Repositories currently cached, most recently used first
    #[must_use]
    pub fn cached_paths(&self) -> Vec<PathBuf> {
        self.inner
            .lock()
            .entries
            .iter()
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Total number of builds started
    #[must_use]
    pub fn builds_started(&self) -> u64 {
        self.inner.builds_started.load(Ordering::SeqCst)
    }

    /// The command the source runs for `path`, for status display
    #[must_use]
    pub fn command_line(&self, path: impl AsRef<Path>) -> String {
        self.inner.source.describe(path.as_ref())
    }

    fn settled(&self, path: &Path) -> Option<Result<Arc<CommitStore>, Arc<BuildError>>> {
        let shared = self.inner.lock();
        let superseded = || {
            Some(Err(Arc::new(BuildError::Superseded {
                path: path.display().to_string(),
            })))
        };
        let Some(entry) = shared.entries.peek(path) else {
            return superseded();
        };

        match entry.state() {
            CacheState::Loading | CacheState::Refreshing => None,
            CacheState::Ready => entry.snapshot.clone().map(Ok),
            CacheState::Failed => match (&entry.snapshot, &entry.last_error) {
                (_, Some(error)) if entry.snapshot.is_none() => Some(Err(Arc::clone(error))),
                (Some(snapshot), _) => Some(Ok(Arc::clone(snapshot))),
                (None, _) => superseded(),
            },
            CacheState::Empty => superseded(),
        }
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark `path` current and return its entry, creating it if needed
    fn select<'a>(shared: &'a mut Shared, path: &Path) -> &'a mut PathEntry {
        if shared.selected.as_deref() != Some(path) {
            debug!(path = %path.display(), "Selected repository");
            shared.selected = Some(path.to_path_buf());
        }
        if !shared.entries.contains(path) && shared.entries.len() == shared.entries.cap().get() {
            if let Some((evicted, _)) = shared.entries.peek_lru() {
                debug!(path = %evicted.display(), "Evicting least recently used repository");
            }
        }
        let memo_capacity = shared.memo_capacity;
        shared
            .entries
            .get_or_insert_mut(path.to_path_buf(), || PathEntry::new(memo_capacity))
    }

    fn emit(&self, event: CacheEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Start a build on the blocking pool and return its id
    ///
    /// Must be called with the entry for `path` locked; the caller records
    /// the id so `publish` can tell this build from older ones.
    fn spawn_build(self: &Arc<Self>, path: &Path) -> u64 {
        let id = self.builds_started.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(path = %path.display(), build = id, "Starting build");
        self.emit(CacheEvent::Started {
            path: path.to_path_buf(),
        });

        let inner = Arc::clone(self);
        let path = path.to_path_buf();
        self.runtime.spawn_blocking(move || {
            let outcome = inner.build(&path);
            inner.publish(&path, id, outcome);
        });
        id
    }

    /// Read and parse the whole history; runs on a blocking worker
    fn build(&self, path: &Path) -> Result<CommitStore, BuildError> {
        info!(path = %path.display(), "Building commit snapshot");

        let mut report = ParseReport::default();
        for block in self.source.fetch(path)? {
            report.push(parse_block(&block?));
            if report.total() % PROGRESS_INTERVAL == 0 {
                self.emit(CacheEvent::Progress {
                    path: path.to_path_buf(),
                    parsed: report.commits.len(),
                });
            }
        }

        let skipped = report.failures.len();
        if report.commits.is_empty() {
            return Err(BuildError::NoData {
                path: path.display().to_string(),
                skipped,
            });
        }
        if skipped > 0 {
            warn!(path = %path.display(), skipped, "Some commit records were malformed");
        }

        let commits: Vec<Commit> = report.commits;
        let version = self.versions.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(CommitStore::build(path, version, self.clock.now(), commits))
    }

    /// Install a finished build, unless the user has moved on
    fn publish(&self, path: &Path, id: u64, outcome: Result<CommitStore, BuildError>) {
        let mut shared = self.lock();
        let current = shared.selected.as_deref() == Some(path);

        // Cleared or evicted while running; a newer entry may exist and
        // belongs to a different build
        let Some(entry) = shared
            .entries
            .peek_mut(path)
            .filter(|entry| entry.build == Some(id))
        else {
            debug!(path = %path.display(), build = id, "Entry no longer waits for this build, discarding");
            self.emit(CacheEvent::Discarded {
                path: path.to_path_buf(),
            });
            return;
        };
        entry.build = None;

        if !current {
            debug!(path = %path.display(), "Repository no longer selected, discarding build");
            entry.state = Some(entry.settled_state());
            self.emit(CacheEvent::Discarded {
                path: path.to_path_buf(),
            });
            return;
        }

        match outcome {
            Ok(store) => {
                let version = store.version();
                let commits = store.len();
                entry.memo.clear();
                entry.snapshot = Some(Arc::new(store));
                entry.last_error = None;
                entry.state = Some(CacheState::Ready);
                info!(path = %path.display(), version, commits, "Snapshot ready");
                self.emit(CacheEvent::Ready {
                    path: path.to_path_buf(),
                    version,
                    commits,
                });
            }
            Err(error) => {
                warn!(path = %path.display(), error = %error, "Snapshot build failed");
                let error = Arc::new(error);
                entry.last_error = Some(Arc::clone(&error));
                entry.state = Some(CacheState::Failed);
                self.emit(CacheEvent::Failed {
                    path: path.to_path_buf(),
                    error,
                });
            }
        }
    }
}
