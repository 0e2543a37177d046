// Copyright (c) 2026 - present gitinsight contributors
// SPDX-License-Identifier: MIT

//! gitinsight library
//!
//! The analytics pipeline behind the `gitinsight` binary: commit snapshots,
//! the view aggregators, and the cache that ties them to repository paths.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use gitinsight::cache::{CacheManager, CacheOptions};
//! use gitinsight::views::ViewKind;
//! use gitinsight_git::GitCliSource;
//!
//! # async fn run() {
//! let cache = CacheManager::new(
//!     Arc::new(GitCliSource::new()),
//!     CacheOptions::default(),
//!     tokio::runtime::Handle::current(),
//! );
//! let view = cache.view(".", ViewKind::AuthorRanking).await.expect("build");
//! if let Some(ranking) = view.as_author_ranking() {
//!     for row in ranking.top(10) {
//!         println!("{:>6}  {}", row.count, row.author);
//!     }
//! }
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod store;
pub mod views;

pub use cache::{BuildError, CacheEvent, CacheManager, CacheOptions, CacheState, ViewState};
pub use store::CommitStore;
pub use views::{ViewKind, ViewResult};
