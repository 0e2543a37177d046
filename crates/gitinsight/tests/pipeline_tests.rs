// Copyright (c) 2026 - present gitinsight contributors
// SPDX-License-Identifier: MIT

//! End-to-end tests: real repositories, the git command-line tool, the
//! cache, and the views.


use std::sync::Arc;

use gitinsight::cache::{BuildError, CacheManager, CacheOptions, CacheState, ViewState};
use gitinsight::views::ViewKind;
use gitinsight_git::{GitCliSource, GitError};
use tokio::runtime::Handle;

use test_utils::{TestGitRepo, git_available, scratch_dir, wait_ready};

/// 2024-01-01T09:00:00Z
const JAN1_0900: i64 = 1_704_099_600;
const HALF_HOUR: i64 = 1_800;
/// 2024-01-02T14:00:00Z
const JAN2_1400: i64 = JAN1_0900 + 86_400 + 5 * 3_600;

fn git_cache() -> CacheManager {
    CacheManager::new(
        Arc::new(GitCliSource::new()),
        CacheOptions::default(),
        Handle::current(),
    )
}

fn scenario_repo(name: &str) -> (TestGitRepo, [String; 3]) {
    let repo = TestGitRepo::new(name);
    let h1 = repo.commit("A", JAN1_0900, 0, "first");
    let h2 = repo.commit("B", JAN1_0900 + HALF_HOUR, 0, "second");
    let h3 = repo.commit("A", JAN2_1400, 0, "third\n\nwith a body");
    (repo, [h1, h2, h3])
}

#[tokio::test]
async fn test_views_from_real_repository() {
    if !git_available() {
        eprintln!("Skipping: git not available");
        return;
    }
    let (repo, [_h1, h2, h3]) = scenario_repo("views");
    let cache = git_cache();

    let hours = cache
        .view(repo.path(), ViewKind::HourHistogram)
        .await
        .expect("hour view");
    let histogram = hours.as_hour_histogram().expect("hour view");
    assert_eq!(histogram.get(9), 2);
    assert_eq!(histogram.get(14), 1);
    assert_eq!(histogram.total(), 3);

    let authors = cache
        .view(repo.path(), ViewKind::AuthorRanking)
        .await
        .expect("author view");
    let rows: Vec<(&str, u64)> = authors
        .as_author_ranking()
        .expect("author view")
        .entries()
        .iter()
        .map(|row| (row.author.as_str(), row.count))
        .collect();
    assert_eq!(rows, vec![("A", 2), ("B", 1)]);

    let recent = cache
        .view(repo.path(), ViewKind::RecentCommits { limit: 2 })
        .await
        .expect("recent view");
    let recent = recent.as_recent_commits().expect("recent view");
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].hash, h3);
    assert_eq!(recent[0].message, "third");
    assert_eq!(recent[1].hash, h2);
}

#[tokio::test]
async fn test_local_timezone_drives_histogram() {
    if !git_available() {
        eprintln!("Skipping: git not available");
        return;
    }
    let repo = TestGitRepo::new("timezone");
    // 08:30 UTC is 14:00 at +05:30
    repo.commit("A", JAN1_0900 - HALF_HOUR, 330, "india");
    let cache = git_cache();

    let view = cache
        .view(repo.path(), ViewKind::HourHistogram)
        .await
        .expect("hour view");
    let histogram = view.as_hour_histogram().expect("hour view");
    assert_eq!(histogram.get(14), 1);
    assert_eq!(histogram.get(8), 0);
}

#[tokio::test]
async fn test_non_repository_never_becomes_ready() {
    if !git_available() {
        eprintln!("Skipping: git not available");
        return;
    }
    let dir = scratch_dir("not-a-repo");
    let cache = git_cache();

    let err = cache.load(&dir).await.expect_err("not a repository");
    assert!(matches!(
        *err,
        BuildError::Source(GitError::RepositoryNotFound { .. })
    ));
    assert!(matches!(
        cache.get_view(&dir, ViewKind::AuthorRanking),
        ViewState::Failed(_)
    ));
    assert_eq!(cache.status(&dir).state, CacheState::Failed);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_repository_without_commits_is_no_data() {
    let repo = TestGitRepo::new("unborn");
    let cache = git_cache();

    let err = cache.load(repo.path()).await.expect_err("no commits yet");
    match &*err {
        BuildError::NoData { skipped, .. } => assert_eq!(*skipped, 0),
        other => panic!("expected NoData, got {other:?}"),
    }
    assert!(err.is_retryable());
    assert_eq!(cache.status(repo.path()).state, CacheState::Failed);
}

#[tokio::test]
async fn test_refresh_picks_up_new_commits() {
    if !git_available() {
        eprintln!("Skipping: git not available");
        return;
    }
    let (repo, _) = scenario_repo("refresh");
    let cache = git_cache();

    let before = cache.load(repo.path()).await.expect("first load");
    assert_eq!(before.len(), 3);

    let h4 = repo.commit("C", JAN2_1400 + 3_600, 0, "fourth");
    let mut events = cache.subscribe();
    assert_eq!(cache.refresh(repo.path()), CacheState::Refreshing);
    let version = wait_ready(&mut events, repo.path()).await;
    assert!(version > before.version());

    let recent = cache
        .view(repo.path(), ViewKind::RecentCommits { limit: 1 })
        .await
        .expect("recent view");
    assert_eq!(recent.version, version);
    assert_eq!(
        recent.as_recent_commits().map(|c| c[0].hash.clone()),
        Some(h4)
    );
    // The old snapshot is untouched
    assert_eq!(before.len(), 3);
}

#[tokio::test]
async fn test_command_line_names_repository() {
    let cache = git_cache();
    let line = cache.command_line("/srv/repo");
    assert!(line.starts_with("git -C /srv/repo log"), "{line}");
    assert!(line.contains("--format="), "{line}");
}
