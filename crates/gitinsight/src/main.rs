// Copyright (c) 2026 - present gitinsight contributors
// SPDX-License-Identifier: MIT

//! gitinsight: commit history analytics for a local repository
//!
//! Reads the history once through the cache, then prints the requested
//! views as text tables or JSON.

use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use gitinsight::config::{Config, OutputFormat};
use gitinsight::views::{HOURS, ViewData, ViewResult};
use gitinsight::{CacheManager, CacheOptions};
use tracing::info;

fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(config.log_level().into()),
        )
        .init();

    config.validate()?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(run(config))
}

async fn run(config: Config) -> anyhow::Result<()> {
    let repo = config.repo_path();
    let cache = CacheManager::new(
        Arc::new(config.commit_source()),
        CacheOptions::default(),
        tokio::runtime::Handle::current(),
    );

    info!(command = %cache.command_line(&repo), "Analyzing repository");
    let store = cache
        .load(&repo)
        .await
        .with_context(|| format!("Failed to read history of {}", repo.display()))?;
    info!(commits = store.len(), "Analysis complete");

    let mut views = Vec::new();
    for kind in config.view_kinds() {
        views.push(cache.view(&repo, kind).await?);
    }

    let output = match config.format {
        OutputFormat::Json => {
            let results: Vec<&ViewResult> = views.iter().map(Arc::as_ref).collect();
            serde_json::to_string_pretty(&results)?
        }
        OutputFormat::Text => views.iter().fold(String::new(), |mut out, view| {
            render_text(view, &mut out);
            out
        }),
    };
    println!("{output}");
    Ok(())
}

fn render_text(view: &ViewResult, out: &mut String) {
    match &view.data {
        ViewData::HourHistogram(histogram) => {
            let _ = writeln!(out, "Commits by hour of day");
            let width = histogram.counts().iter().max().copied().unwrap_or(0).max(1);
            for hour in 0..HOURS {
                let count = histogram.get(hour);
                let bar = "#".repeat(usize::try_from(count * 40 / width).unwrap_or(40));
                let _ = writeln!(out, "  {hour:02}h {count:>6} {bar}");
            }
        }
        ViewData::AuthorRanking(ranking) => {
            let _ = writeln!(out, "Commits by author");
            for row in ranking.entries() {
                let _ = writeln!(out, "  {:>6}  {}", row.count, row.author);
            }
        }
        ViewData::RecentCommits(commits) => {
            let _ = writeln!(out, "Recent commits");
            for commit in commits {
                let _ = writeln!(
                    out,
                    "  {}  {}  {:<20}  {}",
                    commit.short_hash(),
                    commit.timestamp.format("%Y-%m-%d %H:%M"),
                    commit.author,
                    commit.subject()
                );
            }
        }
    }
    out.push('\n');
}
