//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了模拟负载命令：用内存仓储驱动并发查询并输出指标。

use crate::cli::{load_config, SimulateArgs};
use crate::client::BannerCache;
use crate::error::BannerError;
use crate::metrics::get_metrics_string;
use crate::repository::{InMemoryBannerRepository, UserBannerParams};
use anyhow::{bail, Context, Result};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub async fn execute(args: &SimulateArgs) -> Result<()> {
    if args.concurrency == 0 {
        bail!("--concurrency must be at least 1");
    }

    let config = load_config(args.config.as_deref())?;
    let repo = Arc::new(
        InMemoryBannerRepository::from_json_file(&args.fixtures)
            .with_context(|| format!("Failed to load fixtures from {}", args.fixtures.display()))?,
    );

    let targets: Vec<UserBannerParams> = repo
        .keys()
        .into_iter()
        .map(|(feature_id, tag_id)| {
            UserBannerParams::new(feature_id, tag_id).active_only(!args.admin)
        })
        .collect();
    if targets.is_empty() {
        bail!("Fixture file {} contains no banners", args.fixtures.display());
    }

    let shutdown = CancellationToken::new();
    let cache = Arc::new(BannerCache::new(repo.clone(), config.cache.clone(), &shutdown)?);

    info!(
        "Simulating {} lookups over {} keys with concurrency {}",
        args.requests,
        targets.len(),
        args.concurrency
    );

    let start = Instant::now();
    let results: Vec<Result<_, BannerError>> = stream::iter(0..args.requests)
        .map(|i| {
            let cache = cache.clone();
            let params = targets[i % targets.len()];
            async move { cache.get_banner(params.feature_id, &params).await }
        })
        .buffer_unordered(args.concurrency)
        .collect()
        .await;
    let elapsed = start.elapsed();

    let ok = results.iter().filter(|r| r.is_ok()).count();
    let not_found = results
        .iter()
        .filter(|r| matches!(r, Err(e) if e.is_not_found()))
        .count();
    let failed = results.len() - ok - not_found;

    println!("=== Simulation Summary ===\n");
    println!("Lookups:            {}", results.len());
    println!("Succeeded:          {}", ok);
    println!("Not found:          {}", not_found);
    println!("Failed:             {}", failed);
    println!("Repository selects: {}", repo.select_count());
    println!("Cached entries:     {}", cache.store().len());
    println!("Elapsed:            {:.3}s", elapsed.as_secs_f64());
    println!("\n=== Metrics ===\n");
    println!("{}", get_metrics_string());

    cache.shutdown().await?;
    Ok(())
}
