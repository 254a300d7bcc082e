//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 缓存生命周期集成测试

#[path = "../common/mod.rs"]
mod common;

use common::{content, setup_logging, CountingRepository};
use oxbanner::error::BannerError;
use oxbanner::sync::SchedulerState;
use oxbanner::{BannerCache, CacheConfig, UserBannerParams};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn config(base: &str) -> CacheConfig {
    CacheConfig::new(5.0, 1).with_service_name(common::generate_unique_service_name(base))
}

#[tokio::test]
async fn test_shutdown_stops_scheduler() {
    setup_logging();

    let token = CancellationToken::new();
    let cache =
        BannerCache::new(Arc::new(CountingRepository::new()), config("shutdown"), &token).unwrap();
    assert_eq!(cache.scheduler_state(), SchedulerState::Running);

    cache.shutdown().await.unwrap();
    assert_eq!(cache.scheduler_state(), SchedulerState::Stopped);
    assert!(!token.is_cancelled(), "caller token must stay untouched");

    // 重复关闭是安全的
    cache.shutdown().await.unwrap();
    assert_eq!(cache.scheduler_state(), SchedulerState::Stopped);
}

#[tokio::test]
async fn test_parent_token_cancels_scheduler() {
    setup_logging();

    let token = CancellationToken::new();
    let cache =
        BannerCache::new(Arc::new(CountingRepository::new()), config("parent"), &token).unwrap();

    token.cancel();
    tokio::time::timeout(Duration::from_secs(5), async {
        while cache.scheduler_state() != SchedulerState::Stopped {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("scheduler should observe cancellation");
}

#[tokio::test]
async fn test_lookups_work_after_shutdown() {
    setup_logging();

    let repo = Arc::new(CountingRepository::new());
    repo.respond(1, Ok(content("after")));
    let cache = BannerCache::new(repo.clone(), config("after_shutdown"), &CancellationToken::new())
        .unwrap();

    cache.shutdown().await.unwrap();

    let params = UserBannerParams::new(1, 1);
    assert_eq!(cache.get_banner(1, &params).await.unwrap(), content("after"));
    assert_eq!(cache.get_banner(1, &params).await.unwrap(), content("after"));
    assert_eq!(repo.calls(), 1);
}

#[tokio::test]
async fn test_lock_table_empty_after_failures() {
    setup_logging();

    let repo = Arc::new(CountingRepository::new());
    repo.respond(1, Err(BannerError::Repository("timeout".into())));
    let cache =
        BannerCache::new(repo.clone(), config("lock_leak"), &CancellationToken::new()).unwrap();

    for feature in 1..=100 {
        let result = cache
            .get_banner(feature, &UserBannerParams::new(feature, 1))
            .await;
        assert!(result.is_err());
    }

    assert_eq!(repo.calls(), 100);
    assert!(cache.key_locks().is_empty());
    assert!(cache.store().is_empty());
}

#[tokio::test]
async fn test_cancelled_leader_keeps_single_flight() {
    setup_logging();

    let repo = Arc::new(CountingRepository::new());
    repo.respond(5, Ok(content("reloaded")));
    let gate = repo.gate(5);
    let cache = Arc::new(
        BannerCache::new(
            repo.clone(),
            config("cancelled_leader"),
            &CancellationToken::new(),
        )
        .unwrap(),
    );

    let spawn_lookup = |cache: Arc<BannerCache>| {
        tokio::spawn(async move { cache.get_banner(5, &UserBannerParams::new(5, 1)).await })
    };

    let leader = spawn_lookup(cache.clone());
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(repo.calls(), 1);

    let waiter = spawn_lookup(cache.clone());
    tokio::time::sleep(Duration::from_millis(20)).await;

    // 持锁者在回源途中被取消
    leader.abort();
    assert!(leader.await.unwrap_err().is_cancelled());
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(repo.calls(), 2, "waiter takes over the load");

    let third = spawn_lookup(cache.clone());
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(repo.calls(), 2, "new caller must queue behind the waiter");
    assert_eq!(cache.key_locks().len(), 1);
    assert!(!third.is_finished());

    gate.notify_one();
    assert_eq!(waiter.await.unwrap().unwrap(), content("reloaded"));
    assert_eq!(third.await.unwrap().unwrap(), content("reloaded"));
    assert!(repo.calls() <= 2);
    assert!(cache.key_locks().is_empty());
}

#[tokio::test]
async fn test_cancelled_waiter_does_not_leak_lock() {
    setup_logging();

    let repo = Arc::new(CountingRepository::new());
    repo.respond(5, Ok(content("gated")));
    let gate = repo.gate(5);
    let cache = Arc::new(
        BannerCache::new(repo.clone(), config("cancelled"), &CancellationToken::new()).unwrap(),
    );

    let leader_cache = cache.clone();
    let leader =
        tokio::spawn(async move { leader_cache.get_banner(5, &UserBannerParams::new(5, 1)).await });

    let waiter_cache = cache.clone();
    let waiter =
        tokio::spawn(async move { waiter_cache.get_banner(5, &UserBannerParams::new(5, 1)).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    waiter.abort();
    let _ = waiter.await;

    gate.notify_one();
    assert_eq!(leader.await.unwrap().unwrap(), content("gated"));
    assert!(cache.key_locks().is_empty());
    assert_eq!(repo.calls(), 1);
}
