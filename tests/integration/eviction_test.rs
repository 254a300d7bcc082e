//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 过期清理集成测试

#[path = "../common/mod.rs"]
mod common;

use chrono::{Duration as ChronoDuration, Utc};
use common::{content, setup_logging, CountingRepository};
use oxbanner::backend::CacheEntry;
use oxbanner::{BannerCache, CacheConfig, UserBannerParams};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn backdate(cache: &BannerCache, key: &str, age: ChronoDuration) {
    let entry = cache.store().get(key).expect("entry should exist");
    cache
        .store()
        .put(key, CacheEntry::new(entry.content, Utc::now() - age));
}

/// TTL 2 分钟，每分钟清理一次：
/// 加载 -> 命中 -> 过期 -> 被清理 -> 重新加载
#[tokio::test(start_paused = true)]
async fn test_expired_entry_is_swept_and_reloaded() {
    setup_logging();

    let repo = Arc::new(CountingRepository::new());
    repo.respond(1, Ok(content("v1")));
    let config = CacheConfig::new(2.0, 1)
        .with_service_name(common::generate_unique_service_name("sweep_reload"));
    let cache = BannerCache::new(repo.clone(), config, &CancellationToken::new()).unwrap();
    let params = UserBannerParams::new(1, 1);

    assert_eq!(cache.get_banner(1, &params).await.unwrap(), content("v1"));
    assert_eq!(cache.get_banner(1, &params).await.unwrap(), content("v1"));
    assert_eq!(repo.calls(), 1);

    // 超过 TTL + 最大抖动
    backdate(&cache, "1", ChronoDuration::minutes(3));
    repo.respond(1, Ok(content("v2")));

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert!(cache.store().get("1").is_none(), "scheduler should evict");

    assert_eq!(cache.get_banner(1, &params).await.unwrap(), content("v2"));
    assert_eq!(repo.calls(), 2);

    cache.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_sweep_respects_ttl_boundary() {
    setup_logging();

    let repo = Arc::new(CountingRepository::new());
    for feature in 1..=4 {
        repo.respond(feature, Ok(content("boundary")));
    }
    let config = CacheConfig::new(2.0, 60)
        .with_service_name(common::generate_unique_service_name("sweep_boundary"));
    let cache = BannerCache::new(repo, config, &CancellationToken::new()).unwrap();

    for feature in 1..=4 {
        cache
            .get_banner(feature, &UserBannerParams::new(feature, 1))
            .await
            .unwrap();
    }

    let ttl = ChronoDuration::minutes(2);
    let eps = ChronoDuration::seconds(5);
    backdate(&cache, "1", ttl - eps);
    backdate(&cache, "2", ttl + eps);
    backdate(&cache, "3", ChronoDuration::hours(1));

    assert_eq!(cache.sweep_now(), 2);
    assert!(cache.store().get("1").is_some());
    assert!(cache.store().get("2").is_none());
    assert!(cache.store().get("3").is_none());
    assert!(cache.store().get("4").is_some());

    // 再次清理没有可删除的项
    assert_eq!(cache.sweep_now(), 0);
    assert_eq!(cache.store().len(), 2);

    cache.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_stale_entry_served_until_swept() {
    setup_logging();

    let repo = Arc::new(CountingRepository::new());
    repo.respond(9, Ok(content("stale")));
    let config = CacheConfig::new(1.0, 60)
        .with_service_name(common::generate_unique_service_name("stale_served"));
    let cache = BannerCache::new(repo.clone(), config, &CancellationToken::new()).unwrap();
    let params = UserBannerParams::new(9, 1);

    cache.get_banner(9, &params).await.unwrap();
    backdate(&cache, "9", ChronoDuration::minutes(30));
    repo.respond(9, Ok(content("fresh")));

    // 快路径不检查新鲜度
    assert_eq!(cache.get_banner(9, &params).await.unwrap(), content("stale"));
    assert_eq!(repo.calls(), 1);

    assert_eq!(cache.sweep_now(), 1);
    assert_eq!(cache.get_banner(9, &params).await.unwrap(), content("fresh"));
    assert_eq!(repo.calls(), 2);

    cache.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_no_sweep_before_first_interval() {
    setup_logging();

    let repo = Arc::new(CountingRepository::new());
    repo.respond(3, Ok(content("early")));
    let config = CacheConfig::new(1.0, 5)
        .with_service_name(common::generate_unique_service_name("first_interval"));
    let cache = BannerCache::new(repo, config, &CancellationToken::new()).unwrap();

    cache
        .get_banner(3, &UserBannerParams::new(3, 1))
        .await
        .unwrap();
    backdate(&cache, "3", ChronoDuration::hours(2));

    tokio::time::sleep(Duration::from_secs(4 * 60)).await;
    assert!(cache.store().get("3").is_some());

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert!(cache.store().get("3").is_none());

    cache.shutdown().await.unwrap();
}
