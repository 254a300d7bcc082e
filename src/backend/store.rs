//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了进程内的缓存存储，基于分片并发哈希表。

use crate::repository::BannerContent;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// 缓存项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub content: BannerContent,
    /// 新鲜度标记，写入时加入了随机抖动
    pub last_updated_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(content: BannerContent, last_updated_at: DateTime<Utc>) -> Self {
        Self {
            content,
            last_updated_at,
        }
    }

    /// 缓存项在 `now` 时刻的年龄（抖动可能使其为负）
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.last_updated_at
    }

    /// 年龄严格小于 TTL 时视为新鲜
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age(now) < ttl
    }

    /// 年龄严格大于 TTL 时视为过期
    pub fn is_stale(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age(now) > ttl
    }
}

/// 缓存存储
///
/// 单键操作无需外部加锁；克隆得到的是同一个底层存储
#[derive(Clone, Debug, Default)]
pub struct CacheStore {
    entries: Arc<DashMap<String, CacheEntry>>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 非阻塞查询，返回缓存项的副本
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// 写入缓存项，替换已有的值
    pub fn put(&self, key: impl Into<String>, entry: CacheEntry) {
        self.entries.insert(key.into(), entry);
    }

    pub fn delete(&self, key: &str) -> Option<CacheEntry> {
        self.entries.remove(key).map(|(_, entry)| entry)
    }

    /// 某一时刻的快照
    ///
    /// 遍历快照期间存储可以继续被修改；需要删除时先取快照，再按键删除
    pub fn snapshot(&self) -> Vec<(String, CacheEntry)> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// 重新读取当前值，仍然过期才删除
    ///
    /// 快照之后被刷新的缓存项会被保留
    pub fn remove_if_stale(&self, key: &str, now: DateTime<Utc>, ttl: Duration) -> bool {
        let removed = self
            .entries
            .remove_if(key, |_, entry| entry.is_stale(now, ttl))
            .is_some();
        if removed {
            debug!("CacheStore remove_if_stale: key={}, removed=true", key);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
