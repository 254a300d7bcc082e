//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了按键划分的互斥锁表，用于串行化同一个键的回源加载。

use crate::backend::store::CacheEntry;
use crate::error::BannerError;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// 一次回源加载的结果，由持锁者写入，供排队的等待者共享
pub type LoadOutcome = Result<CacheEntry, BannerError>;

/// 单个键的锁句柄
#[derive(Debug, Default)]
pub struct KeyLock {
    outcome: Arc<Mutex<Option<LoadOutcome>>>,
}

/// 按键锁表
///
/// 首次未命中时惰性创建锁句柄；同一个键的并发创建只有一个生效，
/// 所有调用者拿到同一个句柄
#[derive(Clone, Debug, Default)]
pub struct KeyLockRegistry {
    locks: Arc<DashMap<String, Arc<KeyLock>>>,
}

impl KeyLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取键对应的锁，必要时等待
    ///
    /// 返回的守卫在 drop 时释放：先从锁表中移除该句柄，再解锁。
    /// 成功、失败或任务被取消都会走到这里。
    /// 持锁者未发布结果就被取消、且仍有等待者时，句柄留在锁表中，
    /// 拿到锁的等待者会看到 `shared_outcome() == None` 并自行加载
    pub async fn acquire(&self, key: &str) -> KeyLockGuard {
        let handle = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(KeyLock::default()))
            .value()
            .clone();

        let guard = handle.outcome.clone().lock_owned().await;
        debug!("KeyLockRegistry acquire: key={}", key);

        KeyLockGuard {
            key: key.to_string(),
            locks: self.locks.clone(),
            handle,
            guard,
        }
    }

    /// 当前登记的锁数量
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// 键锁守卫
pub struct KeyLockGuard {
    key: String,
    locks: Arc<DashMap<String, Arc<KeyLock>>>,
    handle: Arc<KeyLock>,
    guard: OwnedMutexGuard<Option<LoadOutcome>>,
}

impl KeyLockGuard {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// 先前持锁者在同一个句柄上留下的加载结果
    pub fn shared_outcome(&self) -> Option<LoadOutcome> {
        (*self.guard).clone()
    }

    /// 记录本次加载结果，供仍在排队的等待者使用
    pub fn publish(&mut self, outcome: LoadOutcome) {
        *self.guard = Some(outcome);
    }

    /// 显式释放，等价于 drop
    pub fn release(self) {}
}

impl Drop for KeyLockGuard {
    fn drop(&mut self) {
        // 锁表可能已经指向新的句柄，只移除自己的。
        // 未发布结果（加载被取消）且仍有等待者时保留句柄：
        // 下一个等待者在同一个句柄上接手加载，新调用者继续排队。
        // 引用计数在分片锁内读取，克隆句柄也发生在分片锁内
        let published = self.guard.is_some();
        let removed = self
            .locks
            .remove_if(&self.key, |_, handle| {
                Arc::ptr_eq(handle, &self.handle) && (published || Arc::strong_count(handle) <= 2)
            })
            .is_some();
        debug!(
            "KeyLockRegistry release: key={}, published={}, removed={}",
            self.key, published, removed
        );
    }
}
