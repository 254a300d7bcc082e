//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了后台清理任务，定期删除超过 TTL 的缓存项。

use crate::backend::CacheStore;
use crate::error::{BannerError, Result};
use crate::metrics::GLOBAL_METRICS;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// 清理任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Running,
    Stopped,
}

/// 单次清理
///
/// 先取快照，再逐个键重新读取当前值，仍然过期才删除
#[derive(Clone, Debug)]
pub struct Sweeper {
    service_name: String,
    store: CacheStore,
    ttl: chrono::Duration,
}

impl Sweeper {
    pub fn new(service_name: String, store: CacheStore, ttl: chrono::Duration) -> Self {
        Self {
            service_name,
            store,
            ttl,
        }
    }

    /// 执行一次清理，返回删除的缓存项数量
    pub fn sweep_once(&self) -> usize {
        let now = Utc::now();
        let snapshot = self.store.snapshot();
        let scanned = snapshot.len();

        let mut removed = 0;
        for (key, entry) in snapshot {
            if entry.is_stale(now, self.ttl) && self.store.remove_if_stale(&key, now, self.ttl) {
                removed += 1;
            }
        }

        GLOBAL_METRICS.record_requests(&self.service_name, "evict", "removed", removed as u64);
        GLOBAL_METRICS.set_cache_entries(&self.service_name, self.store.len());
        if removed > 0 {
            info!(
                "Service {} sweep removed {} of {} entries",
                self.service_name, removed, scanned
            );
        } else {
            debug!(
                "Service {} sweep scanned {} entries, nothing expired",
                self.service_name, scanned
            );
        }
        removed
    }
}

/// 后台清理调度器
///
/// 构造时进入 `Running`，收到关闭信号后进入 `Stopped`。
/// 正在执行的清理会先完成，下一次等待时才观察到关闭信号
pub struct EvictionScheduler {
    sweeper: Sweeper,
    interval: Duration,
    shutdown: CancellationToken,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for EvictionScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvictionScheduler")
            .field("service_name", &self.sweeper.service_name)
            .field("interval", &self.interval)
            .field("state", &self.state())
            .finish()
    }
}

impl EvictionScheduler {
    /// 启动清理任务
    ///
    /// 必须在 tokio 运行时中调用。第一次清理发生在启动后一个完整间隔。
    /// `shutdown` 被取消时任务退出；`EvictionScheduler::shutdown` 只取消其子令牌
    ///
    /// # 参数
    ///
    /// * `sweeper` - 清理逻辑
    /// * `interval` - 清理间隔
    /// * `shutdown` - 协作式关闭信号
    pub fn start(sweeper: Sweeper, interval: Duration, shutdown: &CancellationToken) -> Self {
        let token = shutdown.child_token();
        let running = Arc::new(AtomicBool::new(true));

        let handle = tokio::spawn(Self::run(
            sweeper.clone(),
            interval,
            token.clone(),
            running.clone(),
        ));

        info!(
            "Eviction scheduler started for service {} (interval={:?}, ttl={}s)",
            sweeper.service_name,
            interval,
            sweeper.ttl.num_seconds()
        );

        Self {
            sweeper,
            interval,
            shutdown: token,
            running,
            handle: Mutex::new(Some(handle)),
        }
    }

    async fn run(
        sweeper: Sweeper,
        period: Duration,
        token: CancellationToken,
        running: Arc<AtomicBool>,
    ) {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    info!("Eviction scheduler for service {} stopping", sweeper.service_name);
                    break;
                }
                _ = ticker.tick() => {
                    sweeper.sweep_once();
                }
            }
        }

        running.store(false, Ordering::SeqCst);
    }

    pub fn state(&self) -> SchedulerState {
        if self.running.load(Ordering::SeqCst) {
            SchedulerState::Running
        } else {
            SchedulerState::Stopped
        }
    }

    /// 立即执行一次清理
    pub fn sweep_now(&self) -> usize {
        self.sweeper.sweep_once()
    }

    /// 停止清理任务并等待其退出
    #[instrument(skip(self), level = "info", fields(service = %self.sweeper.service_name))]
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown.cancel();
        let handle = self.handle.lock().await.take();
        if let Some(handle) = handle {
            handle
                .await
                .map_err(|e| BannerError::ShutdownError(e.to_string()))?;
        }
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for EvictionScheduler {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
