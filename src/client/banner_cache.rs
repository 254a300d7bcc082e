//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了读穿透横幅缓存：无锁快路径查询，按键协调的慢路径加载。

use super::loader::{jitter, BannerLoader};
use super::BannerLookup;
use crate::backend::{CacheEntry, CacheStore, KeyLockRegistry};
use crate::config::{CacheConfig, KeyMode};
use crate::error::{BannerError, Result};
use crate::metrics::GLOBAL_METRICS;
use crate::repository::{BannerContent, BannerRepository, UserBannerParams};
use crate::sync::{EvictionScheduler, SchedulerState, Sweeper};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// 读穿透横幅缓存
///
/// 命中时直接返回，不检查新鲜度；过期项只由后台清理任务删除。
/// 未命中时同一个键只有一个调用者回源，其余调用者等待并共享结果
pub struct BannerCache {
    config: CacheConfig,
    store: CacheStore,
    locks: KeyLockRegistry,
    loader: BannerLoader,
    scheduler: EvictionScheduler,
}

impl std::fmt::Debug for BannerCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BannerCache")
            .field("config", &self.config)
            .field("entries", &self.store.len())
            .field("in_flight", &self.locks.len())
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

impl BannerCache {
    /// 创建缓存并启动后台清理任务
    ///
    /// 必须在 tokio 运行时中调用
    ///
    /// # 参数
    ///
    /// * `repository` - 回源使用的横幅仓储
    /// * `config` - 缓存配置，构造后不可变
    /// * `shutdown` - 清理任务的关闭信号
    #[instrument(
        skip(repository, shutdown),
        level = "info",
        name = "init_banner_cache",
        fields(service = %config.service_name)
    )]
    pub fn new(
        repository: Arc<dyn BannerRepository>,
        config: CacheConfig,
        shutdown: &CancellationToken,
    ) -> Result<Self> {
        config.validate().map_err(BannerError::ConfigError)?;

        let store = CacheStore::new();
        let loader = BannerLoader::new(config.service_name.clone(), repository);
        let sweeper = Sweeper::new(config.service_name.clone(), store.clone(), config.ttl());
        let scheduler = EvictionScheduler::start(sweeper, config.sweep_interval(), shutdown);

        info!(
            "Banner cache ready: ttl_minutes={}, sweep_interval_minutes={}, key_mode={:?}",
            config.ttl_minutes, config.sweep_interval_minutes, config.key_mode
        );

        Ok(Self {
            config,
            store,
            locks: KeyLockRegistry::new(),
            loader,
            scheduler,
        })
    }

    /// 计算缓存键
    ///
    /// 默认只使用 feature_id，仅 tag 不同的查询会命中同一个缓存项
    pub fn cache_key(&self, feature_id: i64, params: &UserBannerParams) -> String {
        match self.config.key_mode {
            KeyMode::Feature => feature_id.to_string(),
            KeyMode::FeatureTag => format!("{}:{}", feature_id, params.tag_id),
        }
    }

    /// 获取横幅
    ///
    /// 返回缓存值或新加载的值；加载失败时原样返回仓储的错误
    #[instrument(skip(self, params), level = "debug", fields(service = %self.config.service_name))]
    pub async fn get_banner(
        &self,
        feature_id: i64,
        params: &UserBannerParams,
    ) -> Result<BannerContent> {
        let key = self.cache_key(feature_id, params);

        if let Some(entry) = self.store.get(&key) {
            GLOBAL_METRICS.record_request(&self.config.service_name, "get", "hit");
            debug!("Cache hit: key={}", key);
            return Ok(entry.content);
        }

        GLOBAL_METRICS.record_request(&self.config.service_name, "get", "miss");
        debug!("Cache miss: key={}", key);
        self.build_value(&key, params)
            .await
            .map(|entry| entry.content)
    }

    /// 慢路径：持有键锁，二次检查，回源，加抖动后写入
    async fn build_value(&self, key: &str, params: &UserBannerParams) -> Result<CacheEntry> {
        let mut guard = self.locks.acquire(key).await;

        // 排队期间持锁者已经完成加载
        if let Some(outcome) = guard.shared_outcome() {
            GLOBAL_METRICS.record_request(&self.config.service_name, "load", "shared");
            debug!("Sharing in-flight load result: key={}", key);
            return outcome;
        }

        if let Some(entry) = self.store.get(key) {
            if entry.is_fresh(Utc::now(), self.config.ttl()) {
                debug!("Entry populated while waiting for lock: key={}", key);
                return Ok(entry);
            }
        }

        let outcome = self.loader.load(params).await.map(|loaded| {
            CacheEntry::new(loaded.banner.content, loaded.loaded_at + jitter())
        });

        if let Ok(entry) = &outcome {
            self.store.put(key, entry.clone());
            debug!(
                "Stored entry: key={}, last_updated_at={}",
                key, entry.last_updated_at
            );
        }
        guard.publish(outcome.clone());
        outcome
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// 底层缓存存储
    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// 按键锁表
    pub fn key_locks(&self) -> &KeyLockRegistry {
        &self.locks
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    /// 立即执行一次清理，返回删除数量
    pub fn sweep_now(&self) -> usize {
        self.scheduler.sweep_now()
    }

    /// 停止后台清理任务
    ///
    /// 进行中的回源加载不受影响
    #[instrument(skip(self), level = "info", fields(service = %self.config.service_name))]
    pub async fn shutdown(&self) -> Result<()> {
        info!("正在关闭BannerCache...");
        self.scheduler.shutdown().await?;
        info!("BannerCache已关闭");
        Ok(())
    }
}

#[async_trait]
impl BannerLookup for BannerCache {
    async fn get_banner(
        &self,
        feature_id: i64,
        params: &UserBannerParams,
    ) -> Result<BannerContent> {
        BannerCache::get_banner(self, feature_id, params).await
    }
}
