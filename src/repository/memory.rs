//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 基于内存的横幅仓储，用于模拟和测试。

use super::{BannerContent, BannerRepository, UserBanner, UserBannerParams};
use crate::error::{BannerError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Deserialize;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, instrument};

/// 横幅记录
#[derive(Debug, Clone, Deserialize)]
pub struct BannerRecord {
    pub feature_id: i64,
    pub tag_ids: Vec<i64>,
    pub content: BannerContent,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone)]
struct StoredBanner {
    content: BannerContent,
    is_active: bool,
    updated_at: DateTime<Utc>,
}

/// 内存横幅仓储
///
/// 以 `(feature_id, tag_id)` 为键；记录查询次数以便观察回源行为
#[derive(Debug, Default)]
pub struct InMemoryBannerRepository {
    banners: DashMap<(i64, i64), StoredBanner>,
    selects: AtomicU64,
}

impl InMemoryBannerRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从记录列表创建仓储
    pub fn from_records(records: impl IntoIterator<Item = BannerRecord>) -> Self {
        let repo = Self::new();
        for record in records {
            repo.upsert(record);
        }
        repo
    }

    /// 从 JSON 文件加载记录
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            BannerError::Io(format!("failed to read {}: {}", path.display(), e))
        })?;
        let records: Vec<BannerRecord> = serde_json::from_str(&raw).map_err(|e| {
            BannerError::ConfigError(format!("invalid fixture {}: {}", path.display(), e))
        })?;
        Ok(Self::from_records(records))
    }

    /// 插入或替换一条横幅记录，对其每个 tag 生效
    pub fn upsert(&self, record: BannerRecord) {
        for tag_id in &record.tag_ids {
            self.banners.insert(
                (record.feature_id, *tag_id),
                StoredBanner {
                    content: record.content.clone(),
                    is_active: record.is_active,
                    updated_at: record.updated_at,
                },
            );
        }
    }

    /// 删除 feature 下的全部横幅
    pub fn remove_feature(&self, feature_id: i64) {
        self.banners.retain(|(feature, _), _| *feature != feature_id);
    }

    /// 所有 `(feature_id, tag_id)` 组合，按升序排列
    pub fn keys(&self) -> Vec<(i64, i64)> {
        let mut keys: Vec<(i64, i64)> = self.banners.iter().map(|entry| *entry.key()).collect();
        keys.sort_unstable();
        keys
    }

    /// 累计查询次数
    pub fn select_count(&self) -> u64 {
        self.selects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BannerRepository for InMemoryBannerRepository {
    #[instrument(skip(self), level = "debug")]
    async fn select_user_banner(&self, params: &UserBannerParams) -> Result<UserBanner> {
        self.selects.fetch_add(1, Ordering::SeqCst);
        let found = self
            .banners
            .get(&(params.feature_id, params.tag_id))
            .map(|entry| entry.value().clone())
            .filter(|banner| banner.is_active || !params.use_active);

        match found {
            Some(banner) => Ok(UserBanner {
                content: banner.content,
                updated_at: banner.updated_at,
            }),
            None => {
                debug!(
                    "No banner for feature_id={}, tag_id={}",
                    params.feature_id, params.tag_id
                );
                Err(BannerError::NotFound(format!(
                    "no banner for feature_id={} tag_id={}",
                    params.feature_id, params.tag_id
                )))
            }
        }
    }
}
