//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了横幅仓储接口，即缓存未命中时回源的后端存储边界。

pub mod memory;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use memory::InMemoryBannerRepository;

/// 横幅内容
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BannerContent {
    pub title: String,
    pub text: String,
    pub url: String,
}

/// 仓储返回的用户横幅
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserBanner {
    pub content: BannerContent,
    /// 记录在后端存储中的最后更新时间
    pub updated_at: DateTime<Utc>,
}

/// 用户横幅查询参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBannerParams {
    pub feature_id: i64,
    pub tag_id: i64,
    /// 跳过缓存，直接读取最新版本
    #[serde(default)]
    pub use_last_revision: bool,
    /// 仅返回启用的横幅（普通用户）；管理员查询时为 false
    #[serde(default = "default_use_active")]
    pub use_active: bool,
}

fn default_use_active() -> bool {
    true
}

impl UserBannerParams {
    pub fn new(feature_id: i64, tag_id: i64) -> Self {
        Self {
            feature_id,
            tag_id,
            use_last_revision: false,
            use_active: true,
        }
    }

    pub fn last_revision(mut self, use_last_revision: bool) -> Self {
        self.use_last_revision = use_last_revision;
        self
    }

    pub fn active_only(mut self, use_active: bool) -> Self {
        self.use_active = use_active;
        self
    }
}

/// 横幅仓储trait
///
/// 找不到匹配记录时必须返回 `BannerError::NotFound`，
/// 以便处理器区分 404 与 500。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BannerRepository: Send + Sync {
    /// 按 feature 与 tag 查询用户横幅
    async fn select_user_banner(&self, params: &UserBannerParams) -> Result<UserBanner>;
}
