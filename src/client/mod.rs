//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了横幅查询接口及其缓存实现。

pub mod banner_cache;
pub mod loader;

use crate::error::Result;
use crate::repository::{BannerContent, UserBannerParams};
use async_trait::async_trait;

pub use banner_cache::BannerCache;
pub use loader::{jitter, BannerLoader, LoadedBanner, MAX_JITTER_SECS};

/// 横幅查询接口
///
/// 服务层通过该接口访问缓存，便于替换实现
#[async_trait]
pub trait BannerLookup: Send + Sync {
    /// 按 feature 获取横幅内容
    async fn get_banner(&self, feature_id: i64, params: &UserBannerParams)
        -> Result<BannerContent>;
}
