//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了用户横幅服务，处理器层通过它访问缓存或仓储。

use crate::client::BannerLookup;
use crate::error::Result;
use crate::repository::{BannerContent, BannerRepository, UserBannerParams};
use std::sync::Arc;
use tracing::{debug, instrument};

/// 用户横幅服务
///
/// `use_last_revision` 为真时绕过缓存直接读仓储，否则走缓存
#[derive(Clone)]
pub struct BannerService {
    repository: Arc<dyn BannerRepository>,
    cache: Arc<dyn BannerLookup>,
}

impl BannerService {
    pub fn new(repository: Arc<dyn BannerRepository>, cache: Arc<dyn BannerLookup>) -> Self {
        Self { repository, cache }
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn get_user_banner(&self, params: &UserBannerParams) -> Result<BannerContent> {
        if params.use_last_revision {
            debug!("use_last_revision set, bypassing cache");
            let banner = self.repository.select_user_banner(params).await?;
            return Ok(banner.content);
        }
        self.cache.get_banner(params.feature_id, params).await
    }
}
