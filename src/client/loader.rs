//! 回源加载器
//!
//! 缓存未命中时从横幅仓储加载数据，并为新鲜度时间戳生成抖动

use crate::error::Result;
use crate::metrics::GLOBAL_METRICS;
use crate::repository::{BannerRepository, UserBanner, UserBannerParams};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// 抖动的最大绝对值（秒）
pub const MAX_JITTER_SECS: i64 = 15;

/// 在 `[-15s, +15s]` 内均匀分布的随机偏移，毫秒精度
///
/// 同时加载的缓存项因此不会在同一次清理中一起过期
pub fn jitter() -> Duration {
    let bound = MAX_JITTER_SECS * 1000;
    Duration::milliseconds(rand::thread_rng().gen_range(-bound..=bound))
}

/// 一次成功的回源结果
#[derive(Debug, Clone)]
pub struct LoadedBanner {
    pub banner: UserBanner,
    /// 加载完成时的墙钟时间
    pub loaded_at: DateTime<Utc>,
}

/// 横幅加载器
///
/// 不重试、不转换错误：仓储返回什么错误，调用方就拿到什么错误
#[derive(Clone)]
pub struct BannerLoader {
    service_name: String,
    repository: Arc<dyn BannerRepository>,
}

impl std::fmt::Debug for BannerLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BannerLoader")
            .field("service_name", &self.service_name)
            .finish()
    }
}

impl BannerLoader {
    pub fn new(service_name: String, repository: Arc<dyn BannerRepository>) -> Self {
        Self {
            service_name,
            repository,
        }
    }

    /// 从仓储加载横幅
    #[instrument(skip(self), level = "debug", fields(service = %self.service_name))]
    pub async fn load(&self, params: &UserBannerParams) -> Result<LoadedBanner> {
        let start = std::time::Instant::now();
        let result = self.repository.select_user_banner(params).await;
        let duration = start.elapsed().as_secs_f64();
        GLOBAL_METRICS.record_duration(&self.service_name, "load", duration);

        match result {
            Ok(banner) => {
                GLOBAL_METRICS.record_request(&self.service_name, "load", "success");
                debug!(
                    "Loaded banner for feature_id={}, tag_id={} in {:.3}s",
                    params.feature_id, params.tag_id, duration
                );
                Ok(LoadedBanner {
                    banner,
                    loaded_at: Utc::now(),
                })
            }
            Err(e) => {
                GLOBAL_METRICS.record_request(&self.service_name, "load", "error");
                if e.is_not_found() {
                    debug!(
                        "No banner for feature_id={}, tag_id={}",
                        params.feature_id, params.tag_id
                    );
                } else {
                    warn!(
                        "Repository load failed for feature_id={}, tag_id={}: {}",
                        params.feature_id, params.tag_id, e
                    );
                }
                Err(e)
            }
        }
    }
}
