//! oxbanner - 进程内读穿透横幅缓存
//!
//! 位于请求处理器与慢速后端存储之间：命中走无锁快路径，
//! 未命中时同一个键只回源一次，写入时为新鲜度时间戳加入抖动，
//! 并由后台任务定期清理超过 TTL 的缓存项。

pub use tokio;
pub use tokio_util::sync::CancellationToken;

pub mod backend;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod repository;
pub mod service;
pub mod sync;
pub mod telemetry;

// Re-export commonly used items
pub use client::{BannerCache, BannerLookup};
pub use config::{CacheConfig, Config, KeyMode};
pub use error::{BannerError, Result};
pub use repository::{BannerContent, BannerRepository, UserBanner, UserBannerParams};
pub use service::BannerService;

/// oxbanner 版本号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
