//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了横幅缓存的配置结构和解析逻辑。

use crate::error::{BannerError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// TTL 环境变量覆盖（分钟，浮点数）
pub const ENV_TTL_MINUTES: &str = "CACHE_KEY_INVALIDATION_MINUTES";
/// 清理间隔环境变量覆盖（分钟，整数）
pub const ENV_SWEEP_INTERVAL_MINUTES: &str = "SCHEDULER_RATE_MINUTE";

const MAX_TTL_MINUTES: f64 = 60.0 * 24.0 * 30.0;
const MAX_SWEEP_INTERVAL_MINUTES: u64 = 60 * 24;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,
}

/// 缓存键的生成方式
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum KeyMode {
    /// 仅使用 feature_id；仅 tag 不同的查询共享同一个缓存项
    #[default]
    Feature,
    /// 使用 feature_id 和 tag_id
    FeatureTag,
}

/// 缓存配置
///
/// 构造缓存时设置一次，之后不可变
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct CacheConfig {
    /// 服务名称，用于日志和指标标签
    pub service_name: String,
    /// 缓存项的最大存活时间（分钟）
    pub ttl_minutes: f64,
    /// 清理任务的执行间隔（分钟）
    pub sweep_interval_minutes: u64,
    /// 缓存键生成方式
    pub key_mode: KeyMode,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            service_name: "banners".to_string(),
            ttl_minutes: 5.0,
            sweep_interval_minutes: 1,
            key_mode: KeyMode::Feature,
        }
    }
}

impl CacheConfig {
    pub fn new(ttl_minutes: f64, sweep_interval_minutes: u64) -> Self {
        Self {
            ttl_minutes,
            sweep_interval_minutes,
            ..Default::default()
        }
    }

    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = service_name.into();
        self
    }

    pub fn with_key_mode(mut self, key_mode: KeyMode) -> Self {
        self.key_mode = key_mode;
        self
    }

    /// TTL，毫秒精度
    ///
    /// 结果限制在 `[0, 30 天]` 内；NaN 视为 0。
    /// 超出范围的值会被 `validate` 拒绝，`BannerCache::new` 在使用前先校验
    pub fn ttl(&self) -> chrono::Duration {
        let minutes = if self.ttl_minutes.is_nan() {
            0.0
        } else {
            self.ttl_minutes.clamp(0.0, MAX_TTL_MINUTES)
        };
        chrono::Duration::milliseconds((minutes * 60_000.0).round() as i64)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_minutes * 60)
    }

    /// 验证缓存配置
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.service_name.is_empty() {
            return Err("Service name cannot be empty".to_string());
        }

        if self.service_name.len() > 64 {
            return Err(format!(
                "Service name '{}' exceeds maximum length of 64 characters",
                self.service_name
            ));
        }

        // 指标键以 ':' 分隔
        if self.service_name.contains(':') {
            return Err(format!(
                "Service name '{}' cannot contain ':'",
                self.service_name
            ));
        }

        if !self.ttl_minutes.is_finite() || self.ttl_minutes <= 0.0 {
            return Err(format!(
                "ttl_minutes must be a positive number, got {}",
                self.ttl_minutes
            ));
        }

        if self.ttl_minutes > MAX_TTL_MINUTES {
            return Err("ttl_minutes cannot exceed 30 days (43200 minutes)".to_string());
        }

        if self.sweep_interval_minutes == 0 {
            return Err("sweep_interval_minutes cannot be zero".to_string());
        }

        if self.sweep_interval_minutes > MAX_SWEEP_INTERVAL_MINUTES {
            return Err(format!(
                "sweep_interval_minutes must be between 1 and {}",
                MAX_SWEEP_INTERVAL_MINUTES
            ));
        }

        Ok(())
    }
}

impl Config {
    /// 从 TOML 字符串解析配置
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// 从 TOML 文件加载配置
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            BannerError::Io(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
    }

    /// 使用环境变量覆盖配置
    ///
    /// 变量存在但无法解析时返回配置错误
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(raw) = std::env::var(ENV_TTL_MINUTES) {
            self.cache.ttl_minutes = raw.trim().parse().map_err(|_| {
                BannerError::ConfigError(format!("{} is not a number: {}", ENV_TTL_MINUTES, raw))
            })?;
        }
        if let Ok(raw) = std::env::var(ENV_SWEEP_INTERVAL_MINUTES) {
            self.cache.sweep_interval_minutes = raw.trim().parse().map_err(|_| {
                BannerError::ConfigError(format!(
                    "{} is not an integer: {}",
                    ENV_SWEEP_INTERVAL_MINUTES, raw
                ))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        self.cache.validate()
    }
}
