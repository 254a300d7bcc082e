//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了横幅缓存系统的错误类型和处理机制。

use thiserror::Error;

/// 横幅缓存系统错误类型枚举
///
/// 错误需要实现 `Clone`：同一个键的并发加载只执行一次，
/// 其结果（包括错误）会原样交给所有等待者。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BannerError {
    /// 后端存储中没有匹配的记录
    #[error("Banner not found: {0}")]
    NotFound(String),

    /// 后端存储的其他失败（视为暂时性错误）
    #[error("Repository error: {0}")]
    Repository(String),

    /// 配置错误
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// IO错误
    #[error("IO error: {0}")]
    Io(String),

    /// 关闭错误
    #[error("Shutdown error: {0}")]
    ShutdownError(String),
}

impl BannerError {
    /// 是否为"未找到"错误
    pub fn is_not_found(&self) -> bool {
        matches!(self, BannerError::NotFound(_))
    }

    /// 映射到 HTTP 状态码，供外层处理器使用
    ///
    /// `NotFound` 对应 404，其余错误对应 500。
    pub fn status_code(&self) -> u16 {
        match self {
            BannerError::NotFound(_) => 404,
            _ => 500,
        }
    }
}

impl From<std::io::Error> for BannerError {
    fn from(e: std::io::Error) -> Self {
        BannerError::Io(e.to_string())
    }
}

impl From<toml::de::Error> for BannerError {
    fn from(e: toml::de::Error) -> Self {
        BannerError::ConfigError(e.to_string())
    }
}

/// 缓存操作结果类型别名
pub type Result<T> = std::result::Result<T, BannerError>;
