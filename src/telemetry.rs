//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了日志与链路追踪的初始化。

use opentelemetry::global;
use opentelemetry::trace::TracerProvider;
use opentelemetry_sdk::trace::TracerProvider as SdkTracerProvider;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

/// 默认日志过滤规则
pub const DEFAULT_FILTER: &str = "info";

/// 初始化日志与 OpenTelemetry Tracing
///
/// 应在应用启动时调用一次。`RUST_LOG` 存在时优先于 `filter`。
/// 未配置导出器时 tracer provider 不导出任何数据，只保留 span 上下文。
///
/// # 参数
///
/// * `service_name` - 服务名称
/// * `filter` - 默认过滤规则，例如 "info" 或 "oxbanner=debug"
pub fn init_tracing(service_name: &str, filter: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let provider = SdkTracerProvider::builder().build();
    global::set_tracer_provider(provider.clone());
    let tracer = provider.tracer(service_name.to_string());

    let subscriber = Registry::default()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(tracing_opentelemetry::layer().with_tracer(tracer));

    // 已有全局 subscriber 时保留原有的
    let _ = tracing::subscriber::set_global_default(subscriber);
}
