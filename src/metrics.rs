//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存系统的指标收集和监控功能。

use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{span, Level};

/// 指标收集器
///
/// 用于收集和存储缓存系统的各种运行时指标
#[derive(Clone, Debug, Default)]
pub struct Metrics {
    /// 请求总数统计
    /// key: "service:op:result"
    pub requests_total: Arc<Mutex<HashMap<String, u64>>>,
    /// 回源加载耗时
    /// key: "service:op" -> (total_duration_secs, count)
    pub operation_duration: Arc<Mutex<HashMap<String, (f64, u64)>>>,
    /// 最近一次清理后的缓存项数量
    pub cache_entries: Arc<Mutex<HashMap<String, usize>>>,
}

lazy_static! {
    /// 全局指标实例
    pub static ref GLOBAL_METRICS: Metrics = Metrics::default();
}

// 指标写入不应因其他线程 panic 而中断
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Metrics {
    /// 记录请求指标
    ///
    /// # 参数
    ///
    /// * `service` - 服务名称
    /// * `op` - 操作类型（get/load/evict）
    /// * `result` - 操作结果（hit/miss/success/error/shared/removed）
    pub fn record_request(&self, service: &str, op: &str, result: &str) {
        self.record_requests(service, op, result, 1);
    }

    /// 批量记录请求指标
    pub fn record_requests(&self, service: &str, op: &str, result: &str, count: u64) {
        if count == 0 {
            return;
        }
        let span = span!(Level::TRACE, "cache_request", service, op, result);
        let _enter = span.enter();
        let key = format!("{}:{}:{}", service, op, result);
        *lock(&self.requests_total).entry(key).or_insert(0) += count;
    }

    /// 记录操作耗时
    pub fn record_duration(&self, service: &str, op: &str, duration_secs: f64) {
        let key = format!("{}:{}", service, op);
        let mut map = lock(&self.operation_duration);
        let entry = map.entry(key).or_insert((0.0, 0));
        entry.0 += duration_secs;
        entry.1 += 1;
    }

    /// 设置缓存项数量
    pub fn set_cache_entries(&self, service: &str, size: usize) {
        lock(&self.cache_entries).insert(service.to_string(), size);
    }

    /// 读取某个计数器的当前值
    pub fn request_count(&self, service: &str, op: &str, result: &str) -> u64 {
        let key = format!("{}:{}:{}", service, op, result);
        lock(&self.requests_total).get(&key).copied().unwrap_or(0)
    }
}

/// 获取指标字符串
///
/// 将所有指标格式化为 Prometheus 文本格式
pub fn get_metrics_string() -> String {
    let metrics = &GLOBAL_METRICS;
    let reqs = lock(&metrics.requests_total);
    let dur = lock(&metrics.operation_duration);
    let entries = lock(&metrics.cache_entries);

    let mut output = String::new();
    for (k, v) in reqs.iter() {
        let parts: Vec<&str> = k.split(':').collect();
        if parts.len() == 3 {
            output.push_str(&format!(
                "banner_cache_requests_total{{service=\"{}\", operation=\"{}\", result=\"{}\"}} {}\n",
                parts[0], parts[1], parts[2], v
            ));
        }
    }
    for (k, (total, count)) in dur.iter() {
        let parts: Vec<&str> = k.split(':').collect();
        if parts.len() == 2 {
            output.push_str(&format!(
                "banner_cache_operation_duration_seconds_sum{{service=\"{}\", operation=\"{}\"}} {}\n",
                parts[0], parts[1], total
            ));
            output.push_str(&format!(
                "banner_cache_operation_duration_seconds_count{{service=\"{}\", operation=\"{}\"}} {}\n",
                parts[0], parts[1], count
            ));
        }
    }
    for (k, v) in entries.iter() {
        output.push_str(&format!(
            "banner_cache_entries{{service=\"{}\"}} {}\n",
            k, v
        ));
    }
    output
}
