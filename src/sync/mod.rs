//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块包含缓存的后台任务。

pub mod eviction;

pub use eviction::{EvictionScheduler, SchedulerState, Sweeper};
