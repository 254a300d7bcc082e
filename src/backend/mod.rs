//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存的底层结构：缓存存储和按键锁表。

pub mod key_lock;
pub mod store;

pub use key_lock::{KeyLockGuard, KeyLockRegistry, LoadOutcome};
pub use store::{CacheEntry, CacheStore};
