//! 存储管理模块
//!
//! 提供翻译结果的内存缓存，生命周期与页面上下文相同

pub mod cache;

pub use cache::{CacheStats, TranslationCache};
