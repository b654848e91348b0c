//! 翻译缓存模块
//!
//! 以 (文本, 源语言, 目标语言) 为键的有界缓存。淘汰最早插入的条目，
//! 而不是最近最少使用的条目：读取只用 `peek`，从不提升条目顺序。

use std::num::NonZeroUsize;

use lru::LruCache;

use crate::translation::config::constants::DEFAULT_CACHE_CAPACITY;
use crate::translation::core::{TranslationRequest, TranslationResult};

/// 缓存统计信息
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub insertions: u64,
    pub evictions: u64,
}

/// 翻译缓存
pub struct TranslationCache {
    entries: LruCache<TranslationRequest, TranslationResult>,
    insertions: u64,
    evictions: u64,
}

impl TranslationCache {
    /// 创建指定容量的缓存，容量为 0 时按 1 处理
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            insertions: 0,
            evictions: 0,
        }
    }

    /// 读取缓存，不改变淘汰顺序
    pub fn get(&self, request: &TranslationRequest) -> Option<TranslationResult> {
        self.entries.peek(request).cloned()
    }

    /// 写入缓存
    ///
    /// 已满时先淘汰最早插入的一条；已存在的键原地更新，保持原有位置。
    pub fn put(&mut self, request: TranslationRequest, result: TranslationResult) {
        if let Some(existing) = self.entries.peek_mut(&request) {
            *existing = result;
            return;
        }

        self.insertions += 1;
        if let Some((evicted, _)) = self.entries.push(request, result) {
            self.evictions += 1;
            tracing::debug!(
                "缓存已满，淘汰最早条目: {} ({} -> {})",
                evicted.text,
                evicted.source_language,
                evicted.target_language
            );
        }
    }

    pub fn contains(&self, request: &TranslationRequest) -> bool {
        self.entries.contains(request)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    /// 按插入顺序（最早在前）列出键
    pub fn keys_oldest_first(&self) -> Vec<TranslationRequest> {
        self.entries.iter().rev().map(|(k, _)| k.clone()).collect()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            total_entries: self.entries.len(),
            insertions: self.insertions,
            evictions: self.evictions,
        }
    }
}

impl Default for TranslationCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
