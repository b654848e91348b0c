//! 统一翻译服务
//!
//! 自动翻译、出站拦截和临时翻译共用同一个服务实例：
//! 先查缓存，命中即返回；未命中时，同一请求的并发调用共享一次在途调用，
//! 完成后把结果扇出给全部等待者并写入缓存。
//!
//! 服务运行在页面上下文的单线程事件循环上，内部状态只在挂起点之间访问。

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture, Shared};
use tracing::debug;

use super::client::{preview, TranslationClient};
use super::{TranslationRequest, TranslationResult};
use crate::translation::error::TranslatorResult;
use crate::translation::storage::{CacheStats, TranslationCache};

type SharedTranslation = Shared<LocalBoxFuture<'static, TranslatorResult<TranslationResult>>>;

/// 服务运行统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ServiceStats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub coalesced: u64,
    pub failures: u64,
}

#[derive(Default)]
struct StatCounters {
    cache_hits: Cell<u64>,
    cache_misses: Cell<u64>,
    coalesced: Cell<u64>,
    failures: Cell<u64>,
}

impl StatCounters {
    fn bump(counter: &Cell<u64>) {
        counter.set(counter.get() + 1);
    }
}

struct ServiceInner {
    client: TranslationClient,
    cache: RefCell<TranslationCache>,
    in_flight: RefCell<HashMap<TranslationRequest, SharedTranslation>>,
    stats: StatCounters,
}

/// 翻译服务
#[derive(Clone)]
pub struct TranslationService {
    inner: Rc<ServiceInner>,
}

impl TranslationService {
    pub fn new(client: TranslationClient, cache_capacity: usize) -> Self {
        Self {
            inner: Rc::new(ServiceInner {
                client,
                cache: RefCell::new(TranslationCache::new(cache_capacity)),
                in_flight: RefCell::new(HashMap::new()),
                stats: StatCounters::default(),
            }),
        }
    }

    /// 翻译文本，文本会先被裁剪
    pub async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> TranslatorResult<TranslationResult> {
        let request = TranslationRequest::new(text, source_language, target_language)?;
        self.translate_request(request).await
    }

    /// 翻译一个已构造的请求
    pub async fn translate_request(&self, request: TranslationRequest) -> TranslatorResult<TranslationResult> {
        if let Some(hit) = self.inner.cache.borrow().get(&request) {
            StatCounters::bump(&self.inner.stats.cache_hits);
            debug!("缓存命中: {}", preview(&request.text));
            return Ok(hit);
        }

        let shared = self.in_flight_for(request);
        let result = shared.await;
        if result.is_err() {
            StatCounters::bump(&self.inner.stats.failures);
        }
        result
    }

    // 取得该请求的在途调用，没有则创建
    fn in_flight_for(&self, request: TranslationRequest) -> SharedTranslation {
        let mut in_flight = self.inner.in_flight.borrow_mut();

        if let Some(existing) = in_flight.get(&request) {
            StatCounters::bump(&self.inner.stats.coalesced);
            debug!("合并到在途请求: {}", preview(&request.text));
            return existing.clone();
        }

        StatCounters::bump(&self.inner.stats.cache_misses);

        let inner = Rc::clone(&self.inner);
        let key = request.clone();
        let call = async move {
            let result = inner.client.translate(&key).await;
            inner.in_flight.borrow_mut().remove(&key);
            if let Ok(translation) = &result {
                inner.cache.borrow_mut().put(key, translation.clone());
            }
            result
        }
        .boxed_local()
        .shared();

        in_flight.insert(request, call.clone());
        call
    }

    /// 直接读取缓存，不触发翻译
    pub fn cached(&self, request: &TranslationRequest) -> Option<TranslationResult> {
        self.inner.cache.borrow().get(request)
    }

    /// 当前在途请求数
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.borrow().len()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache.borrow().stats()
    }

    pub fn stats(&self) -> ServiceStats {
        let stats = &self.inner.stats;
        ServiceStats {
            cache_hits: stats.cache_hits.get(),
            cache_misses: stats.cache_misses.get(),
            coalesced: stats.coalesced.get(),
            failures: stats.failures.get(),
        }
    }

    /// 读取设置快照
    pub async fn fetch_settings(&self) -> TranslatorResult<crate::translation::config::Settings> {
        self.inner.client.get_settings().await
    }
}
