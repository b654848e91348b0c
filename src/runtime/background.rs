//! 后台上下文
//!
//! 每个请求在自己的任务上应答，应答发出前通道对该请求保持打开。

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::channel::BackgroundPort;
use super::messages::{Envelope, ErrorReply, RuntimeRequest};
use super::provider::TranslationProvider;
use crate::translation::config::{Settings, SettingsPatch};

/// 设置存储，持有安装时的默认值
#[derive(Clone, Default)]
pub struct SettingsStore {
    inner: Arc<RwLock<Settings>>,
}

impl SettingsStore {
    pub fn new(defaults: Settings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(defaults)),
        }
    }

    pub fn snapshot(&self) -> Settings {
        self.inner.read().clone()
    }

    pub fn set(&self, settings: Settings) {
        *self.inner.write() = settings;
    }

    /// 合并部分更新并返回新快照
    pub fn update(&self, patch: &SettingsPatch) -> Settings {
        let mut settings = self.inner.write();
        settings.apply(patch);
        settings.clone()
    }
}

/// 后台工作者
pub struct BackgroundWorker {
    provider: Arc<dyn TranslationProvider>,
    store: SettingsStore,
}

impl BackgroundWorker {
    pub fn new(provider: Arc<dyn TranslationProvider>, store: SettingsStore) -> Self {
        Self { provider, store }
    }

    /// 启动请求循环，端口关闭时结束
    pub fn spawn(self, port: BackgroundPort) -> JoinHandle<()> {
        let worker = Arc::new(self);
        info!("后台工作者启动，翻译服务: {}", worker.provider.name());

        tokio::spawn(async move {
            let BackgroundPort {
                mut requests,
                replies,
            } = port;

            while let Some(text) = requests.recv().await {
                let worker = worker.clone();
                let replies = replies.clone();

                tokio::spawn(async move {
                    let Some((id, reply)) = worker.answer(&text).await else {
                        return;
                    };
                    let envelope = Envelope { id, message: reply };
                    match serde_json::to_string(&envelope) {
                        Ok(text) => {
                            if replies.send(text).is_err() {
                                debug!("页面已关闭，丢弃响应 #{}", id);
                            }
                        }
                        Err(e) => warn!("无法序列化响应: {}", e),
                    }
                });
            }

            debug!("后台请求循环结束");
        })
    }

    async fn answer(&self, text: &str) -> Option<(u64, Value)> {
        let envelope: Envelope = match serde_json::from_str(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("丢弃无法解析的请求: {}", e);
                return None;
            }
        };

        let reply = match serde_json::from_value::<RuntimeRequest>(envelope.message) {
            Ok(request) => self.handle(request).await,
            Err(e) => error_reply(format!("unsupported request: {}", e)),
        };

        Some((envelope.id, reply))
    }

    /// 处理单个请求
    pub async fn handle(&self, request: RuntimeRequest) -> Value {
        match request {
            RuntimeRequest::Translate {
                text,
                source_language,
                target_language,
            } => {
                debug!("翻译请求: {} -> {}", source_language, target_language);
                match self
                    .provider
                    .translate(&text, &source_language, &target_language)
                    .await
                {
                    Ok(result) => serde_json::to_value(&result)
                        .unwrap_or_else(|e| error_reply(e.to_string())),
                    Err(e) => {
                        warn!("翻译失败: {}", e);
                        error_reply(e.to_string())
                    }
                }
            }
            RuntimeRequest::GetSettings => serde_json::to_value(self.store.snapshot())
                .unwrap_or_else(|e| error_reply(e.to_string())),
        }
    }
}

fn error_reply(error: String) -> Value {
    serde_json::to_value(ErrorReply { error: error.clone() }).unwrap_or_else(|_| json!({ "error": error }))
}
