//! 跨上下文通道
//!
//! 请求按单调递增的编号与响应关联，每个等待者挂在自己的 oneshot 上。
//! 边界处有明确的超时：超时、通道关闭或响应端被丢弃都是 `ChannelError`。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::messages::{Ack, Envelope, PagePush, RuntimeRequest};
use crate::translation::error::{TranslatorError, TranslatorResult};

type PendingTable = Arc<Mutex<HashMap<u64, oneshot::Sender<Value>>>>;

/// 后台一侧的端口：读请求、写响应
pub struct BackgroundPort {
    pub requests: mpsc::UnboundedReceiver<String>,
    pub replies: mpsc::UnboundedSender<String>,
}

struct ChannelInner {
    outbound: mpsc::UnboundedSender<String>,
    pending: PendingTable,
    request_id: AtomicU64,
    timeout: Duration,
    recv_task: JoinHandle<()>,
}

impl Drop for ChannelInner {
    fn drop(&mut self) {
        self.recv_task.abort();
    }
}

/// 页面一侧的请求通道
#[derive(Clone)]
pub struct RuntimeChannel {
    inner: Arc<ChannelInner>,
}

impl RuntimeChannel {
    /// 建立一对端点，必须在 tokio 运行时内调用
    pub fn connect(timeout: Duration) -> (Self, BackgroundPort) {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        let pending: PendingTable = Arc::new(Mutex::new(HashMap::new()));

        let recv_task = {
            let pending = pending.clone();
            tokio::spawn(async move {
                Self::receive_loop(reply_rx, pending).await;
            })
        };

        let channel = Self {
            inner: Arc::new(ChannelInner {
                outbound: request_tx,
                pending,
                request_id: AtomicU64::new(1),
                timeout,
                recv_task,
            }),
        };

        let port = BackgroundPort {
            requests: request_rx,
            replies: reply_tx,
        };

        (channel, port)
    }

    async fn receive_loop(mut inbound: mpsc::UnboundedReceiver<String>, pending: PendingTable) {
        while let Some(text) = inbound.recv().await {
            trace!("通道收到: {}", text);
            match serde_json::from_str::<Envelope>(&text) {
                Ok(envelope) => {
                    let waiter = pending.lock().remove(&envelope.id);
                    match waiter {
                        Some(tx) => {
                            let _ = tx.send(envelope.message);
                        }
                        None => debug!("丢弃没有等待者的响应 #{}", envelope.id),
                    }
                }
                Err(e) => warn!("无法解析通道消息: {}", e),
            }
        }

        // 后台已关闭：丢弃全部等待者，它们会收到 ChannelError
        debug!("后台通道已关闭");
        pending.lock().clear();
    }

    /// 发送请求并等待响应
    pub async fn request(&self, message: &RuntimeRequest) -> TranslatorResult<Value> {
        let id = self.inner.request_id.fetch_add(1, Ordering::SeqCst);
        let envelope = Envelope {
            id,
            message: serde_json::to_value(message)?,
        };
        let text = serde_json::to_string(&envelope)?;
        trace!("通道发送: {}", text);

        let (tx, rx) = oneshot::channel();
        self.inner.pending.lock().insert(id, tx);

        if self.inner.outbound.send(text).is_err() {
            self.inner.pending.lock().remove(&id);
            return Err(TranslatorError::ChannelError("后台上下文不可用".to_string()));
        }

        match tokio::time::timeout(self.inner.timeout, rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(TranslatorError::ChannelError(format!(
                "请求 #{} 的响应端在回复前关闭",
                id
            ))),
            Err(_) => {
                self.inner.pending.lock().remove(&id);
                Err(TranslatorError::ChannelError(format!(
                    "请求 #{} 在 {:?} 内没有响应",
                    id, self.inner.timeout
                )))
            }
        }
    }

    /// 当前等待响应的请求数
    pub fn pending_requests(&self) -> usize {
        self.inner.pending.lock().len()
    }
}

/// 推送到页面的一条消息，处理完后必须确认
pub struct IncomingPush {
    raw: String,
    reply: oneshot::Sender<String>,
}

impl IncomingPush {
    pub fn parse(&self) -> TranslatorResult<PagePush> {
        serde_json::from_str(&self.raw)
            .map_err(|e| TranslatorError::InvalidInput(format!("无法识别的推送: {}", e)))
    }

    pub fn acknowledge(self, ack: Ack) {
        match serde_json::to_string(&ack) {
            Ok(text) => {
                let _ = self.reply.send(text);
            }
            Err(e) => warn!("无法序列化确认: {}", e),
        }
    }
}

/// 后台或弹出页一侧的推送发送端
#[derive(Clone)]
pub struct PushSender {
    outbound: mpsc::UnboundedSender<IncomingPush>,
    timeout: Duration,
}

/// 建立推送通道
pub fn push_channel(timeout: Duration) -> (PushSender, mpsc::UnboundedReceiver<IncomingPush>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (PushSender { outbound: tx, timeout }, rx)
}

impl PushSender {
    /// 推送并等待页面确认
    pub async fn send(&self, push: &PagePush) -> TranslatorResult<Ack> {
        let raw = serde_json::to_string(push)?;
        let (reply, rx) = oneshot::channel();

        self.outbound
            .send(IncomingPush { raw, reply })
            .map_err(|_| TranslatorError::ChannelError("页面上下文不可用".to_string()))?;

        let text = tokio::time::timeout(self.timeout, rx)
            .await?
            .map_err(|_| TranslatorError::ChannelError("页面在确认前关闭".to_string()))?;

        serde_json::from_str(&text)
            .map_err(|e| TranslatorError::ChannelError(format!("无效的确认: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_replies_are_correlated_by_id() {
        let (channel, mut port) = RuntimeChannel::connect(Duration::from_secs(5));

        // 倒序回复两个请求
        let background = tokio::spawn(async move {
            let first: Envelope = serde_json::from_str(&port.requests.recv().await.unwrap()).unwrap();
            let second: Envelope = serde_json::from_str(&port.requests.recv().await.unwrap()).unwrap();
            for envelope in [second, first] {
                let reply = Envelope {
                    id: envelope.id,
                    message: json!({"echo": envelope.id}),
                };
                port.replies.send(serde_json::to_string(&reply).unwrap()).unwrap();
            }
            port
        });

        let (a, b) = tokio::join!(
            channel.request(&RuntimeRequest::GetSettings),
            channel.request(&RuntimeRequest::GetSettings)
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_ne!(a["echo"], b["echo"]);
        assert_eq!(channel.pending_requests(), 0);
        drop(background.await.unwrap());
    }

    #[tokio::test]
    async fn test_timeout_is_channel_error() {
        let (channel, _port) = RuntimeChannel::connect(Duration::from_millis(20));

        let result = channel.request(&RuntimeRequest::GetSettings).await;
        assert!(matches!(result, Err(TranslatorError::ChannelError(_))));
        assert_eq!(channel.pending_requests(), 0);
    }

    #[tokio::test]
    async fn test_closed_background_is_channel_error() {
        let (channel, port) = RuntimeChannel::connect(Duration::from_secs(5));
        drop(port);

        let result = channel.request(&RuntimeRequest::GetSettings).await;
        assert!(matches!(result, Err(TranslatorError::ChannelError(_))));
    }

    #[tokio::test]
    async fn test_push_is_acknowledged() {
        let (sender, mut incoming) = push_channel(Duration::from_secs(5));

        let page = tokio::spawn(async move {
            let push = incoming.recv().await.unwrap();
            assert_eq!(push.parse().unwrap(), PagePush::ToggleTranslation { enabled: true });
            push.acknowledge(Ack::ok());
        });

        let ack = sender
            .send(&PagePush::ToggleTranslation { enabled: true })
            .await
            .unwrap();
        assert!(ack.success);
        page.await.unwrap();
    }
}
