//! 临时通知
//!
//! 通知的样式与展示由外部负责，这里只把内容送到无界通道上。

use chrono::{DateTime, Local};
use tokio::sync::mpsc;

/// 通知级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// 一条通知
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Message {
        level: NoticeLevel,
        message: String,
        at: DateTime<Local>,
    },
    /// 临时翻译结果
    Translation {
        original: String,
        translated: String,
        from: String,
        to: String,
        at: DateTime<Local>,
    },
    /// 请求展示端把文本写入剪贴板
    Clipboard { text: String, at: DateTime<Local> },
}

impl Notice {
    pub fn level(&self) -> NoticeLevel {
        match self {
            Notice::Message { level, .. } => *level,
            Notice::Translation { .. } | Notice::Clipboard { .. } => NoticeLevel::Info,
        }
    }

    pub fn text(&self) -> String {
        match self {
            Notice::Message { message, .. } => message.clone(),
            Notice::Translation {
                original,
                translated,
                ..
            } => format!("{} → {}", original, translated),
            Notice::Clipboard { text, .. } => text.clone(),
        }
    }
}

/// 通知发送端，可以随意克隆
#[derive(Clone, Default)]
pub struct NoticeSender {
    tx: Option<mpsc::UnboundedSender<Notice>>,
}

/// 建立通知通道
pub fn notice_channel() -> (NoticeSender, mpsc::UnboundedReceiver<Notice>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (NoticeSender { tx: Some(tx) }, rx)
}

impl NoticeSender {
    /// 不投递任何通知的发送端
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn success(&self, message: impl Into<String>) {
        self.message(NoticeLevel::Success, message.into());
    }

    pub fn info(&self, message: impl Into<String>) {
        self.message(NoticeLevel::Info, message.into());
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.message(NoticeLevel::Warning, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.message(NoticeLevel::Error, message.into());
    }

    pub fn translation(&self, original: &str, translated: &str, from: &str, to: &str) {
        tracing::info!("临时翻译 ({} -> {}): {}", from, to, translated);
        self.publish(Notice::Translation {
            original: original.to_string(),
            translated: translated.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            at: Local::now(),
        });
    }

    pub fn clipboard(&self, text: &str) {
        self.publish(Notice::Clipboard {
            text: text.to_string(),
            at: Local::now(),
        });
    }

    fn message(&self, level: NoticeLevel, message: String) {
        match level {
            NoticeLevel::Error => tracing::error!("通知: {}", message),
            NoticeLevel::Warning => tracing::warn!("通知: {}", message),
            _ => tracing::info!("通知: {}", message),
        }
        self.publish(Notice::Message {
            level,
            message,
            at: Local::now(),
        });
    }

    fn publish(&self, notice: Notice) {
        if let Some(tx) = &self.tx {
            // 展示端已关闭时静默丢弃
            let _ = tx.send(notice);
        }
    }
}
