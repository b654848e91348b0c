//! 翻译客户端
//!
//! 经跨上下文通道请求后台翻译，不做重试；重试策略属于调用方。

use tracing::debug;

use super::language::resolve_source_language;
use super::{TranslationRequest, TranslationResult};
use crate::runtime::channel::RuntimeChannel;
use crate::runtime::messages::{parse_translate_reply, RuntimeRequest};
use crate::translation::config::Settings;
use crate::translation::error::{TranslatorError, TranslatorResult};

/// 翻译客户端
#[derive(Clone)]
pub struct TranslationClient {
    channel: RuntimeChannel,
}

impl TranslationClient {
    pub fn new(channel: RuntimeChannel) -> Self {
        Self { channel }
    }

    /// 翻译一段文本
    ///
    /// 源语言为 "auto" 时先解析为具体代码再发给后台，成功时以它作为检测语言。
    pub async fn translate(&self, request: &TranslationRequest) -> TranslatorResult<TranslationResult> {
        let source = resolve_source_language(&request.text, &request.source_language);
        debug!(
            "请求翻译 ({} -> {}): {}",
            source,
            request.target_language,
            preview(&request.text)
        );

        let message = RuntimeRequest::Translate {
            text: request.text.clone(),
            source_language: source.clone(),
            target_language: request.target_language.clone(),
        };

        let reply = self.channel.request(&message).await?;
        parse_translate_reply(reply, &source)
    }

    /// 读取设置快照
    pub async fn get_settings(&self) -> TranslatorResult<Settings> {
        let reply = self.channel.request(&RuntimeRequest::GetSettings).await?;
        serde_json::from_value(reply)
            .map_err(|e| TranslatorError::ChannelError(format!("无效的设置快照: {}", e)))
    }
}

/// 日志用的文本预览
pub(crate) fn preview(text: &str) -> String {
    let mut preview: String = text.chars().take(50).collect();
    if text.chars().count() > 50 {
        preview.push_str("...");
    }
    preview
}
