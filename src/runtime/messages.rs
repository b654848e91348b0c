//! 跨上下文消息
//!
//! 三个上下文之间只交换 JSON。请求与推送用 `action` 字段区分；
//! 翻译响应来自不受信任的一端，由每种已知形状各自的适配器
//! 转换成同一个 `TranslationResult`，并在边界处完成校验。

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::translation::config::SettingsPatch;
use crate::translation::core::TranslationResult;
use crate::translation::error::{TranslatorError, TranslatorResult};

/// 页面（或弹出页）发往后台的请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum RuntimeRequest {
    #[serde(rename_all = "camelCase")]
    Translate {
        text: String,
        source_language: String,
        target_language: String,
    },
    GetSettings,
}

/// 推送到页面上下文的消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum PagePush {
    UpdateSettings { settings: SettingsPatch },
    ToggleTranslation { enabled: bool },
}

/// 推送确认
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
}

impl Ack {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// 带请求编号的信封
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub id: u64,
    pub message: Value,
}

/// 翻译失败的响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReply {
    pub error: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplyPayload {
    translated_text: String,
    #[serde(default)]
    detected_language: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

// 变体顺序即匹配顺序：带 error 的响应一律视为失败
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TranslateReply {
    Failed { error: String },
    Wrapped { translation: ReplyPayload },
    Flat(ReplyPayload),
}

/// 把后台的翻译响应转换为翻译结果
///
/// `resolved_source` 是请求时使用的具体源语言，响应未给出检测语言时用它。
pub fn parse_translate_reply(reply: Value, resolved_source: &str) -> TranslatorResult<TranslationResult> {
    let shape: TranslateReply = serde_json::from_value(reply)
        .map_err(|e| TranslatorError::ServiceError(format!("无法识别的响应格式: {}", e)))?;

    let payload = match shape {
        TranslateReply::Failed { error } => return Err(TranslatorError::ServiceError(error)),
        TranslateReply::Wrapped { translation } => translation,
        TranslateReply::Flat(payload) => payload,
    };

    if payload.translated_text.trim().is_empty() {
        return Err(TranslatorError::ServiceError("响应中没有可用译文".to_string()));
    }

    let confidence = payload.confidence.unwrap_or(1.0);
    if !(0.0..=1.0).contains(&confidence) {
        return Err(TranslatorError::ServiceError(format!(
            "置信度超出范围: {}",
            confidence
        )));
    }

    let detected_language = payload
        .detected_language
        .filter(|lang| !lang.is_empty() && lang != "auto")
        .unwrap_or_else(|| resolved_source.to_string());

    Ok(TranslationResult {
        translated_text: payload.translated_text,
        detected_language,
        confidence,
    })
}
