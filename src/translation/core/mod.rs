//! 翻译系统核心模块
//!
//! - **客户端层** (`client.rs`): 经跨上下文通道调用后台翻译，规范化响应
//! - **服务层** (`service.rs`): 缓存优先、同一请求只发一次的统一入口
//! - **语言层** (`language.rs`): "auto" 的解析与语言名称
//!
//! ```text
//! TranslationService (service.rs)
//!     ├── TranslationCache (storage/cache.rs)
//!     └── TranslationClient (client.rs)
//!             └── RuntimeChannel (runtime/channel.rs)
//! ```

pub mod client;
pub mod language;
pub mod service;

use serde::{Deserialize, Serialize};

use crate::translation::error::{TranslatorError, TranslatorResult};

pub use client::TranslationClient;
pub use language::{detect_language, language_name, resolve_source_language};
pub use service::{ServiceStats, TranslationService};

/// 翻译请求，同时也是缓存键
///
/// 相等性是结构化的精确匹配，除去首尾空白外不做任何规范化。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TranslationRequest {
    pub text: String,
    pub source_language: String,
    pub target_language: String,
}

impl TranslationRequest {
    /// 创建请求，文本会被裁剪，裁剪后为空则拒绝
    pub fn new(text: &str, source_language: &str, target_language: &str) -> TranslatorResult<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TranslatorError::InvalidInput("待翻译文本为空".to_string()));
        }

        Ok(Self {
            text: text.to_string(),
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
        })
    }
}

/// 翻译结果，创建后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationResult {
    pub translated_text: String,
    pub detected_language: String,
    pub confidence: f64,
}
