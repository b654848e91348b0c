//! 外部翻译服务
//!
//! 语言对编码为 `"<source>|<target>"`，请求携带原始的聊天文本。
//! 响应视为不可信：缺少译文字段是 `ServiceError`，而不是崩溃。

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error};

use crate::translation::config::constants::{AUTO_LANGUAGE, FALLBACK_SOURCE_LANG};
use crate::translation::core::TranslationResult;
use crate::translation::error::{TranslatorError, TranslatorResult};

/// 翻译服务提供方
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> TranslatorResult<TranslationResult>;

    fn name(&self) -> &str;
}

/// MyMemory 翻译服务
pub struct MyMemoryProvider {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MyMemoryResponse {
    #[serde(default)]
    response_data: Option<MyMemoryData>,
    #[serde(default)]
    response_status: Option<Value>,
    #[serde(default)]
    response_details: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MyMemoryData {
    #[serde(default)]
    translated_text: Option<String>,
    #[serde(default, rename = "match")]
    match_score: Option<f64>,
}

impl MyMemoryProvider {
    pub fn new(endpoint: &str) -> TranslatorResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("chat-translator/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// 组装语言对
    pub fn lang_pair(source_language: &str, target_language: &str) -> String {
        let source = if source_language == AUTO_LANGUAGE {
            FALLBACK_SOURCE_LANG
        } else {
            source_language
        };
        format!("{}|{}", source, target_language)
    }
}

/// 校验并转换 MyMemory 响应
pub fn parse_mymemory_response(body: Value, source_language: &str) -> TranslatorResult<TranslationResult> {
    let response: MyMemoryResponse = serde_json::from_value(body)
        .map_err(|e| TranslatorError::ServiceError(format!("无法解析服务响应: {}", e)))?;

    let status = response.response_status.as_ref().and_then(|status| match status {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    });
    if let Some(code) = status {
        if code != 200 {
            let details = response
                .response_details
                .map(|d| d.to_string())
                .unwrap_or_default();
            return Err(TranslatorError::ServiceError(format!(
                "服务返回状态 {}: {}",
                code, details
            )));
        }
    }

    let data = response
        .response_data
        .ok_or_else(|| TranslatorError::ServiceError("服务响应缺少 responseData".to_string()))?;

    let translated_text = data
        .translated_text
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| TranslatorError::ServiceError("服务响应缺少译文".to_string()))?;

    let confidence = data
        .match_score
        .filter(|score| (0.0..=1.0).contains(score))
        .unwrap_or(1.0);

    Ok(TranslationResult {
        translated_text,
        detected_language: source_language.to_string(),
        confidence,
    })
}

#[async_trait]
impl TranslationProvider for MyMemoryProvider {
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> TranslatorResult<TranslationResult> {
        let lang_pair = Self::lang_pair(source_language, target_language);
        let url = format!("{}/get", self.endpoint);
        debug!("请求翻译服务: {} ({})", url, lang_pair);

        let response = self
            .client
            .get(&url)
            .query(&[("q", text), ("langpair", lang_pair.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!("翻译服务 HTTP 错误: {}", status);
            return Err(TranslatorError::ServiceError(format!("HTTP {}", status)));
        }

        let body: Value = response.json().await?;
        let source = lang_pair.split('|').next().unwrap_or(FALLBACK_SOURCE_LANG);
        parse_mymemory_response(body, source)
    }

    fn name(&self) -> &str {
        "mymemory"
    }
}
