//! 翻译模块
//!
//! 页面上下文中的翻译能力，按职责分层：
//! - **core**: 翻译请求/结果、客户端、统一翻译服务
//! - **pipeline**: 消息观察、文本规整、翻译层附加
//! - **storage**: 翻译结果缓存
//! - **config**: 配置与用户设置
//! - **error**: 错误处理
//!
//! # 基本用法
//!
//! ```rust,no_run
//! use chat_translator::runtime::RuntimeChannel;
//! use chat_translator::translation::{TranslationClient, TranslationService};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (channel, _port) = RuntimeChannel::connect(std::time::Duration::from_secs(30));
//! let service = TranslationService::new(TranslationClient::new(channel), 100);
//!
//! let result = service.translate("Hola amigo", "auto", "en").await?;
//! println!("{}", result.translated_text);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// 子模块声明
// ============================================================================

/// 配置管理模块
pub mod config;

/// 核心翻译模块
pub mod core;

/// 错误处理模块
pub mod error;

/// 消息翻译管道模块
pub mod pipeline;

/// 存储管理模块
pub mod storage;

// ============================================================================
// 主要类型重新导出
// ============================================================================

pub use config::{ConfigManager, Settings, SettingsPatch, TranslatorConfig};
pub use core::{
    detect_language, language_name, resolve_source_language, ServiceStats, TranslationClient,
    TranslationRequest, TranslationResult, TranslationService,
};
pub use error::{TranslatorError, TranslatorResult};
pub use pipeline::{ChangeObserver, MessageEvent, MessageProcessor, ObserverState, TextNormalizer};
pub use storage::{CacheStats, TranslationCache};
