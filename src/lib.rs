//! # Chat Translator Library
//!
//! 为网页聊天应用提供实时翻译：识别新消息并附加译文层，
//! 在发送前把输入框内容替换为译文。
//!
//! ## 模块组织
//!
//! - `parsers` - HTML 解析、结构定位器与序列化
//! - `page` - 活动页面：DOM、变更通知与事件分发
//! - `platform` - 聊天平台识别与结构描述
//! - `runtime` - 跨上下文消息通道、后台工作者与翻译服务提供方
//! - `translation` - 翻译服务、缓存、配置与消息翻译管道
//! - `content` - 翻译层、出站拦截、会话状态机与通知
//! - `env` - 环境变量

pub mod content;
pub mod env;
pub mod page;
pub mod parsers;
pub mod platform;
pub mod runtime;
pub mod translation;

// Re-export commonly used items for convenience
pub use content::{notice_channel, Notice, NoticeSender, Session, SessionState};
pub use page::LivePage;
pub use platform::{Platform, PlatformProfile};
pub use translation::{Settings, TranslatorConfig, TranslatorError, TranslatorResult};
