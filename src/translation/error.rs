//! 翻译模块统一错误处理
//!
//! 提供结构化错误类型和错误处理机制。所有错误都可以克隆，
//! 这样同一个在途请求的全部等待者都能拿到同一个失败结果。

use std::fmt;

use thiserror::Error;

/// 翻译错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranslatorError {
    /// 平台消息列表尚未渲染或布局不受支持
    #[error("未找到消息容器: {0}")]
    ContainerNotFound(String),

    /// 网络失败、响应无法解析或响应中没有可用译文
    #[error("翻译服务错误: {0}")]
    ServiceError(String),

    /// 跨上下文消息通道关闭、超时或出错
    #[error("消息通道错误: {0}")]
    ChannelError(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// 输入验证错误
    #[error("输入无效: {0}")]
    InvalidInput(String),

    /// 结构定位器语法错误
    #[error("定位器错误: {0}")]
    LocatorError(String),

    /// 发送拦截失败（替换后的文本未生效等）
    #[error("发送拦截失败: {0}")]
    InterceptError(String),
}

impl TranslatorError {
    /// 检查错误是否可重试
    ///
    /// 客户端本身从不重试，这里只给调用方提供判断依据。
    pub fn is_retryable(&self) -> bool {
        match self {
            TranslatorError::ContainerNotFound(_) => true,
            TranslatorError::ServiceError(_) => true,
            TranslatorError::ChannelError(_) => true,
            TranslatorError::ConfigError(_) => false,
            TranslatorError::InvalidInput(_) => false,
            TranslatorError::LocatorError(_) => false,
            TranslatorError::InterceptError(_) => false,
        }
    }

    /// 获取错误的严重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TranslatorError::ContainerNotFound(_) => ErrorSeverity::Info,
            TranslatorError::ServiceError(_) => ErrorSeverity::Error,
            TranslatorError::ChannelError(_) => ErrorSeverity::Error,
            TranslatorError::ConfigError(_) => ErrorSeverity::Critical,
            TranslatorError::InvalidInput(_) => ErrorSeverity::Info,
            TranslatorError::LocatorError(_) => ErrorSeverity::Critical,
            TranslatorError::InterceptError(_) => ErrorSeverity::Warning,
        }
    }

    /// 获取错误类别
    pub fn category(&self) -> ErrorCategory {
        match self {
            TranslatorError::ContainerNotFound(_) => ErrorCategory::Layout,
            // 对等待译文的调用方来说，通道错误与服务错误同等对待
            TranslatorError::ServiceError(_) => ErrorCategory::Service,
            TranslatorError::ChannelError(_) => ErrorCategory::Service,
            TranslatorError::ConfigError(_) => ErrorCategory::Configuration,
            TranslatorError::InvalidInput(_) => ErrorCategory::Input,
            TranslatorError::LocatorError(_) => ErrorCategory::Configuration,
            TranslatorError::InterceptError(_) => ErrorCategory::Interception,
        }
    }

    /// 创建带上下文的错误
    pub fn with_context<T: fmt::Display>(self, context: T) -> Self {
        let wrap = |msg: String| format!("{} (上下文: {})", msg, context);

        match self {
            TranslatorError::ContainerNotFound(msg) => TranslatorError::ContainerNotFound(wrap(msg)),
            TranslatorError::ServiceError(msg) => TranslatorError::ServiceError(wrap(msg)),
            TranslatorError::ChannelError(msg) => TranslatorError::ChannelError(wrap(msg)),
            TranslatorError::ConfigError(msg) => TranslatorError::ConfigError(wrap(msg)),
            TranslatorError::InvalidInput(msg) => TranslatorError::InvalidInput(wrap(msg)),
            TranslatorError::LocatorError(msg) => TranslatorError::LocatorError(wrap(msg)),
            TranslatorError::InterceptError(msg) => TranslatorError::InterceptError(wrap(msg)),
        }
    }
}

/// 错误严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Layout,
    Service,
    Configuration,
    Input,
    Interception,
}

impl From<std::io::Error> for TranslatorError {
    fn from(error: std::io::Error) -> Self {
        TranslatorError::ConfigError(format!("IO错误: {}", error))
    }
}

impl From<serde_json::Error> for TranslatorError {
    fn from(error: serde_json::Error) -> Self {
        TranslatorError::ServiceError(format!("JSON解析错误: {}", error))
    }
}

impl From<toml::de::Error> for TranslatorError {
    fn from(error: toml::de::Error) -> Self {
        TranslatorError::ConfigError(format!("TOML解析错误: {}", error))
    }
}

impl From<reqwest::Error> for TranslatorError {
    fn from(error: reqwest::Error) -> Self {
        TranslatorError::ServiceError(format!("网络请求失败: {}", error))
    }
}

impl From<tokio::time::error::Elapsed> for TranslatorError {
    fn from(error: tokio::time::error::Elapsed) -> Self {
        TranslatorError::ChannelError(format!("等待响应超时: {}", error))
    }
}

/// 错误结果类型别名
pub type TranslatorResult<T> = Result<T, TranslatorError>;

/// 错误处理助手函数
pub mod helpers {
    use super::*;

    /// 按严重程度记录错误，不改变错误本身
    pub fn log_error(error: &TranslatorError) {
        match error.severity() {
            ErrorSeverity::Info => tracing::info!("翻译信息: {}", error),
            ErrorSeverity::Warning => tracing::warn!("翻译警告: {}", error),
            ErrorSeverity::Error => tracing::error!("翻译错误: {}", error),
            ErrorSeverity::Critical => tracing::error!("翻译严重错误: {}", error),
        }
    }
}
