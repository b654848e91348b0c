//! 简化的配置管理器
//!
//! 提供统一的配置接口，支持文件配置、环境变量和默认值

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{constants, Settings};
use crate::env::{EnvError, EnvVar};
use crate::translation::error::{TranslatorError, TranslatorResult};

/// 翻译器配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TranslatorConfig {
    // 服务配置
    pub service_endpoint: String,
    pub request_timeout_secs: u64,

    // 缓存与过滤
    pub cache_capacity: usize,
    pub min_text_chars: usize,

    // 出站拦截：回读确认后、重新发送前的可选让步
    pub resend_settle_ms: u64,

    // 安装时的默认设置
    pub defaults: Settings,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            service_endpoint: constants::DEFAULT_SERVICE_ENDPOINT.to_string(),
            request_timeout_secs: constants::DEFAULT_REQUEST_TIMEOUT.as_secs(),
            cache_capacity: constants::DEFAULT_CACHE_CAPACITY,
            min_text_chars: constants::MIN_TEXT_CHARS,
            resend_settle_ms: 0,
            defaults: Settings::default(),
        }
    }
}

impl TranslatorConfig {
    /// 验证配置
    pub fn validate(&self) -> TranslatorResult<()> {
        if !(self.service_endpoint.starts_with("http://")
            || self.service_endpoint.starts_with("https://"))
        {
            return Err(TranslatorError::ConfigError(format!(
                "服务地址必须是 http(s) URL: {}",
                self.service_endpoint
            )));
        }

        if self.request_timeout_secs == 0 {
            return Err(TranslatorError::ConfigError("请求超时不能为0".to_string()));
        }

        if self.cache_capacity == 0 {
            return Err(TranslatorError::ConfigError("缓存容量不能为0".to_string()));
        }

        if self.defaults.target_language.is_empty()
            || self.defaults.target_language == constants::AUTO_LANGUAGE
        {
            return Err(TranslatorError::ConfigError(
                "目标语言必须是具体的语言代码".to_string(),
            ));
        }

        if self.defaults.source_language.is_empty() {
            return Err(TranslatorError::ConfigError("源语言不能为空".to_string()));
        }

        Ok(())
    }

    /// 应用环境变量覆盖
    ///
    /// 已设置但无效的变量记录警告后忽略，返回被忽略的变量。
    pub fn apply_env_overrides(&mut self) -> Vec<EnvError> {
        use crate::env::translation;

        let mut ignored = Vec::new();

        if let Some(endpoint) = env_override::<String, translation::Endpoint>(&mut ignored) {
            tracing::info!("环境变量覆盖服务地址: {}", endpoint);
            self.service_endpoint = endpoint;
        }

        if let Some(target_lang) = env_override::<String, translation::TargetLang>(&mut ignored) {
            self.defaults.target_language = target_lang;
        }

        if let Some(source_lang) = env_override::<String, translation::SourceLang>(&mut ignored) {
            self.defaults.source_language = source_lang;
        }

        if let Some(timeout) = env_override::<Duration, translation::Timeout>(&mut ignored) {
            self.request_timeout_secs = timeout.as_secs();
        }

        if let Some(capacity) = env_override::<usize, translation::CacheCapacity>(&mut ignored) {
            self.cache_capacity = capacity;
        }

        ignored
    }

    /// 转换为Duration类型
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn resend_settle(&self) -> Duration {
        Duration::from_millis(self.resend_settle_ms)
    }
}

// 读取一个已设置的覆盖值，无效时记录警告
fn env_override<T, V: EnvVar<T>>(ignored: &mut Vec<EnvError>) -> Option<T> {
    if !V::is_set() {
        return None;
    }
    match V::get() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("忽略无效的环境变量: {}", e);
            ignored.push(e);
            None
        }
    }
}

/// 简化的配置管理器
pub struct ConfigManager {
    config: TranslatorConfig,
}

impl ConfigManager {
    /// 创建新的配置管理器
    pub fn new() -> TranslatorResult<Self> {
        let mut config = Self::load_config()?;
        config.apply_env_overrides();
        config.validate()?;

        Ok(Self { config })
    }

    /// 从指定文件创建配置管理器
    pub fn from_file(path: &str) -> TranslatorResult<Self> {
        Self::load_dotenv();
        let expanded = shellexpand::tilde(path);
        let mut config = Self::load_from_file(&expanded)?;
        config.apply_env_overrides();
        config.validate()?;

        Ok(Self { config })
    }

    pub fn into_config(self) -> TranslatorConfig {
        self.config
    }

    /// 从搜索路径加载配置
    fn load_config() -> TranslatorResult<TranslatorConfig> {
        // 首先尝试加载 .env 文件
        Self::load_dotenv();

        for path in constants::CONFIG_PATHS {
            let expanded_path = shellexpand::tilde(path);
            if Path::new(expanded_path.as_ref()).exists() {
                tracing::info!("加载配置文件: {}", expanded_path);
                return Self::load_from_file(&expanded_path);
            }
        }

        tracing::info!("未找到配置文件，使用默认配置");
        Ok(TranslatorConfig::default())
    }

    /// 从指定文件加载配置
    fn load_from_file(path: &str) -> TranslatorResult<TranslatorConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TranslatorError::ConfigError(format!("读取配置文件失败: {}", e)))?;

        Self::parse_config(path, &content)
    }

    /// 按扩展名解析配置内容
    pub fn parse_config(path: &str, content: &str) -> TranslatorResult<TranslatorConfig> {
        if path.ends_with(".json") {
            serde_json::from_str(content)
                .map_err(|e| TranslatorError::ConfigError(format!("解析JSON配置失败: {}", e)))
        } else {
            toml::from_str(content)
                .map_err(|e| TranslatorError::ConfigError(format!("解析TOML配置失败: {}", e)))
        }
    }

    /// 加载 .env 文件
    fn load_dotenv() {
        let env_files = [".env.local", ".env"];

        for env_file in &env_files {
            if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
                tracing::info!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }

    /// 生成示例配置文件
    pub fn generate_example_config(path: &str) -> TranslatorResult<()> {
        let config = TranslatorConfig::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| TranslatorError::ConfigError(format!("序列化配置失败: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| TranslatorError::ConfigError(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }
}
