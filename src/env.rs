//! 统一的环境变量管理系统
//!
//! 提供类型安全、可验证的环境变量访问，配置管理器用它覆盖文件配置

use std::env;
use std::fmt;
use std::time::Duration;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DEFAULT: Option<T>;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    fn get() -> EnvResult<T> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value),
            Err(_) => {
                if let Some(default) = Self::DEFAULT {
                    Ok(default)
                } else {
                    Err(EnvError {
                        variable: Self::NAME.to_string(),
                        message: "Required environment variable not set".to_string(),
                    })
                }
            }
        }
    }

    fn is_set() -> bool {
        env::var(Self::NAME).is_ok()
    }
}

/// 核心环境变量定义
pub mod core {
    use super::*;

    /// 日志级别
    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "CHAT_TRANSLATOR_LOG_LEVEL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("info".to_string()),
            }
        }

        fn parse(value: &str) -> EnvResult<String> {
            match value.to_lowercase().as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => Ok(value.to_lowercase()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!(
                        "Invalid log level '{}'. Use: trace, debug, info, warn, error",
                        value
                    ),
                }),
            }
        }
    }

    /// 禁用颜色输出
    pub struct NoColor;
    impl EnvVar<bool> for NoColor {
        const NAME: &'static str = "NO_COLOR";
        const DEFAULT: Option<bool> = Some(false);
        const DESCRIPTION: &'static str = "Disable colored output when set to any value";

        fn parse(value: &str) -> EnvResult<bool> {
            // NO_COLOR 遵循标准：任何值都表示禁用颜色
            Ok(!value.is_empty())
        }
    }
}

/// 翻译相关环境变量
pub mod translation {
    use super::*;

    /// 翻译服务地址
    pub struct Endpoint;
    impl EnvVar<String> for Endpoint {
        const NAME: &'static str = "CHAT_TRANSLATOR_ENDPOINT";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Translation service endpoint URL";

        fn parse(value: &str) -> EnvResult<String> {
            let url = value.trim();
            if url.starts_with("http://") || url.starts_with("https://") {
                Ok(url.trim_end_matches('/').to_string())
            } else {
                Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Endpoint must start with http:// or https://".to_string(),
                })
            }
        }
    }

    /// 目标语言
    pub struct TargetLang;
    impl EnvVar<String> for TargetLang {
        const NAME: &'static str = "CHAT_TRANSLATOR_TARGET_LANG";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Target language for translation (ISO 639-1 code)";

        fn parse(value: &str) -> EnvResult<String> {
            let lang = value.trim().to_lowercase();
            if lang.len() != 2 || !lang.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Language code must be 2 letters (ISO 639-1)".to_string(),
                });
            }
            Ok(lang)
        }
    }

    /// 源语言
    pub struct SourceLang;
    impl EnvVar<String> for SourceLang {
        const NAME: &'static str = "CHAT_TRANSLATOR_SOURCE_LANG";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Source language for translation ('auto' for detection)";

        fn parse(value: &str) -> EnvResult<String> {
            let lang = value.trim().to_lowercase();
            if lang == "auto" || (lang.len() == 2 && lang.chars().all(|c| c.is_ascii_alphabetic())) {
                Ok(lang)
            } else {
                Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Language code must be 'auto' or 2 letters (ISO 639-1)".to_string(),
                })
            }
        }
    }

    /// 跨上下文请求超时
    pub struct Timeout;
    impl EnvVar<Duration> for Timeout {
        const NAME: &'static str = "CHAT_TRANSLATOR_TIMEOUT";
        const DEFAULT: Option<Duration> = Some(Duration::from_secs(30));
        const DESCRIPTION: &'static str = "Cross-context request timeout in seconds";

        fn parse(value: &str) -> EnvResult<Duration> {
            let seconds: u64 = value.trim().parse().map_err(|_| EnvError {
                variable: Self::NAME.to_string(),
                message: "Must be a valid number of seconds".to_string(),
            })?;

            if seconds == 0 {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Timeout must be greater than 0".to_string(),
                });
            }

            if seconds > 300 {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Timeout too long (max 300 seconds)".to_string(),
                });
            }

            Ok(Duration::from_secs(seconds))
        }
    }

    /// 缓存容量
    pub struct CacheCapacity;
    impl EnvVar<usize> for CacheCapacity {
        const NAME: &'static str = "CHAT_TRANSLATOR_CACHE_CAPACITY";
        const DEFAULT: Option<usize> = Some(100);
        const DESCRIPTION: &'static str = "Translation cache capacity (number of entries)";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 1, 100_000)
        }
    }
}

/// 辅助函数
fn parse_positive_usize(value: &str, var_name: &str, min: usize, max: usize) -> EnvResult<usize> {
    let num: usize = value.trim().parse().map_err(|_| EnvError {
        variable: var_name.to_string(),
        message: "Must be a valid positive number".to_string(),
    })?;

    if num < min {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} is below minimum {}", num, min),
        });
    }

    if num > max {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} exceeds maximum {}", num, max),
        });
    }

    Ok(num)
}

/// 环境变量文档生成器
pub fn generate_env_docs() -> String {
    let mut docs = String::new();
    docs.push_str("# Environment Variables\n\n");

    let entries: [(&str, &str); 7] = [
        (core::LogLevel::NAME, core::LogLevel::DESCRIPTION),
        (core::NoColor::NAME, core::NoColor::DESCRIPTION),
        (translation::Endpoint::NAME, translation::Endpoint::DESCRIPTION),
        (translation::TargetLang::NAME, translation::TargetLang::DESCRIPTION),
        (translation::SourceLang::NAME, translation::SourceLang::DESCRIPTION),
        (translation::Timeout::NAME, translation::Timeout::DESCRIPTION),
        (translation::CacheCapacity::NAME, translation::CacheCapacity::DESCRIPTION),
    ];

    for (name, description) in entries {
        docs.push_str(&format!("- `{}`: {}\n", name, description));
    }

    docs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(core::LogLevel::parse("DEBUG").unwrap(), "debug");
        assert!(core::LogLevel::parse("verbose").is_err());
    }

    #[test]
    fn test_language_validation() {
        assert_eq!(translation::TargetLang::parse(" ES ").unwrap(), "es");
        assert!(translation::TargetLang::parse("auto").is_err());
        assert!(translation::TargetLang::parse("e1").is_err());

        assert_eq!(translation::SourceLang::parse("auto").unwrap(), "auto");
        assert_eq!(translation::SourceLang::parse("EN").unwrap(), "en");
        assert!(translation::SourceLang::parse("english").is_err());
    }

    #[test]
    fn test_endpoint_validation() {
        assert_eq!(
            translation::Endpoint::parse("https://api.mymemory.translated.net/").unwrap(),
            "https://api.mymemory.translated.net"
        );
        assert!(translation::Endpoint::parse("ftp://example.com").is_err());
        assert!(translation::Endpoint::parse("not-a-url").is_err());
    }

    #[test]
    fn test_numeric_validation() {
        assert_eq!(
            translation::Timeout::parse("10").unwrap(),
            Duration::from_secs(10)
        );
        assert!(translation::Timeout::parse("0").is_err());
        assert!(translation::Timeout::parse("301").is_err());

        assert_eq!(translation::CacheCapacity::parse("100").unwrap(), 100);
        assert!(translation::CacheCapacity::parse("0").is_err());
        assert!(translation::CacheCapacity::parse("lots").is_err());
    }

    #[test]
    fn test_env_docs_lists_every_variable() {
        let docs = generate_env_docs();
        assert!(docs.contains("CHAT_TRANSLATOR_ENDPOINT"));
        assert!(docs.contains("CHAT_TRANSLATOR_CACHE_CAPACITY"));
        assert!(docs.contains("NO_COLOR"));
    }
}
