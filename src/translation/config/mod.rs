//! 翻译配置管理模块
//!
//! 提供简化的配置管理，支持环境变量、配置文件和默认值

pub mod manager;
pub mod settings;

// 重新导出主要类型
pub use manager::{ConfigManager, TranslatorConfig};
pub use settings::{Settings, SettingsPatch};

/// 配置常量
pub mod constants {
    use std::time::Duration;

    // 语言相关
    pub const AUTO_LANGUAGE: &str = "auto";
    pub const DEFAULT_TARGET_LANG: &str = "es";
    pub const FALLBACK_SOURCE_LANG: &str = "en";

    // 服务相关
    pub const DEFAULT_SERVICE_ENDPOINT: &str = "https://api.mymemory.translated.net";
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    // 缓存与过滤
    pub const DEFAULT_CACHE_CAPACITY: usize = 100;
    pub const MIN_TEXT_CHARS: usize = 3;

    // 临时回溯：双击翻译时最多向上查找的祖先层数
    pub const MAX_ANCESTOR_WALK: usize = 10;

    // 临时翻译弹窗自动关闭
    pub const POPUP_LIFETIME: Duration = Duration::from_secs(10);

    // 页面标记
    pub const OVERLAY_CLASS: &str = "translation-overlay";
    pub const OVERLAY_TEXT_CLASS: &str = "translation-text";
    pub const TOGGLE_CLASS: &str = "toggle-btn";
    pub const DISMISS_CLASS: &str = "translation-dismiss";
    pub const DISMISSED_ATTR: &str = "data-translation-dismissed";
    pub const POPUP_CLASS: &str = "translation-popup";
    pub const STATUS_WIDGET_CLASS: &str = "translator-widget";
    pub const INPUT_HELPER_CLASS: &str = "translation-input-btn";

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "chat-translator.toml",
        ".chat-translator.toml",
        "~/.config/chat-translator/config.toml",
    ];
}

/// 加载配置，失败时退回默认值
pub fn load_config(path: Option<&str>) -> TranslatorConfig {
    let manager = match path {
        Some(path) => ConfigManager::from_file(path),
        None => ConfigManager::new(),
    };

    match manager {
        Ok(manager) => manager.into_config(),
        Err(e) => {
            tracing::warn!("配置加载失败，使用默认配置: {}", e);
            TranslatorConfig::default()
        }
    }
}
