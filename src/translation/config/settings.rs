//! 用户设置快照
//!
//! 设置由外部设置存储持有，页面上下文只保存一份快照，
//! 直到被显式刷新或收到推送才会改变。

use serde::{Deserialize, Serialize};

use super::constants;

/// 用户设置
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub enabled: bool,
    pub auto_incoming: bool,
    pub auto_outgoing: bool,
    pub source_language: String,
    pub target_language: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_incoming: true,
            auto_outgoing: true,
            source_language: constants::AUTO_LANGUAGE.to_string(),
            target_language: constants::DEFAULT_TARGET_LANG.to_string(),
        }
    }
}

impl Settings {
    /// 是否应该观察入站消息
    pub fn incoming_active(&self) -> bool {
        self.enabled && self.auto_incoming
    }

    /// 是否应该拦截出站消息
    pub fn outgoing_active(&self) -> bool {
        self.enabled && self.auto_outgoing
    }

    /// 当前语言对 (源语言, 目标语言)
    pub fn language_pair(&self) -> (String, String) {
        (self.source_language.clone(), self.target_language.clone())
    }

    /// 交换源语言与目标语言
    ///
    /// 源语言为 "auto" 时无法交换，返回 false。
    pub fn swap_languages(&mut self) -> bool {
        if self.source_language == constants::AUTO_LANGUAGE {
            return false;
        }
        std::mem::swap(&mut self.source_language, &mut self.target_language);
        true
    }

    /// 合并一次部分更新
    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(auto_incoming) = patch.auto_incoming {
            self.auto_incoming = auto_incoming;
        }
        if let Some(auto_outgoing) = patch.auto_outgoing {
            self.auto_outgoing = auto_outgoing;
        }
        if let Some(source) = &patch.source_language {
            self.source_language = source.clone();
        }
        if let Some(target) = &patch.target_language {
            self.target_language = target.clone();
        }
    }
}

/// 设置的部分更新，未出现的字段保持原值
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_incoming: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_outgoing: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_language: Option<String>,
}

impl From<&Settings> for SettingsPatch {
    fn from(settings: &Settings) -> Self {
        Self {
            enabled: Some(settings.enabled),
            auto_incoming: Some(settings.auto_incoming),
            auto_outgoing: Some(settings.auto_outgoing),
            source_language: Some(settings.source_language.clone()),
            target_language: Some(settings.target_language.clone()),
        }
    }
}
