//! 平台适配器
//!
//! 根据页面地址识别聊天平台，并给出消息列表、消息项、消息文本、
//! 输入框与发送按钮的结构定位器。纯查表，没有状态。

use std::fmt;

use url::Url;

use crate::parsers::html::Locator;
use crate::translation::error::TranslatorResult;

/// 支持的聊天平台
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    WhatsApp,
    Telegram,
    Discord,
    Slack,
    Teams,
    Messenger,
    Facebook,
    Generic,
}

impl Platform {
    pub const ALL: [Platform; 8] = [
        Platform::WhatsApp,
        Platform::Telegram,
        Platform::Discord,
        Platform::Slack,
        Platform::Teams,
        Platform::Messenger,
        Platform::Facebook,
        Platform::Generic,
    ];

    /// 从页面地址识别平台
    pub fn detect(url: &Url) -> Self {
        let Some(host) = url.host_str() else {
            return Platform::Generic;
        };
        Self::from_host(host)
    }

    /// 从主机名识别平台，无法识别时返回通用配置
    pub fn from_host(host: &str) -> Self {
        let host = host.to_ascii_lowercase();
        let matches = |domain: &str| host == domain || host.ends_with(&format!(".{}", domain));

        if matches("web.whatsapp.com") {
            Platform::WhatsApp
        } else if matches("web.telegram.org") {
            Platform::Telegram
        } else if matches("discord.com") {
            Platform::Discord
        } else if matches("slack.com") {
            Platform::Slack
        } else if matches("teams.microsoft.com") {
            Platform::Teams
        } else if matches("messenger.com") {
            Platform::Messenger
        } else if matches("facebook.com") {
            Platform::Facebook
        } else {
            Platform::Generic
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Platform::WhatsApp => "whatsapp",
            Platform::Telegram => "telegram",
            Platform::Discord => "discord",
            Platform::Slack => "slack",
            Platform::Teams => "teams",
            Platform::Messenger => "messenger",
            Platform::Facebook => "facebook",
            Platform::Generic => "generic",
        }
    }

    fn descriptors(&self) -> Descriptors {
        match self {
            Platform::WhatsApp => Descriptors {
                message_list: r#"[data-testid="conversation-panel-messages"]"#,
                message_item: r#"[data-testid="conversation-panel-messages"] .message-in, [data-testid="conversation-panel-messages"] .message-out, [data-testid="conversation-panel-messages"] [data-testid="msg-container"]"#,
                message_text: r#".copyable-text span, [data-testid="msg-text"]"#,
                compose_input: r#"[contenteditable="true"][data-tab="10"], [contenteditable="true"][data-tab="9"]"#,
                send_control: r#"[data-testid="send"], [data-icon="send"]"#,
            },
            Platform::Telegram => Descriptors {
                message_list: r#".messages-container, [class*="messages-"]"#,
                message_item: r#".message, .bubble, [class*="message-"]"#,
                message_text: r#".message-content, .bubble-content, [class*="message-content"]"#,
                compose_input: r#".input-message-input, [contenteditable="true"]"#,
                send_control: r#".btn-send, [data-testid="send"]"#,
            },
            Platform::Discord => Descriptors {
                message_list: r#"[id^="chat-messages-"], [class*="messages-"]"#,
                message_item: r#"[id^="chat-messages-"] [class*="message-"], [class*="message-"]"#,
                message_text: r#"[class*="messageContent-"], [class*="messageContent"]"#,
                compose_input: r#"[data-slate-editor="true"], [contenteditable="true"]"#,
                send_control: r#"[data-testid="send-button"], [class*="sendButton"]"#,
            },
            Platform::Slack => Descriptors {
                message_list: r#"[data-qa="messages_container"], [class*="messages-"]"#,
                message_item: r#"[data-qa="message"], [class*="message-"]"#,
                message_text: r#"[data-qa="message-text"], [class*="message-text"]"#,
                compose_input: r#"[data-qa="message_input"], [contenteditable="true"]"#,
                send_control: r#"[data-qa="send_message_button"], [class*="send-button"]"#,
            },
            Platform::Teams => Descriptors {
                message_list: r#"[data-tid="message-pane"], [class*="messages-"]"#,
                message_item: r#"[data-tid="message-pane"] .ui-chat__message, [class*="message-"]"#,
                message_text: r#".ui-chat__messagecontent, [class*="message-content"]"#,
                compose_input: r#"[data-tid="ckeditor"], [contenteditable="true"]"#,
                send_control: r#"[data-tid="send-button"], [class*="send-button"]"#,
            },
            Platform::Messenger | Platform::Facebook => Descriptors {
                message_list: r#"[data-testid="messages_container"], [class*="messages-"]"#,
                message_item: r#"[data-testid="message"], [class*="message-"]"#,
                message_text: r#"[data-testid="message_text"], [class*="message-text"]"#,
                compose_input: r#"[contenteditable="true"], [data-testid="message_input"]"#,
                send_control: r#"[data-testid="send_button"], [class*="send-button"]"#,
            },
            Platform::Generic => Descriptors {
                message_list: r#"[class*="messages"], [class*="chat"]"#,
                message_item: r#"[class*="message"], [data-testid*="message"]"#,
                message_text: r#"[class*="text"], [class*="content"]"#,
                compose_input: r#"[contenteditable="true"], input[type="text"]"#,
                send_control: r#"[class*="send"], [data-testid*="send"]"#,
            },
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

struct Descriptors {
    message_list: &'static str,
    message_item: &'static str,
    message_text: &'static str,
    compose_input: &'static str,
    send_control: &'static str,
}

/// 平台结构描述，每次页面加载解析一次，之后不再改变
#[derive(Debug, Clone)]
pub struct PlatformProfile {
    pub platform: Platform,
    pub message_list: Locator,
    pub message_item: Locator,
    pub message_text: Locator,
    pub compose_input: Locator,
    pub send_control: Locator,
}

impl PlatformProfile {
    /// 解析指定平台的描述
    pub fn for_platform(platform: Platform) -> TranslatorResult<Self> {
        let d = platform.descriptors();
        Ok(Self {
            platform,
            message_list: Locator::parse(d.message_list)?,
            message_item: Locator::parse(d.message_item)?,
            message_text: Locator::parse(d.message_text)?,
            compose_input: Locator::parse(d.compose_input)?,
            send_control: Locator::parse(d.send_control)?,
        })
    }

    /// 从页面地址解析
    pub fn resolve(url: &Url) -> TranslatorResult<Self> {
        let platform = Platform::detect(url);
        tracing::info!("检测到平台: {}", platform);
        Self::for_platform(platform)
    }
}
