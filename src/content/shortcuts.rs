//! 页面快捷操作
//!
//! - 双击消息：临时翻译，结果以通知和弹窗展示，不改动消息本身
//! - Ctrl+Shift+T：开关翻译
//! - Ctrl+Shift+L：交换语言对

use std::rc::{Rc, Weak};

use markup5ever_rcdom::Handle;
use tracing::debug;

use super::session::Session;
use super::widgets;
use crate::page::{DomEvent, EventKind, ListenerId, Phase};
use crate::parsers::html::dom::ancestors_and_self;
use crate::platform::PlatformProfile;
use crate::translation::config::constants::MAX_ANCESTOR_WALK;
use crate::translation::core::language_name;
use crate::translation::error::helpers::log_error;
use crate::translation::pipeline::is_own_node;

/// 在文档上登记快捷操作监听器
pub fn install(session: &Rc<Session>) -> Vec<ListenerId> {
    let document = session.page.document();

    let weak = Rc::downgrade(session);
    let dblclick = session.page.add_listener(
        &document,
        EventKind::DblClick,
        Phase::Bubble,
        move |event: &mut DomEvent| {
            if let Some(session) = weak.upgrade() {
                translate_adhoc(&session, &event.target);
            }
        },
    );

    let weak: Weak<Session> = Rc::downgrade(session);
    let keydown = session.page.add_listener(
        &document,
        EventKind::KeyDown,
        Phase::Bubble,
        move |event: &mut DomEvent| {
            let Some(session) = weak.upgrade() else {
                return;
            };
            let Some(key) = &event.key else {
                return;
            };
            if !(key.ctrl && key.shift) {
                return;
            }
            match key.key.to_ascii_lowercase().as_str() {
                "t" => {
                    event.prevent_default();
                    session.toggle_with_notice();
                }
                "l" => {
                    event.prevent_default();
                    if session.swap_languages() {
                        let (source, target) = session.settings().language_pair();
                        session.notices.info(format!(
                            "Languages swapped: {} → {}",
                            language_name(&source),
                            language_name(&target)
                        ));
                    } else {
                        session
                            .notices
                            .warning("Cannot swap languages while source is auto-detect");
                    }
                }
                _ => {}
            }
        },
    );

    vec![dblclick, keydown]
}

/// 从节点向上查找消息元素，最多走 `MAX_ANCESTOR_WALK` 层祖先
pub fn message_element_for(profile: &PlatformProfile, node: &Handle) -> Option<Handle> {
    ancestors_and_self(node)
        .into_iter()
        .take(MAX_ANCESTOR_WALK + 1)
        .find(|candidate| profile.message_item.matches(candidate))
}

// 双击临时翻译
fn translate_adhoc(session: &Rc<Session>, target: &Handle) {
    if !session.settings().enabled || is_own_node(target) {
        return;
    }
    let Some(message) = message_element_for(&session.profile, target) else {
        debug!("双击位置不在消息内");
        return;
    };

    let element = if session.profile.message_text.matches(&message) {
        message.clone()
    } else {
        session
            .profile
            .message_text
            .query_first(&message)
            .unwrap_or_else(|| target.clone())
    };
    let Some(text) = session.normalizer.candidate(&element) else {
        return;
    };

    let (source, target_language) = session.settings().language_pair();
    let weak = Rc::downgrade(session);
    let service = session.service.clone();
    let notices = session.notices.clone();
    tokio::task::spawn_local(async move {
        match service.translate(&text, &source, &target_language).await {
            Ok(result) => {
                notices.translation(
                    &text,
                    &result.translated_text,
                    &result.detected_language,
                    &target_language,
                );
                if let Some(session) = weak.upgrade() {
                    widgets::show_popup(
                        &session,
                        &text,
                        &result.translated_text,
                        &result.detected_language,
                        &target_language,
                    );
                }
            }
            Err(e) => {
                log_error(&e);
                notices.error(format!("Translation failed: {}", e));
            }
        }
    });
}
