//! 页面小部件
//!
//! - 状态挂件：显示翻译是否开启以及当前语言对，点击即开关翻译
//! - 临时翻译弹窗：展示双击翻译的结果，可以插入输入框或复制，
//!   一段时间后自动关闭
//!
//! 两者都挂在 body 上，点击由文档上的一个委托监听器处理。

use std::rc::Rc;

use markup5ever_rcdom::Handle;
use tracing::debug;

use super::session::Session;
use crate::page::{DomEvent, EventKind, ListenerId, LivePage, Phase};
use crate::parsers::html::dom::{ancestors_and_self, get_node_attr, has_class};
use crate::translation::config::constants::{POPUP_CLASS, POPUP_LIFETIME, STATUS_WIDGET_CLASS};
use crate::translation::config::Settings;
use crate::translation::core::language_name;
use crate::translation::error::helpers::log_error;

const STATUS_TEXT_CLASS: &str = "widget-status";
const STATUS_LANGS_CLASS: &str = "widget-langs";
const POPUP_TEXT_ATTR: &str = "data-text";
const CLOSE_CLASS: &str = "popup-close";
const COPY_CLASS: &str = "copy-btn";
const INSERT_CLASS: &str = "insert-btn";

/// 插入状态挂件并登记委托监听器
pub fn install(session: &Rc<Session>) -> Vec<ListenerId> {
    create_status(&session.page);
    sync_status(session, &session.settings());

    let weak = Rc::downgrade(session);
    let click = session.page.add_listener(
        &session.page.document(),
        EventKind::Click,
        Phase::Capture,
        move |event: &mut DomEvent| {
            if let Some(session) = weak.upgrade() {
                on_click(&session, event);
            }
        },
    );
    vec![click]
}

/// 让状态挂件与设置一致；挂件不存在时不做任何事
pub fn sync_status(session: &Session, settings: &Settings) {
    let Some(widget) = find_on_body(&session.page, STATUS_WIDGET_CLASS) else {
        return;
    };
    let Some(status) = child_with_class(&widget, STATUS_TEXT_CLASS) else {
        return;
    };
    let Some(langs) = child_with_class(&widget, STATUS_LANGS_CLASS) else {
        return;
    };

    let (class, status_text, langs_text) = if settings.enabled {
        (
            format!("{} active", STATUS_WIDGET_CLASS),
            "Active",
            format!(
                "{} → {}",
                language_name(&settings.source_language),
                language_name(&settings.target_language)
            ),
        )
    } else {
        (STATUS_WIDGET_CLASS.to_string(), "Inactive", String::new())
    };

    session.page.set_attr(&widget, "class", Some(class.as_str()));
    session.page.set_text(&status, status_text);
    session.page.set_text(&langs, &langs_text);
}

/// 移除状态挂件与弹窗
pub fn remove_all(session: &Session) {
    for class in [STATUS_WIDGET_CLASS, POPUP_CLASS] {
        if let Some(node) = find_on_body(&session.page, class) {
            session.page.remove(&node);
        }
    }
}

/// 展示临时翻译弹窗，替换已有的弹窗；需要在 `LocalSet` 中调用
pub fn show_popup(session: &Session, original: &str, translated: &str, from: &str, to: &str) -> Option<Handle> {
    let page = &session.page;
    let body = page.body()?;
    if let Some(existing) = find_on_body(page, POPUP_CLASS) {
        page.remove(&existing);
    }

    let popup = page.create_element("div", &[("class", POPUP_CLASS), (POPUP_TEXT_ATTR, translated)]);

    let header = page.create_element("div", &[("class", "popup-header")]);
    let title = page.create_element("span", &[("class", "popup-title")]);
    let close = page.create_element("button", &[("class", CLOSE_CLASS), ("type", "button")]);
    page.set_text(&title, "Translation");
    page.set_text(&close, "×");
    page.append_child(&header, title);
    page.append_child(&header, close);
    page.append_child(&popup, header);

    for (code, text, class) in [(from, original, "original"), (to, translated, "translated")] {
        let row = page.create_element("div", &[("class", "translation-row")]);
        let label = page.create_element("div", &[("class", "lang-label")]);
        let content_class = format!("text-content {}", class);
        let content = page.create_element("div", &[("class", content_class.as_str())]);
        page.set_text(&label, &language_name(code));
        page.set_text(&content, text);
        page.append_child(&row, label);
        page.append_child(&row, content);
        page.append_child(&popup, row);
    }

    let actions = page.create_element("div", &[("class", "popup-actions")]);
    let copy = page.create_element("button", &[("class", COPY_CLASS), ("type", "button")]);
    let insert = page.create_element("button", &[("class", INSERT_CLASS), ("type", "button")]);
    page.set_text(&copy, "Copy Translation");
    page.set_text(&insert, "Insert");
    page.append_child(&actions, copy);
    page.append_child(&actions, insert);
    page.append_child(&popup, actions);

    page.append_child(&body, popup.clone());

    let weak = Rc::downgrade(page);
    let expiring = popup.clone();
    tokio::task::spawn_local(async move {
        tokio::time::sleep(POPUP_LIFETIME).await;
        if let Some(page) = weak.upgrade() {
            if page.contains(&expiring) {
                page.remove(&expiring);
                debug!("临时翻译弹窗已过期");
            }
        }
    });

    Some(popup)
}

fn on_click(session: &Session, event: &mut DomEvent) {
    let path = ancestors_and_self(&event.target);

    if path.iter().any(|n| has_class(n, STATUS_WIDGET_CLASS)) {
        event.stop_propagation();
        session.toggle_with_notice();
        return;
    }

    let Some(popup_at) = path.iter().position(|n| has_class(n, POPUP_CLASS)) else {
        return;
    };
    let popup = path[popup_at].clone();
    let inside = &path[..popup_at];
    let text = get_node_attr(&popup, POPUP_TEXT_ATTR).unwrap_or_default();

    if inside.iter().any(|n| has_class(n, INSERT_CLASS)) {
        event.stop_propagation();
        match session.insert_translation(&text) {
            Ok(()) => session.notices.success("Translation inserted"),
            Err(e) => {
                log_error(&e);
                session.notices.warning("Message input not found");
            }
        }
        session.page.remove(&popup);
    } else if inside.iter().any(|n| has_class(n, COPY_CLASS)) {
        event.stop_propagation();
        session.notices.clipboard(&text);
        session.notices.success("Copied to clipboard");
        session.page.remove(&popup);
    } else if inside.iter().any(|n| has_class(n, CLOSE_CLASS)) {
        event.stop_propagation();
        session.page.remove(&popup);
    }
}

fn create_status(page: &LivePage) {
    let Some(body) = page.body() else {
        return;
    };
    if find_on_body(page, STATUS_WIDGET_CLASS).is_some() {
        return;
    }

    let widget = page.create_element("div", &[("class", STATUS_WIDGET_CLASS)]);
    let icon = page.create_element("div", &[("class", "widget-icon")]);
    let status = page.create_element("div", &[("class", STATUS_TEXT_CLASS)]);
    let langs = page.create_element("div", &[("class", STATUS_LANGS_CLASS)]);
    page.set_text(&icon, "🌐");
    page.set_text(&status, "Inactive");
    page.append_child(&widget, icon);
    page.append_child(&widget, status);
    page.append_child(&widget, langs);
    page.append_child(&body, widget);
}

fn find_on_body(page: &LivePage, class: &str) -> Option<Handle> {
    let body = page.body()?;
    let found = body
        .children
        .borrow()
        .iter()
        .find(|child| has_class(child, class))
        .cloned();
    found
}

fn child_with_class(parent: &Handle, class: &str) -> Option<Handle> {
    let found = parent
        .children
        .borrow()
        .iter()
        .find(|child| has_class(child, class))
        .cloned();
    found
}
