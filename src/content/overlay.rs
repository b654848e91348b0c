//! 翻译层
//!
//! 在消息文本元素之后插入译文层，层内的按钮可在译文与原文之间切换，
//! 或关闭翻译层。同一父元素下最多只有一个翻译层。
//!
//! 按钮不单独登记监听器：文档上只有一个捕获阶段的委托监听器，
//! 原文与译文保存在翻译层自身的属性上，宿主移除消息时不会留下任何登记。

use std::cell::Cell;
use std::rc::{Rc, Weak};

use markup5ever_rcdom::Handle;
use tracing::debug;

use crate::page::{DomEvent, EventKind, ListenerId, LivePage, Phase};
use crate::parsers::html::dom::{ancestors_and_self, get_node_attr, get_parent_node, has_class};
use crate::translation::config::constants::{
    DISMISSED_ATTR, DISMISS_CLASS, OVERLAY_CLASS, OVERLAY_TEXT_CLASS, TOGGLE_CLASS,
};

const SHOWING_ATTR: &str = "data-showing";
const TRANSLATED_ATTR: &str = "data-translated";
const ORIGINAL_ATTR: &str = "data-original";
const SHOW_ORIGINAL: &str = "Show Original";
const SHOW_TRANSLATION: &str = "Show Translation";

/// 附加结果
#[derive(Debug, Clone)]
pub enum AttachOutcome {
    Attached(Handle),
    /// 父元素下已有翻译层
    AlreadyPresent,
    /// 用户关闭过这条消息的翻译层
    Dismissed,
    /// 译文与原文相同
    Unchanged,
    /// 文本元素已不在页面上
    Detached,
}

impl AttachOutcome {
    pub fn is_attached(&self) -> bool {
        matches!(self, AttachOutcome::Attached(_))
    }
}

/// 翻译层控制器
#[derive(Clone)]
pub struct OverlayController {
    page: Rc<LivePage>,
    delegate: Rc<Cell<Option<ListenerId>>>,
}

impl OverlayController {
    pub fn new(page: Rc<LivePage>) -> Self {
        Self {
            page,
            delegate: Rc::new(Cell::new(None)),
        }
    }

    /// 登记文档上的委托监听器，已登记时返回 false
    pub fn install(&self) -> bool {
        if self.delegate.get().is_some() {
            return false;
        }
        let page: Weak<LivePage> = Rc::downgrade(&self.page);
        let id = self.page.add_listener(
            &self.page.document(),
            EventKind::Click,
            Phase::Capture,
            move |event: &mut DomEvent| {
                if let Some(page) = page.upgrade() {
                    on_click(&page, event);
                }
            },
        );
        self.delegate.set(Some(id));
        true
    }

    /// 移除委托监听器，页面上已有的翻译层保留
    pub fn uninstall(&self) {
        if let Some(id) = self.delegate.take() {
            self.page.remove_listener(id);
        }
    }

    /// 在文本元素之后附加翻译层
    pub fn attach(&self, text_element: &Handle, translated: &str, original: &str) -> AttachOutcome {
        if translated.trim() == original.trim() {
            return AttachOutcome::Unchanged;
        }
        if !self.page.contains(text_element) {
            return AttachOutcome::Detached;
        }
        let Some(parent) = get_parent_node(text_element) else {
            return AttachOutcome::Detached;
        };
        if is_dismissed(&parent) {
            return AttachOutcome::Dismissed;
        }
        if find_overlay_in(&parent).is_some() {
            debug!("父元素下已有翻译层，跳过");
            return AttachOutcome::AlreadyPresent;
        }

        let overlay = self.page.create_element(
            "div",
            &[
                ("class", OVERLAY_CLASS),
                (SHOWING_ATTR, "translation"),
                (TRANSLATED_ATTR, translated),
                (ORIGINAL_ATTR, original),
            ],
        );
        let text = self.page.create_element("div", &[("class", OVERLAY_TEXT_CLASS)]);
        let toggle = self
            .page
            .create_element("button", &[("class", TOGGLE_CLASS), ("type", "button")]);
        let dismiss = self.page.create_element(
            "button",
            &[("class", DISMISS_CLASS), ("type", "button"), ("title", "Dismiss")],
        );
        self.page.append_child(&overlay, text.clone());
        self.page.append_child(&overlay, toggle.clone());
        self.page.append_child(&overlay, dismiss.clone());
        self.page.set_text(&text, &translation_label(translated));
        self.page.set_text(&toggle, SHOW_ORIGINAL);
        self.page.set_text(&dismiss, "×");

        if !self.page.insert_after(text_element, overlay.clone()) {
            return AttachOutcome::Detached;
        }
        AttachOutcome::Attached(overlay)
    }

    /// 文本元素是否已有翻译层或翻译层已被关闭
    pub fn is_annotated(&self, text_element: &Handle) -> bool {
        get_parent_node(text_element)
            .map(|parent| is_dismissed(&parent) || find_overlay_in(&parent).is_some())
            .unwrap_or(false)
    }

    /// 查找文本元素对应的翻译层
    pub fn find_overlay(&self, text_element: &Handle) -> Option<Handle> {
        get_parent_node(text_element).and_then(|parent| find_overlay_in(&parent))
    }

    /// 页面上的翻译层数量
    pub fn overlay_count(&self) -> usize {
        count_overlays(&self.page.document())
    }
}

/// 翻译层当前是否显示译文
pub fn is_showing_translation(overlay: &Handle) -> bool {
    get_node_attr(overlay, SHOWING_ATTR).as_deref() != Some("original")
}

// 委托处理：只响应翻译层内的切换与关闭按钮
fn on_click(page: &LivePage, event: &mut DomEvent) {
    let path = ancestors_and_self(&event.target);
    let Some(overlay_at) = path.iter().position(|n| has_class(n, OVERLAY_CLASS)) else {
        return;
    };
    let overlay = path[overlay_at].clone();
    let inside = &path[..overlay_at];

    if inside.iter().any(|n| has_class(n, DISMISS_CLASS)) {
        event.stop_propagation();
        dismiss_overlay(page, &overlay);
    } else if inside.iter().any(|n| has_class(n, TOGGLE_CLASS)) {
        event.stop_propagation();
        toggle_overlay(page, &overlay);
    }
}

// 移除翻译层并在父元素上留下标记，之后的重新扫描不再附加
fn dismiss_overlay(page: &LivePage, overlay: &Handle) {
    if let Some(parent) = get_parent_node(overlay) {
        page.set_attr(&parent, DISMISSED_ATTR, Some("true"));
    }
    page.remove(overlay);
    debug!("翻译层已关闭");
}

fn is_dismissed(parent: &Handle) -> bool {
    get_node_attr(parent, DISMISSED_ATTR).is_some()
}

fn find_overlay_in(parent: &Handle) -> Option<Handle> {
    parent
        .children
        .borrow()
        .iter()
        .find(|child| has_class(child, OVERLAY_CLASS))
        .cloned()
}

fn translation_label(text: &str) -> String {
    format!("🌐 {}", text)
}

fn original_label(text: &str) -> String {
    format!("📝 {}", text)
}

// 切换翻译层显示的内容
fn toggle_overlay(page: &LivePage, overlay: &Handle) {
    let children: Vec<Handle> = overlay.children.borrow().clone();
    let text = children.iter().find(|c| has_class(c, OVERLAY_TEXT_CLASS));
    let button = children.iter().find(|c| has_class(c, TOGGLE_CLASS));
    let (Some(text), Some(button)) = (text, button) else {
        return;
    };
    let translated = get_node_attr(overlay, TRANSLATED_ATTR).unwrap_or_default();
    let original = get_node_attr(overlay, ORIGINAL_ATTR).unwrap_or_default();

    if is_showing_translation(overlay) {
        page.set_text(text, &original_label(&original));
        page.set_text(button, SHOW_TRANSLATION);
        page.set_attr(overlay, SHOWING_ATTR, Some("original"));
    } else {
        page.set_text(text, &translation_label(&translated));
        page.set_text(button, SHOW_ORIGINAL);
        page.set_attr(overlay, SHOWING_ATTR, Some("translation"));
    }
}

fn count_overlays(node: &Handle) -> usize {
    node.children
        .borrow()
        .iter()
        .map(|child| usize::from(has_class(child, OVERLAY_CLASS)) + count_overlays(child))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::text_content;
    use crate::parsers::html::Locator;

    fn setup() -> (Rc<LivePage>, Handle) {
        let page = LivePage::from_html(
            r#"<div class="message-in"><span id="t">Hola amigo</span></div>"#,
            "https://web.whatsapp.com/",
        )
        .unwrap();
        let text = page.query(&Locator::parse("#t").unwrap()).unwrap();
        (page, text)
    }

    fn query(page: &LivePage, selector: &str) -> Handle {
        page.query(&Locator::parse(selector).unwrap()).unwrap()
    }

    #[test]
    fn test_attach_once_per_parent() {
        let (page, text) = setup();
        let overlays = OverlayController::new(page.clone());

        assert!(overlays.attach(&text, "Hello friend", "Hola amigo").is_attached());
        assert!(matches!(
            overlays.attach(&text, "Hello friend", "Hola amigo"),
            AttachOutcome::AlreadyPresent
        ));
        assert_eq!(overlays.overlay_count(), 1);
        assert!(overlays.is_annotated(&text));

        let overlay = overlays.find_overlay(&text).unwrap();
        assert!(text_content(&overlay).contains("🌐 Hello friend"));
        assert!(is_showing_translation(&overlay));
    }

    #[test]
    fn test_identical_translation_is_not_shown() {
        let (page, text) = setup();
        let overlays = OverlayController::new(page);
        assert!(matches!(
            overlays.attach(&text, " Hola amigo ", "Hola amigo"),
            AttachOutcome::Unchanged
        ));
        assert_eq!(overlays.overlay_count(), 0);
        assert!(!overlays.is_annotated(&text));
    }

    #[test]
    fn test_toggle_switches_between_texts() {
        let (page, text) = setup();
        let overlays = OverlayController::new(page.clone());
        overlays.install();
        overlays.attach(&text, "Hello friend", "Hola amigo");

        let button = query(&page, ".toggle-btn");
        let overlay = overlays.find_overlay(&text).unwrap();

        page.dispatch(DomEvent::click(button.clone()));
        assert!(!is_showing_translation(&overlay));
        assert!(text_content(&overlay).contains("📝 Hola amigo"));
        assert_eq!(text_content(&button), "Show Translation");

        page.dispatch(DomEvent::click(button.clone()));
        assert!(is_showing_translation(&overlay));
        assert_eq!(text_content(&button), "Show Original");
    }

    #[test]
    fn test_dismiss_removes_overlay_for_good() {
        let (page, text) = setup();
        let overlays = OverlayController::new(page.clone());
        overlays.install();
        overlays.attach(&text, "Hello friend", "Hola amigo");

        let dismiss = query(&page, ".translation-dismiss");
        let event = page.dispatch(DomEvent::click(dismiss));
        assert!(event.propagation_stopped);
        assert_eq!(overlays.overlay_count(), 0);

        assert!(overlays.is_annotated(&text));
        assert!(matches!(
            overlays.attach(&text, "Hello friend", "Hola amigo"),
            AttachOutcome::Dismissed
        ));
        assert_eq!(overlays.overlay_count(), 0);
    }

    #[test]
    fn test_overlays_share_one_listener() {
        let page = LivePage::from_html(
            r#"<div id="list"><div><span id="a">Hola amigo</span></div><div><span id="b">Buenos días</span></div></div>"#,
            "https://web.whatsapp.com/",
        )
        .unwrap();
        let overlays = OverlayController::new(page.clone());
        assert!(overlays.install());
        assert!(!overlays.install());
        let baseline = page.listener_count();

        let a = query(&page, "#a");
        let b = query(&page, "#b");
        overlays.attach(&a, "Hello friend", "Hola amigo");
        overlays.attach(&b, "Good morning", "Buenos días");
        assert_eq!(page.listener_count(), baseline);

        // 第二个翻译层的按钮只影响它自己
        let second = overlays.find_overlay(&b).unwrap();
        let buttons = page.query_all(&Locator::parse(".toggle-btn").unwrap());
        page.dispatch(DomEvent::click(buttons[1].clone()));
        assert!(!is_showing_translation(&second));
        assert!(is_showing_translation(&overlays.find_overlay(&a).unwrap()));

        overlays.uninstall();
        assert_eq!(page.listener_count(), 0);
    }

    #[test]
    fn test_detached_element() {
        let (page, text) = setup();
        page.remove(&text);
        let overlays = OverlayController::new(page);
        assert!(matches!(
            overlays.attach(&text, "Hello friend", "Hola amigo"),
            AttachOutcome::Detached
        ));
    }
}
