//! 活动页面模型
//!
//! 宿主页面的 DOM 不归本系统所有：核心只通过结构定位器查询、
//! 订阅变更批次、监听和分发事件。所有修改都经由这里，
//! 以便产生与浏览器一致的变更通知。
//!
//! 页面上下文是单线程的（节点句柄是 `Rc`），相关任务运行在 `LocalSet` 上。

pub mod events;
pub mod mutation;

use std::cell::RefCell;
use std::rc::Rc;

use markup5ever_rcdom::{Handle, RcDom};
use tokio::sync::mpsc;
use url::Url;

use crate::parsers::html::dom::{
    self, get_child_node_by_name, get_node_attr, get_node_name, get_parent_node,
};
use crate::parsers::html::{serialize_document, Locator};
use crate::translation::error::{TranslatorError, TranslatorResult};

pub use events::{DomEvent, EventKind, KeyInfo, Listener, ListenerId, Phase};
pub use mutation::{MutationBatch, MutationKind, MutationRecord, SubscriptionId};

use events::EventRegistry;
use mutation::MutationBus;

/// 活动页面
pub struct LivePage {
    dom: RcDom,
    url: Url,
    bus: RefCell<MutationBus>,
    listeners: RefCell<EventRegistry>,
}

impl LivePage {
    /// 从 HTML 文本与页面地址创建页面
    pub fn from_html(html: &str, url: &str) -> TranslatorResult<Rc<Self>> {
        let url = Url::parse(url)
            .map_err(|e| TranslatorError::InvalidInput(format!("无效的页面地址 {}: {}", url, e)))?;
        let dom = dom::html_to_dom(html.as_bytes(), "utf-8")?;

        Ok(Rc::new(Self {
            dom,
            url,
            bus: RefCell::new(MutationBus::default()),
            listeners: RefCell::new(EventRegistry::default()),
        }))
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn document(&self) -> Handle {
        self.dom.document.clone()
    }

    pub fn body(&self) -> Option<Handle> {
        get_child_node_by_name(&self.dom.document, "html")
            .and_then(|html| get_child_node_by_name(&html, "body"))
    }

    // ==================== 查询 ====================

    /// 在整个文档中查找第一个匹配节点
    pub fn query(&self, locator: &Locator) -> Option<Handle> {
        locator.query_first(&self.dom.document)
    }

    /// 在整个文档中查找全部匹配节点
    pub fn query_all(&self, locator: &Locator) -> Vec<Handle> {
        locator.query_all(&self.dom.document)
    }

    /// 节点是否仍挂在本文档上
    pub fn contains(&self, node: &Handle) -> bool {
        dom::is_ancestor_or_self(&self.dom.document, node)
    }

    // ==================== 修改 ====================

    pub fn create_element(&self, tag: &str, attrs: &[(&str, &str)]) -> Handle {
        dom::new_element(&self.dom, tag, attrs)
    }

    /// 解析 HTML 片段并追加到 `parent`，作为一个变更批次通知
    pub fn append_html(&self, parent: &Handle, html: &str) -> TranslatorResult<Vec<Handle>> {
        let nodes = dom::parse_fragment(html)?;
        for node in &nodes {
            dom::append_child(parent, node.clone());
        }
        self.notify(vec![MutationRecord::child_list(
            parent.clone(),
            nodes.clone(),
            Vec::new(),
        )]);
        Ok(nodes)
    }

    pub fn append_child(&self, parent: &Handle, child: Handle) {
        dom::append_child(parent, child.clone());
        self.notify(vec![MutationRecord::child_list(
            parent.clone(),
            vec![child],
            Vec::new(),
        )]);
    }

    /// 在 `reference` 之后插入节点
    pub fn insert_after(&self, reference: &Handle, node: Handle) -> bool {
        if !dom::insert_after(reference, node.clone()) {
            return false;
        }
        if let Some(parent) = get_parent_node(&node) {
            self.notify(vec![MutationRecord::child_list(parent, vec![node], Vec::new())]);
        }
        true
    }

    /// 移除节点
    pub fn remove(&self, node: &Handle) {
        let Some(parent) = get_parent_node(node) else {
            return;
        };
        dom::detach(node);
        self.notify(vec![MutationRecord::child_list(
            parent,
            Vec::new(),
            vec![node.clone()],
        )]);
    }

    /// 替换节点的文本内容
    pub fn set_text(&self, node: &Handle, text: &str) {
        let removed: Vec<Handle> = node.children.borrow().clone();
        dom::set_text_content(node, text);
        let added: Vec<Handle> = node.children.borrow().clone();
        self.notify(vec![MutationRecord {
            kind: MutationKind::CharacterData,
            target: node.clone(),
            added,
            removed,
        }]);
    }

    /// 设置或移除属性
    pub fn set_attr(&self, node: &Handle, name: &str, value: Option<&str>) {
        dom::set_node_attr(node, name, value.map(str::to_string));
        self.notify(vec![MutationRecord {
            kind: MutationKind::Attributes {
                name: name.to_string(),
            },
            target: node.clone(),
            added: Vec::new(),
            removed: Vec::new(),
        }]);
    }

    /// 读取输入控件的值
    ///
    /// `<input>` 读 value 属性，其它（textarea、contenteditable）读文本内容。
    pub fn read_value(&self, node: &Handle) -> String {
        if get_node_name(node) == Some("input") {
            get_node_attr(node, "value").unwrap_or_default()
        } else {
            dom::text_content(node)
        }
    }

    /// 写入输入控件的值
    pub fn write_value(&self, node: &Handle, value: &str) {
        if get_node_name(node) == Some("input") {
            self.set_attr(node, "value", Some(value));
        } else {
            self.set_text(node, value);
        }
    }

    // ==================== 变更订阅 ====================

    /// 订阅 `root` 子树的变更批次
    pub fn subscribe(&self, root: &Handle) -> (SubscriptionId, mpsc::UnboundedReceiver<MutationBatch>) {
        self.bus.borrow_mut().subscribe(root.clone())
    }

    pub fn disconnect(&self, id: SubscriptionId) -> bool {
        self.bus.borrow_mut().unsubscribe(id)
    }

    pub fn subscription_count(&self) -> usize {
        self.bus.borrow().len()
    }

    fn notify(&self, batch: MutationBatch) {
        self.bus.borrow_mut().publish(&batch);
    }

    // ==================== 事件 ====================

    pub fn add_listener<F>(&self, node: &Handle, kind: EventKind, phase: Phase, callback: F) -> ListenerId
    where
        F: Fn(&mut DomEvent) + 'static,
    {
        self.listeners
            .borrow_mut()
            .add(node.clone(), kind, phase, Rc::new(callback))
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.borrow_mut().remove(id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// 分发事件并返回传播结束后的事件
    pub fn dispatch(&self, event: DomEvent) -> DomEvent {
        events::dispatch_with(event, |node, kind, phase| {
            self.listeners.borrow().lookup(node, kind, phase)
        })
    }

    // ==================== 输出 ====================

    pub fn to_html(&self) -> TranslatorResult<String> {
        let bytes = serialize_document(&self.dom.document, "utf-8")?;
        Ok(String::from_utf8_lossy(&bytes).to_string())
    }
}
