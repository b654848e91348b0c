use std::cell::RefCell;
use std::rc::Rc;

use encoding_rs::Encoding;
use html5ever::interface::{Attribute, QualName};
use html5ever::parse_document;
use html5ever::tendril::{format_tendril, StrTendril, TendrilSink};
use html5ever::tree_builder::create_element;
use html5ever::{namespace_url, ns, LocalName};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom};

use crate::translation::error::{TranslatorError, TranslatorResult};

/// 将 HTML 字节转换为 DOM
pub fn html_to_dom(data: &[u8], document_encoding: &str) -> TranslatorResult<RcDom> {
    let s: String = if let Some(encoding) = Encoding::for_label(document_encoding.as_bytes()) {
        let (string, _, _) = encoding.decode(data);
        string.to_string()
    } else {
        String::from_utf8_lossy(data).to_string()
    };

    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut s.as_bytes())
        .map_err(|e| TranslatorError::InvalidInput(format!("无法解析HTML: {}", e)))
}

/// 将 HTML 片段解析为一组游离节点
///
/// 返回的节点已脱离临时文档，可以直接挂到其它树上。
pub fn parse_fragment(html: &str) -> TranslatorResult<Vec<Handle>> {
    let wrapped = format!("<html><head></head><body>{}</body></html>", html);
    let dom = html_to_dom(wrapped.as_bytes(), "utf-8")?;

    let body = get_child_node_by_name(&dom.document, "html")
        .and_then(|html| get_child_node_by_name(&html, "body"))
        .ok_or_else(|| TranslatorError::InvalidInput("片段缺少 body".to_string()))?;

    let children: Vec<Handle> = body.children.borrow_mut().drain(..).collect();
    for child in &children {
        child.parent.set(None);
    }
    Ok(children)
}

/// 根据名称获取子节点
pub fn get_child_node_by_name(parent: &Handle, node_name: &str) -> Option<Handle> {
    let children = parent.children.borrow();
    let matching_children = children.iter().find(|child| match child.data {
        NodeData::Element { ref name, .. } => &*name.local == node_name,
        _ => false,
    });
    matching_children.cloned()
}

/// 获取节点属性值
pub fn get_node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => {
            for attr in attrs.borrow().iter() {
                if &*attr.name.local == attr_name {
                    return Some(attr.value.to_string());
                }
            }
            None
        }
        _ => None,
    }
}

/// 获取节点名称
pub fn get_node_name(node: &Handle) -> Option<&'_ str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

/// 是否为元素节点
pub fn is_element(node: &Handle) -> bool {
    matches!(node.data, NodeData::Element { .. })
}

/// 检查 class 属性中是否包含指定类名
pub fn has_class(node: &Handle, class_name: &str) -> bool {
    get_node_attr(node, "class")
        .map(|classes| classes.split_whitespace().any(|c| c == class_name))
        .unwrap_or(false)
}

/// 获取父节点
///
/// `parent` 是 `Cell<Option<Weak>>`，读取时先取出再放回。
pub fn get_parent_node(child: &Handle) -> Option<Handle> {
    let weak = child.parent.take();
    let parent = weak.as_ref().and_then(|node| node.upgrade());
    child.parent.set(weak);
    parent
}

/// 设置节点属性
pub fn set_node_attr(node: &Handle, attr_name: &str, attr_value: Option<String>) {
    if let NodeData::Element { attrs, .. } = &node.data {
        let attrs_mut = &mut attrs.borrow_mut();
        let mut i = 0;
        let mut found_existing_attr: bool = false;

        while i < attrs_mut.len() {
            if &attrs_mut[i].name.local == attr_name {
                found_existing_attr = true;

                if let Some(attr_value) = attr_value.clone() {
                    attrs_mut[i].value.clear();
                    attrs_mut[i].value.push_slice(attr_value.as_str());
                } else {
                    // 未提供值时完全移除该属性
                    attrs_mut.remove(i);
                    continue;
                }
            }

            i += 1;
        }

        if !found_existing_attr {
            if let Some(attr_value) = attr_value {
                attrs_mut.push(Attribute {
                    name: QualName::new(None, ns!(), LocalName::from(attr_name)),
                    value: format_tendril!("{}", attr_value),
                });
            }
        }
    };
}

/// 创建带属性的元素节点
pub fn new_element(dom: &RcDom, tag: &str, attrs: &[(&str, &str)]) -> Handle {
    let attributes = attrs
        .iter()
        .map(|(name, value)| Attribute {
            name: QualName::new(None, ns!(), LocalName::from(*name)),
            value: format_tendril!("{}", value),
        })
        .collect();

    create_element(dom, QualName::new(None, ns!(), LocalName::from(tag)), attributes)
}

/// 创建文本节点
pub fn new_text(text: &str) -> Handle {
    Node::new(NodeData::Text {
        contents: RefCell::new(StrTendril::from_slice(text)),
    })
}

/// 追加子节点
pub fn append_child(parent: &Handle, child: Handle) {
    detach(&child);
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child);
}

/// 在 `reference` 之后插入兄弟节点
///
/// `reference` 没有父节点时返回 false。
pub fn insert_after(reference: &Handle, node: Handle) -> bool {
    let Some(parent) = get_parent_node(reference) else {
        return false;
    };

    detach(&node);
    let mut children = parent.children.borrow_mut();
    let position = children
        .iter()
        .position(|child| Rc::ptr_eq(child, reference))
        .map(|index| index + 1)
        .unwrap_or(children.len());
    node.parent.set(Some(Rc::downgrade(&parent)));
    children.insert(position, node);
    true
}

/// 将节点从其父节点中移除
pub fn detach(node: &Handle) {
    if let Some(parent) = get_parent_node(node) {
        parent
            .children
            .borrow_mut()
            .retain(|child| !Rc::ptr_eq(child, node));
    }
    node.parent.set(None);
}

/// 判断 `ancestor` 是否为 `node` 本身或其祖先
pub fn is_ancestor_or_self(ancestor: &Handle, node: &Handle) -> bool {
    let mut current = Some(node.clone());
    while let Some(candidate) = current {
        if Rc::ptr_eq(&candidate, ancestor) {
            return true;
        }
        current = get_parent_node(&candidate);
    }
    false
}

/// 从节点到根的祖先链（包含节点本身）
pub fn ancestors_and_self(node: &Handle) -> Vec<Handle> {
    let mut chain = Vec::new();
    let mut current = Some(node.clone());
    while let Some(candidate) = current {
        current = get_parent_node(&candidate);
        chain.push(candidate);
    }
    chain
}

/// 收集文本内容
///
/// `skip` 返回 true 的元素连同其子树都不计入结果。
pub fn text_content_filtered<F>(node: &Handle, skip: &F) -> String
where
    F: Fn(&Handle) -> bool,
{
    let mut out = String::new();
    collect_text(node, skip, &mut out);
    out
}

fn collect_text<F>(node: &Handle, skip: &F, out: &mut String)
where
    F: Fn(&Handle) -> bool,
{
    match &node.data {
        NodeData::Text { contents } => out.push_str(&contents.borrow()),
        NodeData::Element { .. } if skip(node) => {}
        NodeData::Element { .. } | NodeData::Document => {
            for child in node.children.borrow().iter() {
                collect_text(child, skip, out);
            }
        }
        _ => {}
    }
}

/// 收集全部文本内容
pub fn text_content(node: &Handle) -> String {
    text_content_filtered(node, &|_| false)
}

/// 用单个文本节点替换全部子节点
pub fn set_text_content(node: &Handle, text: &str) {
    let old: Vec<Handle> = node.children.borrow_mut().drain(..).collect();
    for child in old {
        child.parent.set(None);
    }
    if !text.is_empty() {
        append_child(node, new_text(text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_of(dom: &RcDom) -> Handle {
        let html = get_child_node_by_name(&dom.document, "html").unwrap();
        get_child_node_by_name(&html, "body").unwrap()
    }

    #[test]
    fn test_fragment_nodes_are_detached() {
        let nodes = parse_fragment(r#"<div class="msg">hi</div><span>there</span>"#).unwrap();
        assert_eq!(nodes.len(), 2);
        assert!(get_parent_node(&nodes[0]).is_none());
        assert_eq!(get_node_name(&nodes[1]), Some("span"));
    }

    #[test]
    fn test_insert_after_places_sibling() {
        let dom = html_to_dom(b"<p id=a>one</p><p id=b>two</p>", "utf-8").unwrap();
        let body = body_of(&dom);
        let first = body.children.borrow()[0].clone();

        let marker = new_element(&dom, "div", &[("class", "marker")]);
        assert!(insert_after(&first, marker.clone()));

        let children = body.children.borrow();
        assert!(Rc::ptr_eq(&children[1], &marker));
        assert_eq!(get_node_attr(&children[2], "id").as_deref(), Some("b"));
    }

    #[test]
    fn test_text_content_skips_filtered_subtrees() {
        let dom = html_to_dom(
            br#"<div id=m>hello <b>world</b><div class="translation-overlay">hola</div></div>"#,
            "utf-8",
        )
        .unwrap();
        let message = body_of(&dom).children.borrow()[0].clone();

        assert_eq!(text_content(&message), "hello worldhola");
        let filtered = text_content_filtered(&message, &|n| has_class(n, "translation-overlay"));
        assert_eq!(filtered, "hello world");
    }

    #[test]
    fn test_set_node_attr_replaces_and_removes() {
        let dom = RcDom::default();
        let node = new_element(&dom, "div", &[("data-showing", "translation")]);

        set_node_attr(&node, "data-showing", Some("original".to_string()));
        assert_eq!(get_node_attr(&node, "data-showing").as_deref(), Some("original"));

        set_node_attr(&node, "data-showing", None);
        assert_eq!(get_node_attr(&node, "data-showing"), None);
    }
}
