//! HTML解析和处理模块
//!
//! - `dom`: 基础DOM操作
//! - `locator`: 结构定位器（选择器子集）
//! - `serializer`: 序列化功能

pub mod dom;
pub mod locator;
pub mod serializer;

pub use dom::{
    append_child, detach, get_child_node_by_name, get_node_attr, get_node_name, get_parent_node,
    has_class, html_to_dom, insert_after, is_ancestor_or_self, new_element, new_text,
    parse_fragment, set_node_attr, set_text_content, text_content, text_content_filtered,
};
pub use locator::Locator;
pub use serializer::{outer_html, serialize_document};
