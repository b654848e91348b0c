//! # 解析器模块
//!
//! 页面结构相关的解析与DOM操作：
//!
//! - `html` - HTML文档解析、DOM操作、结构定位器与序列化

pub mod html;

pub use html::{html_to_dom, serialize_document, Locator};
