//! 文本规整
//!
//! 从消息元素中取出可翻译的文本：跳过本系统插入的节点，
//! 去掉首尾空白，过滤过短、没有字母或只是链接的文本。

use std::sync::OnceLock;

use markup5ever_rcdom::Handle;
use regex::Regex;

use crate::parsers::html::dom::{ancestors_and_self, has_class, text_content_filtered};
use crate::translation::config::constants::{
    INPUT_HELPER_CLASS, MIN_TEXT_CHARS, OVERLAY_CLASS, POPUP_CLASS, STATUS_WIDGET_CLASS,
};

/// 文本规整器
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    min_chars: usize,
}

#[derive(Default)]
struct RegexCache {
    url_regex: OnceLock<Option<Regex>>,
}

fn regex_cache() -> &'static RegexCache {
    static CACHE: OnceLock<RegexCache> = OnceLock::new();
    CACHE.get_or_init(RegexCache::default)
}

impl RegexCache {
    fn url(&self) -> Option<&Regex> {
        self.url_regex
            .get_or_init(|| Regex::new(r"^(https?|ftp)://[^\s]+$").ok())
            .as_ref()
    }
}

impl TextNormalizer {
    /// 文本字符数必须大于 `min_chars` 才会被翻译
    pub fn new(min_chars: usize) -> Self {
        Self { min_chars }
    }

    /// 提取元素文本，不含翻译层和输入辅助按钮
    pub fn extract(&self, element: &Handle) -> String {
        text_content_filtered(element, &is_own_marker).trim().to_string()
    }

    /// 判断规整后的文本是否值得翻译
    pub fn is_translatable(&self, text: &str) -> bool {
        let text = text.trim();
        if text.chars().count() <= self.min_chars {
            return false;
        }
        if !text.chars().any(char::is_alphabetic) {
            return false;
        }
        if let Some(url) = regex_cache().url() {
            if url.is_match(text) {
                return false;
            }
        }
        true
    }

    /// 提取并检查，返回可翻译的文本
    pub fn candidate(&self, element: &Handle) -> Option<String> {
        let text = self.extract(element);
        if self.is_translatable(&text) {
            Some(text)
        } else {
            None
        }
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new(MIN_TEXT_CHARS)
    }
}

// 元素本身是本系统插入的翻译层、输入辅助按钮、弹窗或状态挂件
fn is_own_marker(node: &Handle) -> bool {
    [OVERLAY_CLASS, INPUT_HELPER_CLASS, POPUP_CLASS, STATUS_WIDGET_CLASS]
        .iter()
        .any(|class| has_class(node, class))
}

/// 节点是否属于本系统插入的内容（自身或任一祖先带有上述标记）
pub fn is_own_node(node: &Handle) -> bool {
    ancestors_and_self(node).iter().any(is_own_marker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::html_to_dom;
    use crate::parsers::html::Locator;
    use markup5ever_rcdom::RcDom;

    fn parse(html: &str, selector: &str) -> (RcDom, Handle) {
        let dom = html_to_dom(html.as_bytes(), "utf-8").unwrap();
        let node = Locator::parse(selector)
            .unwrap()
            .query_first(&dom.document)
            .unwrap();
        (dom, node)
    }

    #[test]
    fn test_length_threshold_counts_characters() {
        let n = TextNormalizer::default();
        assert!(!n.is_translatable("ok"));
        assert!(!n.is_translatable("  hey  "));
        assert!(n.is_translatable("hola"));
        // 4 个字符，多字节不影响计数
        assert!(n.is_translatable("日本語だ"));
    }

    #[test]
    fn test_skips_non_alphabetic_and_links() {
        let n = TextNormalizer::default();
        assert!(!n.is_translatable("12345 678"));
        assert!(!n.is_translatable("👍👍👍👍"));
        assert!(!n.is_translatable("https://example.com/some/path"));
        assert!(n.is_translatable("look at https://example.com"));
    }

    #[test]
    fn test_extract_ignores_overlay_subtree() {
        let (_dom, msg) = parse(
            r#"<div id="m"><span>Hola amigo</span><div class="translation-overlay"><div class="translation-text">Hello friend</div></div></div>"#,
            "#m",
        );
        let n = TextNormalizer::default();
        assert_eq!(n.extract(&msg), "Hola amigo");
        assert_eq!(n.candidate(&msg).as_deref(), Some("Hola amigo"));
    }

    #[test]
    fn test_own_node_detection() {
        let (_dom, text) = parse(
            r#"<div class="translation-overlay"><div class="translation-text">x</div></div>"#,
            ".translation-text",
        );
        assert!(is_own_node(&text));

        let (_dom2, plain) = parse(r#"<div class="message-text">x</div>"#, ".message-text");
        assert!(!is_own_node(&plain));
    }
}
