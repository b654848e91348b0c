//! 结构定位器
//!
//! 平台适配器用来描述消息列表、消息项、输入框等位置的选择器子集：
//! 标签、`*`、`.class`、`#id`、`[attr]`、`[attr="v"]` 以及 `~=` `|=` `^=` `$=` `*=`，
//! 后代组合符（空白）、子代组合符 `>` 与逗号分隔的选择器列表。
//! 词法分析交给 cssparser。

use std::fmt;
use std::str::FromStr;

use cssparser::{ParseError, Parser, ParserInput, Token};
use markup5ever_rcdom::Handle;

use super::dom::{get_node_attr, get_node_name, get_parent_node, has_class, is_element};
use crate::translation::error::{TranslatorError, TranslatorResult};

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals(String),
    Includes(String),
    DashMatch(String),
    Prefix(String),
    Suffix(String),
    Substring(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrSelector {
    name: String,
    op: AttrOp,
}

impl AttrSelector {
    fn matches(&self, node: &Handle) -> bool {
        let Some(value) = get_node_attr(node, &self.name) else {
            return false;
        };

        match &self.op {
            AttrOp::Exists => true,
            AttrOp::Equals(expected) => &value == expected,
            AttrOp::Includes(expected) => value.split_whitespace().any(|v| v == expected),
            AttrOp::DashMatch(expected) => {
                &value == expected || value.starts_with(&format!("{}-", expected))
            }
            // 空值的子串类匹配永远不成立
            AttrOp::Prefix(expected) => !expected.is_empty() && value.starts_with(expected),
            AttrOp::Suffix(expected) => !expected.is_empty() && value.ends_with(expected),
            AttrOp::Substring(expected) => !expected.is_empty() && value.contains(expected),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrSelector>,
}

impl Compound {
    fn matches(&self, node: &Handle) -> bool {
        let Some(name) = get_node_name(node) else {
            return false;
        };

        if let Some(tag) = &self.tag {
            if !name.eq_ignore_ascii_case(tag) {
                return false;
            }
        }

        if let Some(id) = &self.id {
            if get_node_attr(node, "id").as_deref() != Some(id.as_str()) {
                return false;
            }
        }

        self.classes.iter().all(|class| has_class(node, class))
            && self.attrs.iter().all(|attr| attr.matches(node))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

/// 一个复合选择器与它和前一个复合选择器之间的组合符
#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    combinator: Combinator,
    compound: Compound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    steps: Vec<Step>,
}

impl Complex {
    fn matches(&self, node: &Handle) -> bool {
        self.matches_at(self.steps.len() - 1, node)
    }

    // 从右向左匹配，后代组合符需要回溯
    fn matches_at(&self, index: usize, node: &Handle) -> bool {
        let step = &self.steps[index];
        if !step.compound.matches(node) {
            return false;
        }
        if index == 0 {
            return true;
        }

        match step.combinator {
            Combinator::Child => get_parent_node(node)
                .map(|parent| self.matches_at(index - 1, &parent))
                .unwrap_or(false),
            Combinator::Descendant => {
                let mut ancestor = get_parent_node(node);
                while let Some(candidate) = ancestor {
                    if self.matches_at(index - 1, &candidate) {
                        return true;
                    }
                    ancestor = get_parent_node(&candidate);
                }
                false
            }
        }
    }
}

/// 已解析的结构定位器
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    source: String,
    selectors: Vec<Complex>,
}

impl Locator {
    /// 解析定位器
    pub fn parse(source: &str) -> TranslatorResult<Self> {
        let mut input = ParserInput::new(source);
        let mut parser = Parser::new(&mut input);

        let selectors = parse_selector_list(&mut parser).map_err(|e| {
            TranslatorError::LocatorError(format!("{} ({:?})", source, e.kind))
        })?;

        Ok(Self {
            source: source.trim().to_string(),
            selectors,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// 节点本身是否匹配
    pub fn matches(&self, node: &Handle) -> bool {
        is_element(node) && self.selectors.iter().any(|selector| selector.matches(node))
    }

    /// 查找 `root` 的全部匹配后代，按文档顺序排列，不包含 `root` 本身
    pub fn query_all(&self, root: &Handle) -> Vec<Handle> {
        let mut found = Vec::new();
        for child in root.children.borrow().iter() {
            self.collect(child, &mut found);
        }
        found
    }

    /// 查找 `root` 的第一个匹配后代
    pub fn query_first(&self, root: &Handle) -> Option<Handle> {
        root.children
            .borrow()
            .iter()
            .find_map(|child| self.find_first(child))
    }

    fn collect(&self, node: &Handle, found: &mut Vec<Handle>) {
        if self.matches(node) {
            found.push(node.clone());
        }
        for child in node.children.borrow().iter() {
            self.collect(child, found);
        }
    }

    fn find_first(&self, node: &Handle) -> Option<Handle> {
        if self.matches(node) {
            return Some(node.clone());
        }
        node.children
            .borrow()
            .iter()
            .find_map(|child| self.find_first(child))
    }
}

impl FromStr for Locator {
    type Err = TranslatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Locator::parse(s)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn parse_selector_list<'i>(parser: &mut Parser<'i, '_>) -> Result<Vec<Complex>, ParseError<'i, ()>> {
    let mut list = Vec::new();
    let mut steps: Vec<Step> = Vec::new();
    let mut current: Option<Compound> = None;
    let mut combinator = Combinator::Descendant;

    loop {
        let token = match parser.next_including_whitespace() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };

        match token {
            Token::WhiteSpace(_) => {
                if let Some(compound) = current.take() {
                    steps.push(Step { combinator, compound });
                    combinator = Combinator::Descendant;
                }
            }
            Token::Delim('>') => {
                if let Some(compound) = current.take() {
                    steps.push(Step { combinator, compound });
                }
                if steps.is_empty() {
                    return Err(parser.new_unexpected_token_error(Token::Delim('>')));
                }
                combinator = Combinator::Child;
            }
            Token::Comma => {
                if let Some(compound) = current.take() {
                    steps.push(Step { combinator, compound });
                    combinator = Combinator::Descendant;
                }
                if steps.is_empty() || combinator == Combinator::Child {
                    return Err(parser.new_unexpected_token_error(Token::Comma));
                }
                list.push(Complex {
                    steps: std::mem::take(&mut steps),
                });
                combinator = Combinator::Descendant;
            }
            Token::Ident(name) => {
                let compound = current.get_or_insert_with(Compound::default);
                if compound != &Compound::default() {
                    return Err(parser.new_unexpected_token_error(Token::Ident(name)));
                }
                compound.tag = Some(name.to_ascii_lowercase());
            }
            Token::Delim('*') => {
                current.get_or_insert_with(Compound::default);
            }
            Token::Delim('.') => {
                let next = parser.next_including_whitespace()?.clone();
                let class = match next {
                    Token::Ident(class) => class.to_string(),
                    other => return Err(parser.new_unexpected_token_error(other)),
                };
                current.get_or_insert_with(Compound::default).classes.push(class);
            }
            Token::IDHash(id) | Token::Hash(id) => {
                current.get_or_insert_with(Compound::default).id = Some(id.to_string());
            }
            Token::SquareBracketBlock => {
                let attr = parser.parse_nested_block(parse_attribute)?;
                current.get_or_insert_with(Compound::default).attrs.push(attr);
            }
            other => return Err(parser.new_unexpected_token_error(other)),
        }
    }

    if let Some(compound) = current.take() {
        steps.push(Step { combinator, compound });
    } else if combinator == Combinator::Child {
        return Err(parser.new_custom_error(()));
    }

    if steps.is_empty() {
        return Err(parser.new_custom_error(()));
    }
    list.push(Complex { steps });

    Ok(list)
}

fn parse_attribute<'i>(parser: &mut Parser<'i, '_>) -> Result<AttrSelector, ParseError<'i, ()>> {
    let name = parser.expect_ident()?.to_ascii_lowercase();

    let op_token = match parser.next() {
        Ok(token) => token.clone(),
        Err(_) => {
            return Ok(AttrSelector {
                name,
                op: AttrOp::Exists,
            })
        }
    };

    let value_token = parser.next()?.clone();
    let value = match value_token {
        Token::Ident(value) | Token::QuotedString(value) => value.to_string(),
        Token::Number {
            int_value: Some(value),
            ..
        } => value.to_string(),
        other => return Err(parser.new_unexpected_token_error(other)),
    };

    let op = match op_token {
        Token::Delim('=') => AttrOp::Equals(value),
        Token::IncludeMatch => AttrOp::Includes(value),
        Token::DashMatch => AttrOp::DashMatch(value),
        Token::PrefixMatch => AttrOp::Prefix(value),
        Token::SuffixMatch => AttrOp::Suffix(value),
        Token::SubstringMatch => AttrOp::Substring(value),
        other => return Err(parser.new_unexpected_token_error(other)),
    };

    Ok(AttrSelector { name, op })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::{get_child_node_by_name, html_to_dom};
    use markup5ever_rcdom::RcDom;

    fn body(html: &str) -> (RcDom, Handle) {
        let dom = html_to_dom(html.as_bytes(), "utf-8").unwrap();
        let html = get_child_node_by_name(&dom.document, "html").unwrap();
        let body = get_child_node_by_name(&html, "body").unwrap();
        (dom, body)
    }

    fn ids(nodes: &[Handle]) -> Vec<String> {
        nodes
            .iter()
            .map(|n| get_node_attr(n, "id").unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_attribute_operators() {
        let (_dom, root) = body(
            r#"<div id="a" data-testid="msg-text"></div>
               <div id="b" class="messageContent-x1"></div>
               <div id="c" data-tab="10" contenteditable="true"></div>
               <div id="d" id-prefix="chat-messages-42"></div>"#,
        );

        let exact = Locator::parse(r#"[data-testid="msg-text"]"#).unwrap();
        assert_eq!(ids(&exact.query_all(&root)), vec!["a"]);

        let substring = Locator::parse(r#"[class*="messageContent"]"#).unwrap();
        assert_eq!(ids(&substring.query_all(&root)), vec!["b"]);

        let compound = Locator::parse(r#"[contenteditable="true"][data-tab="10"]"#).unwrap();
        assert_eq!(ids(&compound.query_all(&root)), vec!["c"]);

        let prefix = Locator::parse(r#"[id-prefix^="chat-messages-"]"#).unwrap();
        assert_eq!(ids(&prefix.query_all(&root)), vec!["d"]);
    }

    #[test]
    fn test_descendant_and_list_in_document_order() {
        let (_dom, root) = body(
            r#"<div data-testid="conversation-panel-messages">
                 <div id="m1" class="message-in"><span id="t1" class="copyable-text"><span id="s1">hi</span></span></div>
                 <div id="m2" class="message-out"></div>
               </div>
               <div id="outside" class="message-in"></div>"#,
        );

        let messages = Locator::parse(
            r#"[data-testid="conversation-panel-messages"] .message-in, [data-testid="conversation-panel-messages"] .message-out"#,
        )
        .unwrap();
        assert_eq!(ids(&messages.query_all(&root)), vec!["m1", "m2"]);

        let text = Locator::parse(".copyable-text span").unwrap();
        assert_eq!(ids(&text.query_all(&root)), vec!["s1"]);
    }

    #[test]
    fn test_child_combinator_and_tags() {
        let (_dom, root) = body(r#"<footer id="f"><div><input id="i" type="text"></div></footer>"#);

        assert!(Locator::parse("footer > input").unwrap().query_first(&root).is_none());
        let nested = Locator::parse("footer > div > input[type=\"text\"]").unwrap();
        assert_eq!(ids(&nested.query_all(&root)), vec!["i"]);
        assert_eq!(ids(&Locator::parse("#f").unwrap().query_all(&root)), vec!["f"]);
    }

    #[test]
    fn test_invalid_locators_are_rejected() {
        for source in ["", "> div", "div >", "a,,b", "[=x]", "div:hover"] {
            assert!(
                matches!(Locator::parse(source), Err(TranslatorError::LocatorError(_))),
                "{} should be rejected",
                source
            );
        }
    }
}
