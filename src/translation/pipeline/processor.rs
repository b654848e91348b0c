//! 消息处理器
//!
//! 对每个消息事件，找出其中的消息文本元素，逐个独立翻译并附加翻译层。
//! 已有翻译层（或翻译层被关闭过）的元素不再请求翻译。
//! 单个元素失败只记录日志，不影响同一事件中的其它元素。

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use markup5ever_rcdom::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

use super::normalizer::{is_own_node, TextNormalizer};
use super::observer::MessageEvent;
use crate::content::notice::NoticeSender;
use crate::content::overlay::{AttachOutcome, OverlayController};
use crate::parsers::html::dom::is_ancestor_or_self;
use crate::platform::PlatformProfile;
use crate::translation::config::Settings;
use crate::translation::core::TranslationService;
use crate::translation::error::helpers::log_error;

/// 消息处理器
pub struct MessageProcessor {
    profile: Rc<PlatformProfile>,
    normalizer: TextNormalizer,
    service: TranslationService,
    overlays: OverlayController,
    settings: Rc<RefCell<Settings>>,
    notices: NoticeSender,
    pending: Rc<Cell<usize>>,
}

impl MessageProcessor {
    pub fn new(
        profile: Rc<PlatformProfile>,
        normalizer: TextNormalizer,
        service: TranslationService,
        overlays: OverlayController,
        settings: Rc<RefCell<Settings>>,
        notices: NoticeSender,
    ) -> Self {
        Self {
            profile,
            normalizer,
            service,
            overlays,
            settings,
            notices,
            pending: Rc::new(Cell::new(0)),
        }
    }

    /// 事件子树中的消息文本元素
    ///
    /// 包含子树根本身，排除翻译层内部的元素；嵌套匹配时只保留最内层。
    pub fn text_elements(&self, root: &Handle) -> Vec<Handle> {
        let mut found = Vec::new();
        if self.profile.message_text.matches(root) {
            found.push(root.clone());
        }
        found.extend(self.profile.message_text.query_all(root));
        found.retain(|node| !is_own_node(node));

        let innermost: Vec<Handle> = found
            .iter()
            .filter(|outer| {
                !found
                    .iter()
                    .any(|inner| !Rc::ptr_eq(inner, outer) && is_ancestor_or_self(outer, inner))
            })
            .cloned()
            .collect();
        innermost
    }

    /// 处理一个消息事件，每个文本元素一个独立任务
    ///
    /// 需要在 `LocalSet` 中调用。
    pub fn process(&self, event: MessageEvent) -> Vec<JoinHandle<()>> {
        let elements = self.text_elements(&event.root);
        if elements.is_empty() {
            debug!("消息中没有可识别的文本元素");
            return Vec::new();
        }

        let (source, target) = self.settings.borrow().language_pair();
        let mut tasks = Vec::new();

        for element in elements {
            if self.overlays.is_annotated(&element) {
                debug!("元素已有翻译层，跳过");
                continue;
            }
            let Some(text) = self.normalizer.candidate(&element) else {
                continue;
            };

            let service = self.service.clone();
            let overlays = self.overlays.clone();
            let notices = self.notices.clone();
            let pending = Rc::clone(&self.pending);
            let (source, target) = (source.clone(), target.clone());

            pending.set(pending.get() + 1);
            tasks.push(tokio::task::spawn_local(async move {
                match service.translate(&text, &source, &target).await {
                    Ok(result) => match overlays.attach(&element, &result.translated_text, &text) {
                        AttachOutcome::Attached(_) => {
                            debug!("已附加翻译层 ({} -> {})", result.detected_language, target)
                        }
                        AttachOutcome::Detached => debug!("消息已被移除，丢弃译文"),
                        _ => {}
                    },
                    Err(e) => {
                        log_error(&e.clone().with_context(format!("入站消息 {} -> {}", source, target)));
                        notices.warning(format!("Translation failed: {}", e));
                    }
                }
                pending.set(pending.get() - 1);
            }));
        }

        tasks
    }

    pub fn overlays(&self) -> &OverlayController {
        &self.overlays
    }

    /// 尚未完成的翻译任务数
    pub fn pending(&self) -> usize {
        self.pending.get()
    }
}
