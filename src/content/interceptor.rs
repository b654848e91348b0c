//! 出站拦截器
//!
//! 在文档上以捕获阶段监听发送按钮点击与输入框回车。触发时：
//! 阻止原生发送，翻译输入框内容，写回译文并通知宿主框架，
//! 读回确认宿主已接受新值后，原样重放一次触发动作。
//! 翻译失败时绝不自动发送，原文保留在输入框中。

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use markup5ever_rcdom::Handle;
use tracing::{debug, info};

use super::notice::NoticeSender;
use crate::page::{DomEvent, EventKind, KeyInfo, ListenerId, LivePage, Phase};
use crate::parsers::html::dom::{ancestors_and_self, has_class};
use crate::platform::PlatformProfile;
use crate::translation::config::constants::INPUT_HELPER_CLASS;
use crate::translation::config::Settings;
use crate::translation::core::{language_name, TranslationService};
use crate::translation::error::helpers::log_error;
use crate::translation::error::{TranslatorError, TranslatorResult};

/// 触发发送的动作
#[derive(Debug, Clone)]
enum Trigger {
    /// 点击发送控件（记录实际命中的节点）
    SendControl(Handle),
    /// 在输入框中按下回车
    Enter,
}

struct InterceptContext {
    page: Weak<LivePage>,
    profile: Rc<PlatformProfile>,
    service: TranslationService,
    settings: Rc<RefCell<Settings>>,
    notices: NoticeSender,
    resend_settle: Duration,
    pending: Cell<bool>,
    resending: Cell<bool>,
}

/// 出站拦截器
pub struct OutboundInterceptor {
    page: Rc<LivePage>,
    context: Rc<InterceptContext>,
    listeners: RefCell<Vec<ListenerId>>,
    helper: RefCell<Option<Handle>>,
}

impl OutboundInterceptor {
    pub fn new(
        page: Rc<LivePage>,
        profile: Rc<PlatformProfile>,
        service: TranslationService,
        settings: Rc<RefCell<Settings>>,
        notices: NoticeSender,
        resend_settle: Duration,
    ) -> Self {
        let context = Rc::new(InterceptContext {
            page: Rc::downgrade(&page),
            profile,
            service,
            settings,
            notices,
            resend_settle,
            pending: Cell::new(false),
            resending: Cell::new(false),
        });
        Self {
            page,
            context,
            listeners: RefCell::new(Vec::new()),
            helper: RefCell::new(None),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.listeners.borrow().is_empty()
    }

    /// 是否有拦截正在进行
    pub fn is_pending(&self) -> bool {
        self.context.pending.get()
    }

    /// 开始拦截，已开始时不做任何事
    pub fn start(&self) {
        if self.is_active() {
            return;
        }

        let document = self.page.document();

        let ctx = Rc::clone(&self.context);
        let click = self.page.add_listener(
            &document,
            EventKind::Click,
            Phase::Capture,
            move |event: &mut DomEvent| ctx.on_click(event),
        );

        let ctx = Rc::clone(&self.context);
        let keydown = self.page.add_listener(
            &document,
            EventKind::KeyDown,
            Phase::Capture,
            move |event: &mut DomEvent| ctx.on_keydown(event),
        );

        self.listeners.borrow_mut().extend([click, keydown]);
        self.insert_helper();
        info!("出站拦截已开启 ({})", self.context.profile.platform);
    }

    /// 停止拦截并移除辅助按钮，可重复调用
    pub fn stop(&self) {
        let listeners: Vec<ListenerId> = self.listeners.borrow_mut().drain(..).collect();
        if listeners.is_empty() {
            return;
        }
        for id in listeners {
            self.page.remove_listener(id);
        }
        if let Some(helper) = self.helper.borrow_mut().take() {
            self.page.remove(&helper);
        }
        info!("出站拦截已关闭");
    }

    // 在输入框之后插入手动翻译按钮
    fn insert_helper(&self) {
        let Some(compose) = self.page.query(&self.context.profile.compose_input) else {
            debug!("暂未找到输入框，不插入翻译按钮");
            return;
        };
        let button = self.page.create_element(
            "button",
            &[
                ("class", INPUT_HELPER_CLASS),
                ("type", "button"),
                ("title", "Translate message"),
            ],
        );
        self.page.set_text(&button, "🌐");
        if self.page.insert_after(&compose, button.clone()) {
            *self.helper.borrow_mut() = Some(button);
        }
    }
}

impl Drop for OutboundInterceptor {
    fn drop(&mut self) {
        self.stop();
    }
}

impl InterceptContext {
    fn on_click(self: &Rc<Self>, event: &mut DomEvent) {
        if event.synthetic && self.resending.get() {
            return;
        }
        let Some(page) = self.page.upgrade() else {
            return;
        };

        if closest(&event.target, |n| has_class(n, INPUT_HELPER_CLASS)).is_some() {
            event.stop_propagation();
            self.translate_in_place(&page);
            return;
        }

        let Some(control) = closest(&event.target, |n| self.profile.send_control.matches(n)) else {
            return;
        };
        let Some(compose) = page.query(&self.profile.compose_input) else {
            return;
        };
        self.intercept(&page, event, compose, Trigger::SendControl(control));
    }

    fn on_keydown(self: &Rc<Self>, event: &mut DomEvent) {
        if event.synthetic && self.resending.get() {
            return;
        }
        if !event.key.as_ref().is_some_and(KeyInfo::is_plain_enter) {
            return;
        }
        let Some(page) = self.page.upgrade() else {
            return;
        };
        let Some(compose) = closest(&event.target, |n| self.profile.compose_input.matches(n)) else {
            return;
        };
        self.intercept(&page, event, compose, Trigger::Enter);
    }

    fn intercept(self: &Rc<Self>, page: &LivePage, event: &mut DomEvent, compose: Handle, trigger: Trigger) {
        if self.pending.get() {
            event.prevent_default();
            event.stop_propagation();
            debug!("已有拦截在进行，忽略本次发送");
            return;
        }

        let text = page.read_value(&compose).trim().to_string();
        if text.is_empty() {
            return;
        }

        event.prevent_default();
        event.stop_propagation();
        self.pending.set(true);

        let ctx = Rc::clone(self);
        tokio::task::spawn_local(async move {
            ctx.translate_and_resend(compose, text, trigger).await;
            ctx.pending.set(false);
        });
    }

    async fn translate_and_resend(&self, compose: Handle, text: String, trigger: Trigger) {
        let (source, target) = self.settings.borrow().language_pair();

        let translated = match self.service.translate(&text, &source, &target).await {
            Ok(result) => result.translated_text,
            Err(e) => {
                log_error(&e);
                self.notices.error(format!("Translation failed: {}", e));
                return;
            }
        };

        let Some(page) = self.page.upgrade() else {
            return;
        };
        match self.replace_and_resend(&page, &compose, &translated, trigger).await {
            Ok(()) => self
                .notices
                .success(format!("Message translated to {}", language_name(&target))),
            Err(e) => {
                log_error(&e);
                self.notices.error(format!("Translated message was not sent: {}", e));
            }
        }
    }

    async fn replace_and_resend(
        &self,
        page: &LivePage,
        compose: &Handle,
        translated: &str,
        trigger: Trigger,
    ) -> TranslatorResult<()> {
        if !page.contains(compose) {
            return Err(TranslatorError::InterceptError("输入框已不在页面上".to_string()));
        }

        page.write_value(compose, translated);
        page.dispatch(DomEvent::input(compose.clone()).synthesized());
        if !self.resend_settle.is_zero() {
            tokio::time::sleep(self.resend_settle).await;
        }

        let current = page.read_value(compose);
        if current.trim() != translated.trim() {
            return Err(TranslatorError::InterceptError(format!(
                "宿主没有接受译文，输入框当前为 \"{}\"",
                current.trim()
            )));
        }

        let resend = match trigger {
            Trigger::SendControl(control) if page.contains(&control) => DomEvent::click(control),
            Trigger::SendControl(_) => {
                let control = page.query(&self.profile.send_control).ok_or_else(|| {
                    TranslatorError::InterceptError("发送按钮已不在页面上".to_string())
                })?;
                DomEvent::click(control)
            }
            Trigger::Enter => DomEvent::keydown(compose.clone(), KeyInfo::new("Enter")),
        };

        self.resending.set(true);
        page.dispatch(resend.synthesized());
        self.resending.set(false);
        debug!("已重放发送动作");
        Ok(())
    }

    // 翻译输入框内容但不发送
    fn translate_in_place(self: &Rc<Self>, page: &LivePage) {
        if self.pending.get() {
            return;
        }
        let Some(compose) = page.query(&self.profile.compose_input) else {
            self.notices.warning("Message input not found");
            return;
        };
        let text = page.read_value(&compose).trim().to_string();
        if text.is_empty() {
            self.notices.warning("Please type a message first");
            return;
        }

        self.pending.set(true);
        let ctx = Rc::clone(self);
        tokio::task::spawn_local(async move {
            let (source, target) = ctx.settings.borrow().language_pair();
            match ctx.service.translate(&text, &source, &target).await {
                Ok(result) => {
                    if let Some(page) = ctx.page.upgrade() {
                        page.write_value(&compose, &result.translated_text);
                        page.dispatch(DomEvent::input(compose.clone()).synthesized());
                        ctx.notices
                            .success(format!("Translated to {}", language_name(&target)));
                    }
                }
                Err(e) => {
                    log_error(&e);
                    ctx.notices.error(format!("Translation failed: {}", e));
                }
            }
            ctx.pending.set(false);
        });
    }
}

// 最近的满足条件的祖先（含自身）
fn closest<F>(node: &Handle, predicate: F) -> Option<Handle>
where
    F: Fn(&Handle) -> bool,
{
    ancestors_and_self(node).into_iter().find(|n| predicate(n))
}
