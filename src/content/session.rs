//! 会话状态机
//!
//! 持有设置快照，按设置启动或停止观察器与拦截器。
//! 只在实际状态与期望状态不一致时才启停组件，
//! 因此只改语言对的推送不会重建观察器的订阅。

use std::cell::RefCell;
use std::rc::Rc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::interceptor::OutboundInterceptor;
use super::notice::NoticeSender;
use super::overlay::OverlayController;
use super::shortcuts;
use super::widgets;
use crate::page::{DomEvent, ListenerId, LivePage};
use crate::platform::PlatformProfile;
use crate::runtime::channel::IncomingPush;
use crate::runtime::messages::{Ack, PagePush};
use crate::translation::config::{Settings, SettingsPatch, TranslatorConfig};
use crate::translation::core::TranslationService;
use crate::translation::error::helpers::log_error;
use crate::translation::error::{TranslatorError, TranslatorResult};
use crate::translation::pipeline::{ChangeObserver, MessageProcessor, TextNormalizer};

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disabled,
    Enabled,
}

/// 页面会话
pub struct Session {
    pub(super) page: Rc<LivePage>,
    pub(super) profile: Rc<PlatformProfile>,
    pub(super) settings: Rc<RefCell<Settings>>,
    pub(super) service: TranslationService,
    pub(super) notices: NoticeSender,
    pub(super) normalizer: TextNormalizer,
    observer: ChangeObserver,
    processor: Rc<MessageProcessor>,
    interceptor: OutboundInterceptor,
    shortcut_listeners: RefCell<Vec<ListenerId>>,
}

impl Session {
    /// 为页面创建会话，平台由页面地址决定；创建后尚未启动
    pub fn new(
        page: Rc<LivePage>,
        service: TranslationService,
        config: &TranslatorConfig,
        notices: NoticeSender,
    ) -> TranslatorResult<Rc<Self>> {
        let profile = Rc::new(PlatformProfile::resolve(page.url())?);
        let settings = Rc::new(RefCell::new(config.defaults.clone()));
        let normalizer = TextNormalizer::new(config.min_text_chars);

        let processor = Rc::new(MessageProcessor::new(
            Rc::clone(&profile),
            normalizer.clone(),
            service.clone(),
            OverlayController::new(Rc::clone(&page)),
            Rc::clone(&settings),
            notices.clone(),
        ));
        let observer = ChangeObserver::new(Rc::clone(&page), Rc::clone(&profile));
        let interceptor = OutboundInterceptor::new(
            Rc::clone(&page),
            Rc::clone(&profile),
            service.clone(),
            Rc::clone(&settings),
            notices.clone(),
            config.resend_settle(),
        );

        Ok(Rc::new(Self {
            page,
            profile,
            settings,
            service,
            notices,
            normalizer,
            observer,
            processor,
            interceptor,
            shortcut_listeners: RefCell::new(Vec::new()),
        }))
    }

    /// 从后台读取设置后启动，读取失败时沿用当前快照
    pub async fn initialize(self: &Rc<Self>) {
        if let Err(e) = self.refresh_settings().await {
            warn!("无法读取设置，使用默认设置: {}", e);
        }
        self.start();
    }

    /// 按当前快照启动；需要在 `LocalSet` 中调用
    pub fn start(self: &Rc<Self>) {
        if self.shortcut_listeners.borrow().is_empty() {
            let mut ids = shortcuts::install(self);
            ids.extend(widgets::install(self));
            self.shortcut_listeners.borrow_mut().extend(ids);
        }
        self.processor.overlays().install();
        self.reconcile();
    }

    /// 重新读取设置快照
    pub async fn refresh_settings(&self) -> TranslatorResult<()> {
        let settings = self.service.fetch_settings().await?;
        *self.settings.borrow_mut() = settings;
        self.reconcile();
        Ok(())
    }

    pub fn settings(&self) -> Settings {
        self.settings.borrow().clone()
    }

    pub fn state(&self) -> SessionState {
        if self.settings.borrow().enabled {
            SessionState::Enabled
        } else {
            SessionState::Disabled
        }
    }

    pub fn profile(&self) -> &PlatformProfile {
        &self.profile
    }

    pub fn observer(&self) -> &ChangeObserver {
        &self.observer
    }

    pub fn interceptor(&self) -> &OutboundInterceptor {
        &self.interceptor
    }

    pub fn processor(&self) -> &MessageProcessor {
        &self.processor
    }

    /// 整体替换设置快照
    pub fn apply_settings(&self, settings: Settings) {
        *self.settings.borrow_mut() = settings;
        self.reconcile();
    }

    /// 合并部分设置
    pub fn update(&self, patch: &SettingsPatch) {
        self.settings.borrow_mut().apply(patch);
        self.reconcile();
    }

    /// 开关翻译，返回状态是否改变
    pub fn set_enabled(&self, enabled: bool) -> bool {
        let changed = {
            let mut settings = self.settings.borrow_mut();
            let changed = settings.enabled != enabled;
            settings.enabled = enabled;
            changed
        };
        if changed {
            self.reconcile();
        }
        changed
    }

    /// 切换开关，返回新的状态
    pub fn toggle(&self) -> bool {
        let enabled = !self.settings.borrow().enabled;
        self.set_enabled(enabled);
        enabled
    }

    /// 切换开关并发出通知
    pub fn toggle_with_notice(&self) -> bool {
        let enabled = self.toggle();
        if enabled {
            self.notices.info("Translation enabled");
        } else {
            self.notices.info("Translation disabled");
        }
        enabled
    }

    /// 交换语言对
    pub fn swap_languages(&self) -> bool {
        let swapped = self.settings.borrow_mut().swap_languages();
        if swapped {
            self.reconcile();
        }
        swapped
    }

    /// 把文本写入输入框并通知宿主框架，不发送
    pub fn insert_translation(&self, text: &str) -> TranslatorResult<()> {
        let compose = self.page.query(&self.profile.compose_input).ok_or_else(|| {
            TranslatorError::InterceptError(format!(
                "{} 页面上没有匹配 {} 的输入框",
                self.profile.platform,
                self.profile.compose_input.as_str()
            ))
        })?;
        self.page.write_value(&compose, text);
        self.page.dispatch(DomEvent::input(compose).synthesized());
        debug!("已把译文插入输入框");
        Ok(())
    }

    /// 处理一条推送
    pub fn handle_push(&self, push: PagePush) -> Ack {
        match push {
            PagePush::UpdateSettings { settings } => {
                debug!("收到设置更新");
                self.update(&settings);
            }
            PagePush::ToggleTranslation { enabled } => {
                self.set_enabled(enabled);
                if enabled {
                    self.notices.info("Translation enabled");
                } else {
                    self.notices.info("Translation disabled");
                }
            }
        }
        Ack::ok()
    }

    /// 在本地任务中处理推送通道，每条推送处理完后确认
    pub fn serve_pushes(self: &Rc<Self>, mut pushes: mpsc::UnboundedReceiver<IncomingPush>) -> JoinHandle<()> {
        let session = Rc::downgrade(self);
        tokio::task::spawn_local(async move {
            while let Some(push) = pushes.recv().await {
                let Some(session) = session.upgrade() else {
                    break;
                };
                match push.parse() {
                    Ok(message) => {
                        let ack = session.handle_push(message);
                        push.acknowledge(ack);
                    }
                    Err(e) => {
                        log_error(&e);
                        push.acknowledge(Ack { success: false });
                    }
                }
            }
            debug!("推送通道已关闭");
        })
    }

    /// 停止全部组件并移除快捷键
    pub fn shutdown(&self) {
        self.observer.stop();
        self.interceptor.stop();
        self.processor.overlays().uninstall();
        for id in self.shortcut_listeners.borrow_mut().drain(..) {
            self.page.remove_listener(id);
        }
        widgets::remove_all(self);
    }

    // 让组件状态与设置一致
    fn reconcile(&self) {
        let settings = self.settings();

        if settings.incoming_active() {
            if !self.observer.is_observing() {
                let processor = Rc::clone(&self.processor);
                match self.observer.start(move |event| {
                    processor.process(event);
                }) {
                    Ok(initial) => debug!("初次扫描 {} 条消息", initial),
                    Err(e) => log_error(&e),
                }
            }
        } else {
            self.observer.stop();
        }

        if settings.outgoing_active() {
            self.interceptor.start();
        } else {
            self.interceptor.stop();
        }

        widgets::sync_status(self, &settings);

        info!(
            "会话状态: {:?} ({} -> {})",
            self.state(),
            settings.source_language,
            settings.target_language
        );
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}
