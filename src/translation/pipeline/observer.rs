//! 消息变更观察器
//!
//! 定位消息列表容器，先扫描已有消息，再订阅容器子树的变更批次，
//! 对每个新增的元素节点发出一个消息事件。

use std::cell::RefCell;
use std::rc::Rc;

use markup5ever_rcdom::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::normalizer::is_own_node;
use crate::page::{LivePage, MutationKind, SubscriptionId};
use crate::parsers::html::dom::is_element;
use crate::platform::PlatformProfile;
use crate::translation::error::{TranslatorError, TranslatorResult};

/// 观察器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverState {
    Stopped,
    Observing,
}

/// 消息事件
#[derive(Debug, Clone)]
pub struct MessageEvent {
    /// 新增（或初次扫描到）的子树根
    pub root: Handle,
    /// 是否来自启动时的初次扫描
    pub initial: bool,
}

struct ActiveObservation {
    subscription: SubscriptionId,
    task: JoinHandle<()>,
}

/// 变更观察器
pub struct ChangeObserver {
    page: Rc<LivePage>,
    profile: Rc<PlatformProfile>,
    active: RefCell<Option<ActiveObservation>>,
}

impl ChangeObserver {
    pub fn new(page: Rc<LivePage>, profile: Rc<PlatformProfile>) -> Self {
        Self {
            page,
            profile,
            active: RefCell::new(None),
        }
    }

    pub fn state(&self) -> ObserverState {
        if self.active.borrow().is_some() {
            ObserverState::Observing
        } else {
            ObserverState::Stopped
        }
    }

    pub fn is_observing(&self) -> bool {
        self.state() == ObserverState::Observing
    }

    /// 开始观察
    ///
    /// 找不到消息列表容器时返回 `ContainerNotFound`，状态保持不变。
    /// 已在观察时不做任何事。返回初次扫描发出的事件数。
    /// 需要在 `LocalSet` 中调用。
    pub fn start<F>(&self, on_event: F) -> TranslatorResult<usize>
    where
        F: Fn(MessageEvent) + 'static,
    {
        if self.is_observing() {
            debug!("观察器已在运行");
            return Ok(0);
        }

        let container = self.page.query(&self.profile.message_list).ok_or_else(|| {
            TranslatorError::ContainerNotFound(format!(
                "{} 页面上没有匹配 {} 的消息列表",
                self.profile.platform,
                self.profile.message_list.as_str()
            ))
        })?;

        let existing = self.profile.message_item.query_all(&container);
        let initial = existing.len();
        for root in existing {
            if !is_own_node(&root) {
                on_event(MessageEvent { root, initial: true });
            }
        }

        let (subscription, mut rx) = self.page.subscribe(&container);
        let page = Rc::downgrade(&self.page);
        let task = tokio::task::spawn_local(async move {
            while let Some(batch) = rx.recv().await {
                let Some(page) = page.upgrade() else {
                    break;
                };
                for record in batch {
                    if record.kind != MutationKind::ChildList {
                        continue;
                    }
                    for node in record.added {
                        if !is_element(&node) || is_own_node(&node) {
                            continue;
                        }
                        // 批次处理前已被移除的节点不再处理
                        if !page.contains(&node) {
                            continue;
                        }
                        on_event(MessageEvent {
                            root: node,
                            initial: false,
                        });
                    }
                }
            }
        });

        *self.active.borrow_mut() = Some(ActiveObservation { subscription, task });
        info!("开始观察 {} 消息列表，已有 {} 条消息", self.profile.platform, initial);
        Ok(initial)
    }

    /// 停止观察，可重复调用
    pub fn stop(&self) {
        if let Some(active) = self.active.borrow_mut().take() {
            self.page.disconnect(active.subscription);
            active.task.abort();
            info!("停止观察 {} 消息列表", self.profile.platform);
        }
    }
}

impl Drop for ChangeObserver {
    fn drop(&mut self) {
        self.stop();
    }
}
