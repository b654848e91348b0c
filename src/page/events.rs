//! 页面事件分发
//!
//! 与浏览器一致的两阶段传播：先从根到目标的捕获阶段，再从目标到根的冒泡阶段。
//! 监听器在调用前被复制出登记表，回调中可以安全地增删监听器或再次分发事件。

use std::rc::Rc;

use markup5ever_rcdom::Handle;

use crate::parsers::html::dom::ancestors_and_self;

/// 事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
    DblClick,
    KeyDown,
    Input,
}

/// 监听阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Capture,
    Bubble,
}

/// 键盘信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyInfo {
    pub key: String,
    pub shift: bool,
    pub ctrl: bool,
}

impl KeyInfo {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            ..Default::default()
        }
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    /// 不带 Shift 的回车
    pub fn is_plain_enter(&self) -> bool {
        self.key == "Enter" && !self.shift
    }
}

/// 页面事件
#[derive(Debug, Clone)]
pub struct DomEvent {
    pub kind: EventKind,
    pub target: Handle,
    pub key: Option<KeyInfo>,
    /// 由本系统合成的事件
    pub synthetic: bool,
    pub default_prevented: bool,
    pub propagation_stopped: bool,
}

impl DomEvent {
    pub fn new(kind: EventKind, target: Handle) -> Self {
        Self {
            kind,
            target,
            key: None,
            synthetic: false,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    pub fn click(target: Handle) -> Self {
        Self::new(EventKind::Click, target)
    }

    pub fn dblclick(target: Handle) -> Self {
        Self::new(EventKind::DblClick, target)
    }

    pub fn input(target: Handle) -> Self {
        Self::new(EventKind::Input, target)
    }

    pub fn keydown(target: Handle, key: KeyInfo) -> Self {
        Self {
            key: Some(key),
            ..Self::new(EventKind::KeyDown, target)
        }
    }

    pub fn synthesized(mut self) -> Self {
        self.synthetic = true;
        self
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }
}

pub type Listener = Rc<dyn Fn(&mut DomEvent)>;

/// 监听器标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Registration {
    id: ListenerId,
    node: Handle,
    kind: EventKind,
    phase: Phase,
    callback: Listener,
}

#[derive(Default)]
pub struct EventRegistry {
    next_id: u64,
    registrations: Vec<Registration>,
}

impl EventRegistry {
    pub fn add(&mut self, node: Handle, kind: EventKind, phase: Phase, callback: Listener) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.registrations.push(Registration {
            id,
            node,
            kind,
            phase,
            callback,
        });
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.registrations.len();
        self.registrations.retain(|r| r.id != id);
        before != self.registrations.len()
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// 复制出某节点某阶段的监听器
    pub fn lookup(&self, node: &Handle, kind: EventKind, phase: Phase) -> Vec<Listener> {
        self.registrations
            .iter()
            .filter(|r| r.kind == kind && r.phase == phase && Rc::ptr_eq(&r.node, node))
            .map(|r| r.callback.clone())
            .collect()
    }
}

/// 传播路径：从目标到根
pub fn propagation_path(target: &Handle) -> Vec<Handle> {
    ancestors_and_self(target)
}

/// 按两阶段顺序分发事件
///
/// `lookup` 每次只短暂借用登记表，返回的回调在借用释放后调用。
pub fn dispatch_with<F>(mut event: DomEvent, lookup: F) -> DomEvent
where
    F: Fn(&Handle, EventKind, Phase) -> Vec<Listener>,
{
    let path = propagation_path(&event.target);

    for node in path.iter().rev() {
        for listener in lookup(node, event.kind, Phase::Capture) {
            listener(&mut event);
        }
        if event.propagation_stopped {
            return event;
        }
    }

    for node in path.iter() {
        for listener in lookup(node, event.kind, Phase::Bubble) {
            listener(&mut event);
        }
        if event.propagation_stopped {
            return event;
        }
    }

    event
}
