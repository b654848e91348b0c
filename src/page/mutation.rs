//! 变更通知总线
//!
//! 订阅者按子树登记，每一次宿主操作产生一批记录，
//! 只投递给根节点是记录目标（或其祖先）的订阅者。

use markup5ever_rcdom::Handle;
use tokio::sync::mpsc;

use crate::parsers::html::dom::is_ancestor_or_self;

/// 变更类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    ChildList,
    CharacterData,
    Attributes { name: String },
}

/// 单条变更记录
#[derive(Debug, Clone)]
pub struct MutationRecord {
    pub kind: MutationKind,
    pub target: Handle,
    pub added: Vec<Handle>,
    pub removed: Vec<Handle>,
}

impl MutationRecord {
    pub fn child_list(target: Handle, added: Vec<Handle>, removed: Vec<Handle>) -> Self {
        Self {
            kind: MutationKind::ChildList,
            target,
            added,
            removed,
        }
    }
}

pub type MutationBatch = Vec<MutationRecord>;

/// 订阅标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    root: Handle,
    sender: mpsc::UnboundedSender<MutationBatch>,
}

#[derive(Default)]
pub struct MutationBus {
    next_id: u64,
    subscribers: Vec<Subscriber>,
}

impl MutationBus {
    pub fn subscribe(&mut self, root: Handle) -> (SubscriptionId, mpsc::UnboundedReceiver<MutationBatch>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.subscribers.push(Subscriber { id, root, sender });
        (id, receiver)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        before != self.subscribers.len()
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// 投递一批记录；接收端已关闭的订阅会被清理
    pub fn publish(&mut self, batch: &[MutationRecord]) {
        self.subscribers.retain(|subscriber| {
            let scoped: MutationBatch = batch
                .iter()
                .filter(|record| is_ancestor_or_self(&subscriber.root, &record.target))
                .cloned()
                .collect();

            if scoped.is_empty() {
                return !subscriber.sender.is_closed();
            }
            subscriber.sender.send(scoped).is_ok()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::{append_child, new_element};
    use markup5ever_rcdom::RcDom;

    #[test]
    fn test_batches_are_scoped_to_subtree() {
        let dom = RcDom::default();
        let list = new_element(&dom, "div", &[("id", "list")]);
        let other = new_element(&dom, "div", &[("id", "other")]);
        let message = new_element(&dom, "div", &[]);
        append_child(&list, message.clone());

        let mut bus = MutationBus::default();
        let (_, mut list_rx) = bus.subscribe(list.clone());
        let (_, mut other_rx) = bus.subscribe(other.clone());

        bus.publish(&[MutationRecord::child_list(message.clone(), vec![], vec![])]);

        assert_eq!(list_rx.try_recv().unwrap().len(), 1);
        assert!(other_rx.try_recv().is_err());
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let dom = RcDom::default();
        let root = new_element(&dom, "div", &[]);

        let mut bus = MutationBus::default();
        let (id, mut rx) = bus.subscribe(root.clone());
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));

        bus.publish(&[MutationRecord::child_list(root, vec![], vec![])]);
        assert!(rx.try_recv().is_err());
        assert!(bus.is_empty());
    }
}
