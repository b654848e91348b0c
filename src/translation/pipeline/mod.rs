//! 消息翻译管道
//!
//! 观察器发现新消息，规整器提取文本，处理器翻译并附加翻译层。

pub mod normalizer;
pub mod observer;
pub mod processor;

// 重新导出主要类型
pub use normalizer::{is_own_node, TextNormalizer};
pub use observer::{ChangeObserver, MessageEvent, ObserverState};
pub use processor::MessageProcessor;
