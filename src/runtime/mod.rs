//! # 跨上下文运行时
//!
//! 后台、页面和弹出页三个上下文互不共享内存，只通过异步消息协作：
//!
//! - `messages` - 线上消息类型与翻译响应适配器
//! - `channel` - 按请求编号关联的请求/响应通道，以及带确认的推送通道
//! - `background` - 后台工作者与设置存储
//! - `provider` - 外部翻译服务

pub mod background;
pub mod channel;
pub mod messages;
pub mod provider;

pub use background::{BackgroundWorker, SettingsStore};
pub use channel::{push_channel, BackgroundPort, IncomingPush, PushSender, RuntimeChannel};
pub use messages::{parse_translate_reply, Ack, PagePush, RuntimeRequest};
pub use provider::{MyMemoryProvider, TranslationProvider};
