//! 页面内容层
//!
//! 翻译层、出站拦截、会话状态机、临时通知、快捷操作和页面小部件。
//! 这些组件都运行在页面上下文的单线程事件循环上。

pub mod interceptor;
pub mod notice;
pub mod overlay;
pub mod session;
pub mod shortcuts;
pub mod widgets;

pub use interceptor::OutboundInterceptor;
pub use notice::{notice_channel, Notice, NoticeLevel, NoticeSender};
pub use overlay::{is_showing_translation, AttachOutcome, OverlayController};
pub use session::{Session, SessionState};
