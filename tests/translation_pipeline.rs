//! 消息翻译管道集成测试
//!
//! 测试初次扫描、新消息观察、翻译层附加与会话对观察器的控制

use chat_translator::content::{is_showing_translation, SessionState};
use chat_translator::page::DomEvent;
use chat_translator::parsers::html::dom::text_content;
use chat_translator::runtime::PagePush;
use chat_translator::translation::{MessageEvent, ObserverState, SettingsPatch};

#[allow(dead_code)]
mod common {
    include!("common/mod.rs");
}

use common::{has_notice, run_local, settle, wait_until, Harness, MockProvider};

const OVERLAY: &str = ".translation-overlay";

/// 测试启动时已有的消息被翻译，过短的消息被跳过
#[tokio::test]
async fn test_initial_scan_attaches_overlays() {
    run_local(async {
        let h = Harness::whatsapp(&["Hola amigo", "ok", "12345"], MockProvider::new());
        let session = h.session();
        session.start();

        assert!(wait_until(|| h.count(OVERLAY) == 1).await);
        assert_eq!(h.calls(), 1);

        let overlay = h.query(OVERLAY).unwrap();
        assert!(text_content(&overlay).contains("Hello friend"));
        assert!(is_showing_translation(&overlay));
        assert_eq!(session.processor().pending(), 0);
    })
    .await;
}

/// 测试新消息被翻译，系统自身插入的节点不会再触发处理
#[tokio::test]
async fn test_new_messages_are_translated_once() {
    run_local(async {
        let h = Harness::whatsapp(&["Hola amigo"], MockProvider::new());
        let session = h.session();
        session.start();
        assert!(wait_until(|| h.count(OVERLAY) == 1).await);

        h.receive("Bonjour tout le monde");
        assert!(wait_until(|| h.count(OVERLAY) == 2).await);

        settle().await;
        settle().await;
        assert_eq!(h.count(OVERLAY), 2);
        assert_eq!(h.calls(), 2);
        assert_eq!(h.service.stats().cache_hits, 0);
    })
    .await;
}

/// 测试相同文本的多条消息只调用一次外部服务
#[tokio::test]
async fn test_duplicate_messages_share_one_call() {
    run_local(async {
        let (provider, gate) = MockProvider::new().gated();
        let h = Harness::whatsapp(&[], provider);
        let session = h.session();
        session.start();

        h.receive("Buenos días a todos");
        h.receive("Buenos días a todos");
        settle().await;
        assert_eq!(h.calls(), 1);

        gate.open();
        assert!(wait_until(|| h.count(OVERLAY) == 2).await);
        assert_eq!(h.calls(), 1);
    })
    .await;
}

/// 测试翻译与原文相同时不附加翻译层
#[tokio::test]
async fn test_identical_translation_has_no_overlay() {
    run_local(async {
        let h = Harness::whatsapp(&[], MockProvider::new());
        let session = h.session();
        session.start();

        h.receive("See you tomorrow");
        assert!(wait_until(|| h.calls() == 1 && session.processor().pending() == 0).await);
        settle().await;
        assert_eq!(h.count(OVERLAY), 0);
    })
    .await;
}

/// 测试点击切换按钮在译文与原文之间切换
#[tokio::test]
async fn test_overlay_toggle() {
    run_local(async {
        let h = Harness::whatsapp(&["Hola amigo"], MockProvider::new());
        let session = h.session();
        session.start();
        assert!(wait_until(|| h.count(OVERLAY) == 1).await);

        let button = h.query(".toggle-btn").unwrap();
        let overlay = h.query(OVERLAY).unwrap();

        h.page.dispatch(DomEvent::click(button.clone()));
        assert!(!is_showing_translation(&overlay));
        assert!(text_content(&overlay).contains("Hola amigo"));
        assert!(text_content(&button).contains("Show Translation"));

        h.page.dispatch(DomEvent::click(button));
        assert!(is_showing_translation(&overlay));
        assert!(text_content(&overlay).contains("Hello friend"));
    })
    .await;
}

/// 测试只改语言对时不重建订阅，之后的消息使用新的语言对
#[tokio::test]
async fn test_language_change_keeps_subscription() {
    run_local(async {
        let h = Harness::whatsapp(&[], MockProvider::new());
        let session = h.session();
        session.start();
        assert_eq!(h.page.subscription_count(), 1);

        session.update(&SettingsPatch {
            target_language: Some("fr".to_string()),
            ..Default::default()
        });
        assert_eq!(h.page.subscription_count(), 1);
        assert_eq!(session.observer().state(), ObserverState::Observing);

        h.receive("Hola amigo");
        assert!(wait_until(|| h.count(OVERLAY) == 1).await);
        let requests = h.provider.requests();
        assert_eq!(requests.last().unwrap().2, "fr");
    })
    .await;
}

/// 测试关闭后停止观察，重新开启时不重复附加翻译层
#[tokio::test]
async fn test_disable_and_reenable() {
    run_local(async {
        let mut h = Harness::whatsapp(&["Hola amigo"], MockProvider::new());
        let session = h.session();
        session.start();
        assert!(wait_until(|| h.count(OVERLAY) == 1).await);

        let ack = session.handle_push(PagePush::ToggleTranslation { enabled: false });
        assert!(ack.success);
        assert_eq!(session.state(), SessionState::Disabled);
        assert_eq!(session.observer().state(), ObserverState::Stopped);
        assert!(!session.interceptor().is_active());
        assert_eq!(h.page.subscription_count(), 0);
        assert!(has_notice(&h.drain_notices(), "Translation disabled"));

        h.receive("Bonjour tout le monde");
        settle().await;
        assert_eq!(h.count(OVERLAY), 1);
        assert_eq!(h.calls(), 1);

        session.handle_push(PagePush::ToggleTranslation { enabled: true });
        assert_eq!(session.state(), SessionState::Enabled);
        assert!(wait_until(|| h.count(OVERLAY) == 2).await);
        settle().await;
        // 已翻译的消息命中缓存且不会重复附加
        assert_eq!(h.count(OVERLAY), 2);
        assert_eq!(h.calls(), 2);
    })
    .await;
}

/// 测试翻译完成前消息被移除时安静地丢弃结果
#[tokio::test]
async fn test_removed_message_drops_result() {
    run_local(async {
        let (provider, gate) = MockProvider::new().gated();
        let h = Harness::whatsapp(&[], provider);
        let session = h.session();
        session.start();

        let message = h.receive("Hola amigo");
        settle().await;
        h.page.remove(&message);

        gate.open();
        assert!(wait_until(|| session.processor().pending() == 0).await);
        assert_eq!(h.count(OVERLAY), 0);
    })
    .await;
}

/// 测试自动翻译入站关闭时只开启出站拦截
#[tokio::test]
async fn test_incoming_disabled_keeps_interceptor() {
    run_local(async {
        let h = Harness::whatsapp(&["Hola amigo"], MockProvider::new());
        let session = h.session();
        session.update(&SettingsPatch {
            auto_incoming: Some(false),
            ..Default::default()
        });
        session.start();

        settle().await;
        assert_eq!(session.observer().state(), ObserverState::Stopped);
        assert!(session.interceptor().is_active());
        assert_eq!(h.count(OVERLAY), 0);
        assert_eq!(h.count(".translation-input-btn"), 1);
    })
    .await;
}

/// 测试翻译层不为每条消息登记监听器，宿主移除消息后没有残留
#[tokio::test]
async fn test_overlays_do_not_accumulate_listeners() {
    run_local(async {
        let h = Harness::whatsapp(&[], MockProvider::new());
        let session = h.session();
        session.start();
        let baseline = h.page.listener_count();

        let messages: Vec<_> = (0..20)
            .map(|i| h.receive(&format!("Mensaje número {} de prueba", i)))
            .collect();
        assert!(wait_until(|| h.count(OVERLAY) == 20).await);
        assert_eq!(h.page.listener_count(), baseline);

        for message in &messages {
            h.page.remove(message);
        }
        assert_eq!(h.count(OVERLAY), 0);
        assert_eq!(h.page.listener_count(), baseline);
    })
    .await;
}

/// 测试重新扫描时已有翻译层的消息不再请求翻译
#[tokio::test]
async fn test_annotated_message_is_not_retranslated() {
    run_local(async {
        let h = Harness::whatsapp(&["Hola amigo"], MockProvider::new());
        let session = h.session();
        session.start();
        assert!(wait_until(|| h.count(OVERLAY) == 1).await);
        assert!(wait_until(|| session.processor().pending() == 0).await);

        let message = h.query(".message-in").unwrap();
        let tasks = session.processor().process(MessageEvent {
            root: message,
            initial: true,
        });
        assert!(tasks.is_empty());
        settle().await;

        let stats = h.service.stats();
        assert_eq!(stats.cache_misses, 1);
        assert_eq!(stats.cache_hits, 0);
        assert_eq!(h.calls(), 1);
    })
    .await;
}

/// 测试关闭翻译层后，重新开启翻译也不会再附加
#[tokio::test]
async fn test_dismissed_overlay_stays_dismissed() {
    run_local(async {
        let h = Harness::whatsapp(&["Hola amigo"], MockProvider::new());
        let session = h.session();
        session.start();
        assert!(wait_until(|| h.count(OVERLAY) == 1).await);

        let dismiss = h.query(".translation-dismiss").unwrap();
        h.page.dispatch(DomEvent::click(dismiss));
        assert_eq!(h.count(OVERLAY), 0);

        session.set_enabled(false);
        session.set_enabled(true);
        settle().await;
        assert_eq!(h.count(OVERLAY), 0);
        assert_eq!(h.calls(), 1);
    })
    .await;
}
