// 集成测试公共模块
//
// 提供假聊天应用、脚本化翻译服务、页面构建和异步等待工具

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::LocalSet;

use chat_translator::content::{notice_channel, Notice, NoticeSender, Session};
use chat_translator::page::{DomEvent, EventKind, LivePage, Phase};
use chat_translator::parsers::html::Locator;
use chat_translator::runtime::{BackgroundWorker, RuntimeChannel, SettingsStore, TranslationProvider};
use chat_translator::translation::{
    Settings, TranslationClient, TranslationResult, TranslationService, TranslatorConfig,
    TranslatorError, TranslatorResult,
};

pub const WHATSAPP_URL: &str = "https://web.whatsapp.com/";

// ============================================================================
// 脚本化翻译服务
// ============================================================================

/// 记录调用、可以按文本失败、可以挂起的翻译服务
pub struct MockProvider {
    dictionary: HashMap<String, String>,
    failures: Mutex<HashSet<String>>,
    calls: Arc<AtomicUsize>,
    requests: Mutex<Vec<(String, String, String)>>,
    gate: Option<Arc<Semaphore>>,
}

impl MockProvider {
    pub fn new() -> Self {
        let dictionary = [
            ("hola", "hello"),
            ("Hola amigo", "Hello friend"),
            ("Buenos días a todos", "Good morning everyone"),
            ("¿Cómo estás hoy?", "How are you today?"),
            ("Bonjour tout le monde", "Hello everyone"),
            ("See you tomorrow", "See you tomorrow"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            dictionary,
            failures: Mutex::new(HashSet::new()),
            calls: Arc::new(AtomicUsize::new(0)),
            requests: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// 每次调用都要等到 `Gate::open` 才返回
    pub fn gated(mut self) -> (Self, Gate) {
        let semaphore = Arc::new(Semaphore::new(0));
        self.gate = Some(semaphore.clone());
        (self, Gate(semaphore))
    }

    pub fn failing_on(self, text: &str) -> Self {
        self.failures.lock().insert(text.to_string());
        self
    }

    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }

    pub fn requests(&self) -> Vec<(String, String, String)> {
        self.requests.lock().clone()
    }

    pub fn expected(&self, text: &str, target: &str) -> String {
        self.dictionary
            .get(text)
            .cloned()
            .unwrap_or_else(|| format!("[{}] {}", target, text))
    }
}

#[async_trait]
impl TranslationProvider for MockProvider {
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> TranslatorResult<TranslationResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push((
            text.to_string(),
            source_language.to_string(),
            target_language.to_string(),
        ));

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        if self.failures.lock().contains(text) {
            return Err(TranslatorError::ServiceError(format!(
                "translation service rejected \"{}\"",
                text
            )));
        }

        Ok(TranslationResult {
            translated_text: self.expected(text, target_language),
            detected_language: source_language.to_string(),
            confidence: 0.9,
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// 放行挂起的翻译调用
pub struct Gate(Arc<Semaphore>);

impl Gate {
    pub fn open(&self) {
        self.0.add_permits(1_000);
    }
}

// ============================================================================
// 测试环境
// ============================================================================

/// 一个页面加上完整的后台与翻译服务
pub struct Harness {
    pub page: Rc<LivePage>,
    pub service: TranslationService,
    pub provider: Arc<MockProvider>,
    pub store: SettingsStore,
    pub config: TranslatorConfig,
    pub notices: NoticeSender,
    notice_rx: mpsc::UnboundedReceiver<Notice>,
}

impl Harness {
    /// 必须在 tokio 运行时内创建
    pub fn new(html: &str, url: &str, provider: MockProvider) -> Self {
        let mut config = TranslatorConfig::default();
        config.defaults = Settings {
            target_language: "en".to_string(),
            ..Settings::default()
        };

        let provider = Arc::new(provider);
        let store = SettingsStore::new(config.defaults.clone());
        let (channel, port) = RuntimeChannel::connect(Duration::from_secs(5));
        let _worker = BackgroundWorker::new(provider.clone(), store.clone()).spawn(port);

        let service = TranslationService::new(TranslationClient::new(channel), config.cache_capacity);
        let page = LivePage::from_html(html, url).expect("page should parse");
        let (notices, notice_rx) = notice_channel();

        Self {
            page,
            service,
            provider,
            store,
            config,
            notices,
            notice_rx,
        }
    }

    pub fn whatsapp(messages: &[&str], provider: MockProvider) -> Self {
        Self::new(&whatsapp_page(messages), WHATSAPP_URL, provider)
    }

    pub fn session(&self) -> Rc<Session> {
        Session::new(
            self.page.clone(),
            self.service.clone(),
            &self.config,
            self.notices.clone(),
        )
        .expect("session should be created")
    }

    pub fn calls(&self) -> usize {
        self.provider.call_counter().load(Ordering::SeqCst)
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        let mut notices = Vec::new();
        while let Ok(notice) = self.notice_rx.try_recv() {
            notices.push(notice);
        }
        notices
    }

    pub fn query(&self, selector: &str) -> Option<markup5ever_rcdom::Handle> {
        self.page.query(&locator(selector))
    }

    pub fn count(&self, selector: &str) -> usize {
        self.page.query_all(&locator(selector)).len()
    }

    /// 向消息列表追加一条入站消息
    pub fn receive(&self, text: &str) -> markup5ever_rcdom::Handle {
        let list = self.query("#list").expect("message list should exist");
        self.page
            .append_html(&list, &message_html(text))
            .expect("message should parse")
            .remove(0)
    }
}

// ============================================================================
// 假聊天应用
// ============================================================================

/// 模拟宿主聊天应用：框架状态由 input 事件同步，发送读框架状态
pub struct FakeChatApp {
    pub sent: Rc<RefCell<Vec<String>>>,
    pub attempts: Rc<RefCell<usize>>,
    model: Rc<RefCell<String>>,
    compose: markup5ever_rcdom::Handle,
}

impl FakeChatApp {
    pub fn install(page: &Rc<LivePage>) -> Self {
        Self::install_with(page, false)
    }

    /// 框架拒绝程序写入：合成的 input 事件会把输入框恢复成旧值
    pub fn install_rejecting(page: &Rc<LivePage>) -> Self {
        Self::install_with(page, true)
    }

    fn install_with(page: &Rc<LivePage>, reject_programmatic: bool) -> Self {
        let compose = page.query(&locator("#compose")).expect("compose input should exist");
        let send = page.query(&locator("#send")).expect("send button should exist");

        let sent = Rc::new(RefCell::new(Vec::new()));
        let attempts = Rc::new(RefCell::new(0));
        let model = Rc::new(RefCell::new(String::new()));

        {
            let weak = Rc::downgrade(page);
            let model = model.clone();
            let compose_node = compose.clone();
            page.add_listener(&compose, EventKind::Input, Phase::Bubble, move |event: &mut DomEvent| {
                let Some(page) = weak.upgrade() else { return };
                if reject_programmatic && event.synthetic {
                    let previous = model.borrow().clone();
                    page.write_value(&compose_node, &previous);
                } else {
                    *model.borrow_mut() = page.read_value(&compose_node);
                }
            });
        }

        let do_send = {
            let weak = Rc::downgrade(page);
            let model = model.clone();
            let sent = sent.clone();
            let attempts = attempts.clone();
            let compose_node = compose.clone();
            Rc::new(move || {
                *attempts.borrow_mut() += 1;
                let text = model.borrow().trim().to_string();
                if text.is_empty() {
                    return;
                }
                sent.borrow_mut().push(text);
                model.borrow_mut().clear();
                if let Some(page) = weak.upgrade() {
                    page.write_value(&compose_node, "");
                }
            })
        };

        {
            let do_send = do_send.clone();
            page.add_listener(&send, EventKind::Click, Phase::Bubble, move |event: &mut DomEvent| {
                if !event.default_prevented {
                    do_send();
                }
            });
        }
        {
            let do_send = do_send.clone();
            page.add_listener(&compose, EventKind::KeyDown, Phase::Bubble, move |event: &mut DomEvent| {
                let plain_enter = event.key.as_ref().map(|k| k.is_plain_enter()).unwrap_or(false);
                if plain_enter && !event.default_prevented {
                    do_send();
                }
            });
        }

        Self {
            sent,
            attempts,
            model,
            compose,
        }
    }

    /// 用户在输入框中输入
    pub fn type_text(&self, page: &LivePage, text: &str) {
        page.write_value(&self.compose, text);
        page.dispatch(DomEvent::input(self.compose.clone()));
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.borrow().clone()
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.borrow()
    }

    pub fn model(&self) -> String {
        self.model.borrow().clone()
    }

    pub fn compose(&self) -> markup5ever_rcdom::Handle {
        self.compose.clone()
    }
}

// ============================================================================
// 页面构建与等待
// ============================================================================

pub fn locator(selector: &str) -> Locator {
    Locator::parse(selector).expect("selector should parse")
}

pub fn message_html(text: &str) -> String {
    format!(
        r#"<div class="message-in"><div class="copyable-text"><span data-testid="msg-text">{}</span></div></div>"#,
        text
    )
}

/// WhatsApp 结构的聊天页面
pub fn whatsapp_page(messages: &[&str]) -> String {
    let items: String = messages.iter().map(|m| message_html(m)).collect();
    format!(
        r#"<!DOCTYPE html><html><head><title>WhatsApp</title></head><body><div id="app">
<div id="list" data-testid="conversation-panel-messages">{}</div>
<footer><div id="compose" contenteditable="true" data-tab="10"></div><button id="send" data-testid="send"><span id="send-icon" data-icon="send"></span></button></footer>
</div></body></html>"#,
        items
    )
}

/// 在 `LocalSet` 中运行页面上下文的测试代码
pub async fn run_local<F: Future>(future: F) -> F::Output {
    LocalSet::new().run_until(future).await
}

/// 让本地任务与后台任务都跑一会儿
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
}

/// 等待条件成立，最多约两秒
pub async fn wait_until<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// 通知中是否有包含指定文本的消息
pub fn has_notice(notices: &[Notice], needle: &str) -> bool {
    notices.iter().any(|n| n.text().contains(needle))
}
