#![allow(dead_code)]

use async_trait::async_trait;
use auto_signin::actor::{CoordinatorLink, PanelAction, PanelView};
use auto_signin::browser::{
    ButtonInfo, PageDom, PageLoad, PageLoads, PanelEvents, TabController, TabId,
};
use auto_signin::config::Config;
use auto_signin::coordinator::Coordinator;
use auto_signin::notify::{Notice, Notifier};
use auto_signin::schedule::ManualClock;
use auto_signin::server::protocol::{CoordinatorRequest, Reply};
use auto_signin::state::{MemoryStateStore, Timestamps};
use auto_signin::{Result, SignInError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub const NOW: i64 = 1_700_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabCall {
    Find(String),
    Activate(TabId),
    Open(String),
    Close(TabId),
}

/// Tab controller that records calls. `existing` is returned by `find_tab`.
#[derive(Default)]
pub struct FakeTabs {
    pub calls: Mutex<Vec<TabCall>>,
    pub existing: Mutex<Option<TabId>>,
    pub fail_open: bool,
    opened: AtomicUsize,
    focus_loads: Mutex<Option<(PageLoads, Arc<dyn PageDom>)>>,
}

impl FakeTabs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_open: true,
            ..Self::default()
        }
    }

    pub fn with_existing(tab: &str) -> Self {
        let tabs = Self::default();
        *tabs.existing.lock().unwrap() = Some(TabId::new(tab));
        tabs
    }

    /// Reports `page` as focused on every `activate`, like the Chrome controller.
    pub fn forward_focus(&self, tx: PageLoads, page: Arc<dyn PageDom>) {
        *self.focus_loads.lock().unwrap() = Some((tx, page));
    }

    pub fn calls(&self) -> Vec<TabCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn opens(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, TabCall::Open(_)))
            .count()
    }

    pub fn closes(&self) -> Vec<TabId> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                TabCall::Close(tab) => Some(tab),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl TabController for FakeTabs {
    async fn find_tab(&self, url_prefix: &str) -> Result<Option<TabId>> {
        self.calls
            .lock()
            .unwrap()
            .push(TabCall::Find(url_prefix.to_string()));
        if self.fail_open {
            return Err(SignInError::TabError("browser unavailable".into()));
        }
        Ok(self.existing.lock().unwrap().clone())
    }

    async fn activate(&self, tab: &TabId) -> Result<()> {
        self.calls.lock().unwrap().push(TabCall::Activate(tab.clone()));
        if let Some((tx, page)) = self.focus_loads.lock().unwrap().as_ref() {
            tx.send(PageLoad::focused(tab.clone(), page.clone())).ok();
        }
        Ok(())
    }

    async fn open(&self, url: &str) -> Result<TabId> {
        self.calls.lock().unwrap().push(TabCall::Open(url.to_string()));
        let n = self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(TabId::new(format!("TAB{}", n)))
    }

    async fn close(&self, tab: &TabId) -> Result<()> {
        self.calls.lock().unwrap().push(TabCall::Close(tab.clone()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn titles(&self) -> Vec<String> {
        self.notices().into_iter().map(|n| n.title).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notice: &Notice) -> Result<()> {
        self.notices.lock().unwrap().push(notice.clone());
        Ok(())
    }
}

/// In-memory page. The button "works" by revealing `after_click_text`.
pub struct FakePage {
    pub url: String,
    pub document: AtomicUsize,
    pub selectors: Mutex<Vec<String>>,
    pub body: Mutex<String>,
    pub after_click_text: String,
    pub clicks: AtomicUsize,
    pub panel_tx: Mutex<Option<mpsc::UnboundedSender<PanelAction>>>,
    pub panel_views: Mutex<Vec<PanelView>>,
}

impl FakePage {
    pub fn new(url: &str, selectors: &[&str], after_click_text: &str) -> Self {
        Self {
            url: url.to_string(),
            document: AtomicUsize::new(1),
            selectors: Mutex::new(selectors.iter().map(|s| s.to_string()).collect()),
            body: Mutex::new("首页".to_string()),
            after_click_text: after_click_text.to_string(),
            clicks: AtomicUsize::new(0),
            panel_tx: Mutex::new(None),
            panel_views: Mutex::new(Vec::new()),
        }
    }

    /// Starts a new document with the original body.
    pub fn reload(&self) {
        self.document.fetch_add(1, Ordering::SeqCst);
        *self.body.lock().unwrap() = "首页".to_string();
    }

    pub fn clicks(&self) -> usize {
        self.clicks.load(Ordering::SeqCst)
    }

    pub fn press(&self, action: PanelAction) {
        if let Some(tx) = self.panel_tx.lock().unwrap().as_ref() {
            tx.send(action).unwrap();
        }
    }

    pub fn panel_views(&self) -> Vec<PanelView> {
        self.panel_views.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageDom for FakePage {
    async fn url(&self) -> Result<String> {
        Ok(self.url.clone())
    }

    async fn document_id(&self) -> Result<String> {
        Ok(self.document.load(Ordering::SeqCst).to_string())
    }

    async fn exists(&self, selector: &str) -> Result<bool> {
        Ok(self.selectors.lock().unwrap().iter().any(|s| s == selector))
    }

    async fn click(&self, selector: &str) -> Result<bool> {
        if !self.exists(selector).await? {
            return Ok(false);
        }
        self.clicks.fetch_add(1, Ordering::SeqCst);
        self.body.lock().unwrap().push_str(&self.after_click_text);
        Ok(true)
    }

    async fn body_text(&self) -> Result<String> {
        Ok(self.body.lock().unwrap().clone())
    }

    async fn list_buttons(&self, _highlight: bool) -> Result<Vec<ButtonInfo>> {
        Ok(self
            .selectors
            .lock()
            .unwrap()
            .iter()
            .map(|s| ButtonInfo {
                text: "签到".into(),
                classes: s.trim_start_matches('.').into(),
                id: String::new(),
            })
            .collect())
    }

    async fn show_panel(&self, view: &PanelView) -> Result<PanelEvents> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.panel_tx.lock().unwrap() = Some(tx);
        self.panel_views.lock().unwrap().push(view.clone());
        Ok(rx)
    }

    async fn update_panel(&self, view: &PanelView) -> Result<()> {
        self.panel_views.lock().unwrap().push(view.clone());
        Ok(())
    }
}

/// A link whose every request fails, as when the daemon is gone.
pub struct DeadLink;

#[async_trait]
impl CoordinatorLink for DeadLink {
    async fn send(&self, _request: CoordinatorRequest) -> Result<Reply> {
        Err(SignInError::DaemonNotRunning)
    }
}

pub struct Harness {
    pub coordinator: Arc<Coordinator>,
    pub store: Arc<MemoryStateStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub tabs: Arc<FakeTabs>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn new(config: Config, timestamps: Timestamps) -> Self {
        Self::with_tabs(config, timestamps, FakeTabs::new())
    }

    pub fn with_tabs(config: Config, timestamps: Timestamps, tabs: FakeTabs) -> Self {
        let store = Arc::new(MemoryStateStore::with_timestamps(timestamps));
        let notifier = Arc::new(RecordingNotifier::default());
        let tabs = Arc::new(tabs);
        let clock = Arc::new(ManualClock::new(NOW));
        let coordinator = Arc::new(
            Coordinator::new(
                Arc::new(config),
                store.clone(),
                notifier.clone(),
                tabs.clone(),
            )
            .with_clock(clock.clone()),
        );

        Self {
            coordinator,
            store,
            notifier,
            tabs,
            clock,
        }
    }

    pub async fn timestamps(&self) -> Timestamps {
        self.coordinator.get_timestamps().await.unwrap()
    }
}
