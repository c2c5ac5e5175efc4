pub mod js_templates;
pub mod launcher;
pub mod loads;
pub mod page;
pub mod tabs;

use crate::Result;
use crate::actor::panel::{PanelAction, PanelView};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

pub use launcher::{BrowserLauncher, DevToolsTarget};
pub use loads::PageLoadWatcher;
pub use page::CdpPage;
pub use tabs::ChromeTabs;

/// Identifier of a browser tab (CDP target id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub String);

impl TabId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tab management as seen by the Coordinator.
#[async_trait]
pub trait TabController: Send + Sync {
    /// First open tab whose URL starts with `url_prefix`.
    async fn find_tab(&self, url_prefix: &str) -> Result<Option<TabId>>;
    async fn activate(&self, tab: &TabId) -> Result<()>;
    async fn open(&self, url: &str) -> Result<TabId>;
    async fn close(&self, tab: &TabId) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonInfo {
    pub text: String,
    pub classes: String,
    pub id: String,
}

pub type PanelEvents = mpsc::UnboundedReceiver<PanelAction>;

/// Why a page is handed to the Page Actor dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadTrigger {
    /// A document finished loading, or was seen for the first time.
    Loaded,
    /// The Coordinator brought an existing tab to the foreground.
    Focused,
}

/// A page that may need a Page Actor.
#[derive(Clone)]
pub struct PageLoad {
    pub tab: TabId,
    pub page: Arc<dyn PageDom>,
    pub trigger: LoadTrigger,
}

impl PageLoad {
    pub fn loaded(tab: TabId, page: Arc<dyn PageDom>) -> Self {
        Self {
            tab,
            page,
            trigger: LoadTrigger::Loaded,
        }
    }

    pub fn focused(tab: TabId, page: Arc<dyn PageDom>) -> Self {
        Self {
            tab,
            page,
            trigger: LoadTrigger::Focused,
        }
    }
}

pub type PageLoads = mpsc::UnboundedSender<PageLoad>;

/// The live page as seen by a Page Actor. The page is untrusted: lookups
/// with invalid selectors report "not found" instead of failing.
#[async_trait]
pub trait PageDom: Send + Sync {
    async fn url(&self) -> Result<String>;
    /// Identifies the current document; changes on every load of the tab.
    async fn document_id(&self) -> Result<String>;
    async fn exists(&self, selector: &str) -> Result<bool>;
    /// Clicks the first match; false when nothing matched.
    async fn click(&self, selector: &str) -> Result<bool>;
    async fn body_text(&self) -> Result<String>;
    async fn list_buttons(&self, highlight: bool) -> Result<Vec<ButtonInfo>>;
    /// Injects the debug panel unless one is already present.
    async fn show_panel(&self, view: &PanelView) -> Result<PanelEvents>;
    async fn update_panel(&self, view: &PanelView) -> Result<()>;
}
