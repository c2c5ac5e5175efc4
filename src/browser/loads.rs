use super::{BrowserLauncher, CdpPage, PageDom, PageLoad, PageLoads, TabId};
use crate::Result;
use crate::timeouts::secs;
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::page::EventLoadEventFired;
use futures::StreamExt;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Reports every top-level document load in the browser.
///
/// Open tabs are picked up from `/json/list` on a fixed interval. A tab's
/// current document counts as loaded when the tab is first seen, so tabs that
/// were open before the daemon started are covered too.
pub struct PageLoadWatcher {
    launcher: Arc<BrowserLauncher>,
    tx: PageLoads,
    watched: HashMap<String, JoinHandle<()>>,
}

impl PageLoadWatcher {
    pub fn new(launcher: Arc<BrowserLauncher>, tx: PageLoads) -> Self {
        Self {
            launcher,
            tx,
            watched: HashMap::new(),
        }
    }

    pub async fn run(mut self) {
        let mut interval = tokio::time::interval(Duration::from_secs(secs::TARGET_SCAN));
        loop {
            interval.tick().await;
            if self.tx.is_closed() {
                break;
            }
            if let Err(e) = self.scan().await {
                tracing::trace!("Tab scan skipped: {}", e);
            }
        }
    }

    async fn scan(&mut self) -> Result<()> {
        let targets = self.launcher.page_targets().await?;
        let live: HashSet<&str> = targets.iter().map(|t| t.id.as_str()).collect();

        self.watched.retain(|id, handle| {
            let keep = live.contains(id.as_str()) && !handle.is_finished();
            if !keep {
                handle.abort();
            }
            keep
        });

        for target in &targets {
            if self.watched.contains_key(&target.id) {
                continue;
            }
            let tab = TabId::new(target.id.clone());
            match self.launcher.attach(&tab).await {
                Ok(page) => {
                    tracing::debug!("Watching loads of tab {}", tab);
                    let handle = tokio::spawn(forward_loads(tab, page, self.tx.clone()));
                    self.watched.insert(target.id.clone(), handle);
                }
                Err(e) => tracing::debug!("Not watching tab {} yet: {}", tab, e),
            }
        }

        Ok(())
    }
}

impl Drop for PageLoadWatcher {
    fn drop(&mut self) {
        for (_, handle) in self.watched.drain() {
            handle.abort();
        }
    }
}

async fn forward_loads(tab: TabId, page: Page, tx: PageLoads) {
    let mut loads = match page.event_listener::<EventLoadEventFired>().await {
        Ok(stream) => stream,
        Err(e) => {
            tracing::debug!("Failed to listen for loads of tab {}: {}", tab, e);
            return;
        }
    };
    let page: Arc<dyn PageDom> = Arc::new(CdpPage::new(Arc::new(page)));

    if tx.send(PageLoad::loaded(tab.clone(), page.clone())).is_err() {
        return;
    }
    while loads.next().await.is_some() {
        if tx.send(PageLoad::loaded(tab.clone(), page.clone())).is_err() {
            break;
        }
    }
}
