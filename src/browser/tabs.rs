use super::{BrowserLauncher, CdpPage, PageDom, PageLoad, PageLoads, TabController, TabId};
use crate::{Result, SignInError};
use async_trait::async_trait;
use std::sync::Arc;

/// Tab control over the DevTools HTTP endpoints, with CDP for opening pages.
pub struct ChromeTabs {
    launcher: Arc<BrowserLauncher>,
    loads: Option<PageLoads>,
}

impl ChromeTabs {
    pub fn new(launcher: Arc<BrowserLauncher>) -> Self {
        Self {
            launcher,
            loads: None,
        }
    }

    /// Pages opened or focused through this controller are also sent to `tx`
    /// so a Page Actor can run in them.
    pub fn with_page_loads(mut self, tx: PageLoads) -> Self {
        self.loads = Some(tx);
        self
    }

    async fn devtools_command(&self, command: &str, tab: &TabId) -> Result<()> {
        let url = format!(
            "{}/json/{}/{}",
            self.launcher.devtools_base_url(),
            command,
            tab
        );

        let response = self
            .launcher
            .http()
            .get(&url)
            .send()
            .await
            .map_err(|e| SignInError::TabError(format!("{} {} failed: {}", command, tab, e)))?;

        if !response.status().is_success() {
            return Err(SignInError::TabError(format!(
                "{} {} failed with status {}",
                command,
                tab,
                response.status()
            )));
        }

        Ok(())
    }

    fn send_load(&self, load: PageLoad) {
        if let Some(tx) = &self.loads {
            tx.send(load).ok();
        }
    }
}

#[async_trait]
impl TabController for ChromeTabs {
    async fn find_tab(&self, url_prefix: &str) -> Result<Option<TabId>> {
        let pages = self.launcher.page_targets().await?;
        Ok(pages
            .into_iter()
            .find(|t| t.url.starts_with(url_prefix))
            .map(|t| TabId::new(t.id)))
    }

    async fn activate(&self, tab: &TabId) -> Result<()> {
        self.devtools_command("activate", tab).await?;

        if self.loads.is_some() {
            match self.launcher.attach(tab).await {
                Ok(page) => {
                    let page: Arc<dyn PageDom> = Arc::new(CdpPage::new(Arc::new(page)));
                    self.send_load(PageLoad::focused(tab.clone(), page));
                }
                Err(e) => tracing::warn!("Focused tab {} but could not attach: {}", tab, e),
            }
        }
        Ok(())
    }

    async fn open(&self, url: &str) -> Result<TabId> {
        let browser = self.launcher.get_or_launch().await?;

        let page = match browser.new_page(url).await {
            Ok(page) => page,
            Err(e) => {
                self.launcher.invalidate().await;
                return Err(SignInError::TabError(format!(
                    "Failed to open {}: {}",
                    url, e
                )));
            }
        };

        let tab = TabId::new(page.target_id().inner().clone());
        tracing::debug!("Opened tab {} for {}", tab, url);

        let page: Arc<dyn PageDom> = Arc::new(CdpPage::new(Arc::new(page)));
        self.send_load(PageLoad::loaded(tab.clone(), page));
        Ok(tab)
    }

    async fn close(&self, tab: &TabId) -> Result<()> {
        self.devtools_command("close", tab).await
    }
}
