use crate::{
    Result, SignInError,
    browser::TabId,
    config::Config,
    timeouts::{ms, secs},
};
use chromiumoxide::cdp::browser_protocol::target::TargetId;
use chromiumoxide::handler::HandlerConfig;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Entry of the DevTools `/json/list` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct DevToolsTarget {
    pub id: String,
    pub url: String,
    #[serde(rename = "type")]
    pub target_type: String,
}

/// Owns the connection to the Chrome instance that hosts the sign-in page.
///
/// The browser runs with a persistent profile so the site's login cookies
/// survive restarts, and is reached over its remote debugging port.
pub struct BrowserLauncher {
    config: Arc<Config>,
    browser: RwLock<Option<Arc<Browser>>>,
    http: reqwest::Client,
}

impl BrowserLauncher {
    pub fn new(config: Arc<Config>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(secs::HTTP_REQUEST))
            .build()
            .unwrap_or_default();
        Self {
            config,
            browser: RwLock::new(None),
            http,
        }
    }

    pub fn devtools_base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.config.browser.port)
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub async fn is_reachable(&self) -> bool {
        self.http
            .get(format!("{}/json/version", self.devtools_base_url()))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    pub async fn get_or_launch(&self) -> Result<Arc<Browser>> {
        if let Some(browser) = self.browser.read().await.as_ref() {
            return Ok(browser.clone());
        }

        let browser = match self.connect_to_existing().await {
            Ok(browser) => browser,
            Err(_) => {
                self.launch_persistent()?;
                self.connect_with_retry(10).await?
            }
        };

        *self.browser.write().await = Some(browser.clone());
        Ok(browser)
    }

    /// Open page targets, in the browser's tab order.
    pub async fn page_targets(&self) -> Result<Vec<DevToolsTarget>> {
        let url = format!("{}/json/list", self.devtools_base_url());

        let targets: Vec<DevToolsTarget> = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| SignInError::TabError(format!("Failed to query tabs: {}", e)))?
            .json()
            .await
            .map_err(|e| SignInError::TabError(format!("Invalid tab list: {}", e)))?;

        Ok(targets
            .into_iter()
            .filter(|t| t.target_type == "page")
            .collect())
    }

    /// CDP handle for an already open tab.
    pub async fn attach(&self, tab: &TabId) -> Result<Page> {
        let browser = self.get_or_launch().await?;
        browser
            .get_page(TargetId::from(tab.as_str().to_string()))
            .await
            .map_err(|e| SignInError::TabError(format!("Failed to attach to {}: {}", tab, e)))
    }

    /// Drops the cached connection so the next call reconnects.
    pub async fn invalidate(&self) {
        self.browser.write().await.take();
    }

    async fn connect_to_existing(&self) -> Result<Arc<Browser>> {
        let url = format!("{}/json/version", self.devtools_base_url());

        let response: serde_json::Value = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|_| SignInError::ConnectionLost)?
            .json()
            .await
            .map_err(|_| SignInError::ConnectionLost)?;

        let ws_url = response
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or(SignInError::ConnectionLost)?;

        let handler_config = HandlerConfig {
            request_timeout: Duration::from_secs(secs::REQUEST),
            ..Default::default()
        };

        let (browser, mut handler) = Browser::connect_with_config(ws_url, handler_config)
            .await
            .map_err(|e| SignInError::Connection(e.to_string()))?;

        tokio::spawn(async move { while handler.next().await.is_some() {} });

        tracing::debug!("Connected to Chrome at {}", ws_url);
        Ok(Arc::new(browser))
    }

    async fn connect_with_retry(&self, retries: u32) -> Result<Arc<Browser>> {
        for attempt in 1..=retries {
            tokio::time::sleep(Duration::from_millis(ms::CONNECT_RETRY)).await;

            if let Ok(browser) = self.connect_to_existing().await {
                return Ok(browser);
            }

            tracing::debug!("Connection attempt {} failed", attempt);
        }

        Err(SignInError::ConnectionLost)
    }

    fn launch_persistent(&self) -> Result<()> {
        use std::process::{Command, Stdio};

        let chrome_path = match self.config.browser.chrome_path.clone() {
            Some(path) => path,
            None => crate::utils::find_chrome_executable()?,
        };

        let mut cmd = Command::new(&chrome_path);
        cmd.arg(format!(
            "--remote-debugging-port={}",
            self.config.browser.port
        ));

        if self.config.browser.headless {
            cmd.arg("--headless");
        }

        let user_data = self.profile_dir();
        std::fs::create_dir_all(&user_data)?;

        let lock_file = user_data.join("SingletonLock");
        if lock_file.exists() || lock_file.is_symlink() {
            std::fs::remove_file(&lock_file).ok();
        }

        cmd.arg(format!("--user-data-dir={}", user_data.display()));
        cmd.args([
            "--no-first-run",
            "--no-default-browser-check",
            "--disable-features=ProfilePickerOnStartup",
        ]);

        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| SignInError::LaunchFailed(format!("Failed to spawn Chrome: {}", e)))?;

        tracing::info!("Launched Chrome from {}", chrome_path.display());
        Ok(())
    }

    fn profile_dir(&self) -> PathBuf {
        self.config.browser.user_data_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("/tmp"))
                .join("auto-signin")
                .join("chrome-profile")
        })
    }
}
