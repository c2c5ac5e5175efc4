use crate::actor::{AttemptOutcome, CoordinatorLink, IpcLink, LocalLink, PageActor};
use crate::browser::{BrowserLauncher, CdpPage, ChromeTabs, PageDom, TabId};
use crate::client::{CoordinatorClient, is_daemon_running};
use crate::config::Config;
use crate::coordinator::Coordinator;
use crate::notify::FallbackNotifier;
use crate::output::{self, OutputFormatter, text};
use crate::state::FileStateStore;
use crate::timeouts::ms;
use crate::{Result, SignInError};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Serialize)]
pub struct SignReport {
    pub url: String,
    pub tab: TabId,
    pub via_daemon: bool,
    /// `None` when the opened page is not the configured sign-in page.
    pub outcome: Option<String>,
    pub success: bool,
}

impl SignReport {
    fn new(url: String, tab: TabId, via_daemon: bool, outcome: Option<AttemptOutcome>) -> Self {
        Self {
            url,
            tab,
            via_daemon,
            success: matches!(outcome, Some(AttemptOutcome::Success { .. })),
            outcome: outcome.map(|o| o.describe()),
        }
    }
}

impl OutputFormatter for SignReport {
    fn format_text(&self) -> String {
        match &self.outcome {
            Some(outcome) if self.success => text::success(outcome),
            Some(outcome) => text::warning(outcome),
            None => text::info(&format!("{} is not the sign-in page", self.url)),
        }
    }

    fn format_json(&self, pretty: bool) -> Result<String> {
        output::to_json(self, pretty)
    }
}

/// Opens `url` and runs one Page Actor on it. Reports go to the daemon when
/// it is running, otherwise to a Coordinator created for this command.
pub async fn handle_sign(
    config: Arc<Config>,
    url: Option<String>,
    socket_path: &Path,
) -> Result<SignReport> {
    let url = url.unwrap_or_else(|| config.site.sign_in_url.clone());
    url::Url::parse(&url).map_err(|e| SignInError::InvalidUrl(format!("{}: {}", url, e)))?;

    let launcher = Arc::new(BrowserLauncher::new(Arc::clone(&config)));
    let browser = launcher.get_or_launch().await?;
    let page = browser
        .new_page(url.as_str())
        .await
        .map_err(|e| SignInError::TabError(format!("Failed to open {}: {}", url, e)))?;
    let tab = TabId::new(page.target_id().inner().clone());
    tokio::time::sleep(Duration::from_millis(ms::PAGE_LOAD_SETTLE)).await;

    let via_daemon = is_daemon_running(socket_path);
    let mut local = None;
    let link: Arc<dyn CoordinatorLink> = if via_daemon {
        let client = CoordinatorClient::connect(socket_path).await?;
        Arc::new(IpcLink::new(client, Some(tab.clone())))
    } else {
        tracing::debug!("Daemon not running, using a local coordinator");
        let coordinator = Arc::new(Coordinator::new(
            Arc::clone(&config),
            Arc::new(FileStateStore::new(FileStateStore::default_path()?)),
            Arc::new(FallbackNotifier::new("auto-signin")),
            Arc::new(ChromeTabs::new(launcher)),
        ));
        local = Some(coordinator.clone());
        Arc::new(LocalLink::new(coordinator, Some(tab.clone())))
    };

    let page: Arc<dyn PageDom> = Arc::new(CdpPage::new(Arc::new(page)));
    let actor = Arc::new(PageActor::initialize(page, link).await);
    let outcome = actor.run().await?;

    // The daemon closes its own tabs; a local coordinator must finish here.
    if let Some(coordinator) = local {
        coordinator.wait_for_pending_closes().await;
    }

    Ok(SignReport::new(url, tab, via_daemon, outcome))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_success_flag() {
        let report = SignReport::new(
            "https://www.iamtxt.com".into(),
            TabId::new("T"),
            false,
            Some(AttemptOutcome::Success {
                marker: Some("阅读愉快".into()),
            }),
        );
        assert!(report.success);
        assert!(report.format_text().contains("阅读愉快"));
    }

    #[test]
    fn test_report_not_sign_in_page() {
        let report = SignReport::new("https://other.test".into(), TabId::new("T"), true, None);
        assert!(!report.success);
        assert!(report.format_text().contains("not the sign-in page"));
    }

    #[tokio::test]
    async fn test_invalid_url_rejected_before_launch() {
        let err = handle_sign(
            Arc::new(Config::default()),
            Some("not a url".into()),
            Path::new("/tmp/auto-signin-nonexistent.sock"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SignInError::InvalidUrl(_)));
    }
}
