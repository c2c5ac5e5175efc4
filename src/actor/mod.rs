//! The Page Actor: one per load of the sign-in page.
//!
//! It fetches a configuration snapshot from the Coordinator, clicks the
//! configured button, waits for the page to settle and decides whether the
//! check-in went through. Only a confirmed success is reported back; every
//! other outcome is surfaced to the user as a notification.

pub mod classify;
pub mod dispatch;
pub mod link;
pub mod panel;

pub use classify::{Classification, classify_element, classify_text};
pub use dispatch::ActorDispatcher;
pub use link::{CoordinatorLink, IpcLink, LocalLink};
pub use panel::{PanelAction, PanelView};

use crate::Result;
use crate::browser::PageDom;
use crate::config::{Config, SuccessIndicator};
use crate::notify::{Notice, notices};
use crate::schedule::{Clock, SystemClock, need_to_sign_with};
use crate::state::{StateKey, Timestamps};
use crate::timeouts::ms;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success { marker: Option<String> },
    Uncertain,
    SelectorNotFound,
}

impl AttemptOutcome {
    pub fn describe(&self) -> String {
        match self {
            AttemptOutcome::Success { marker: Some(m) } => format!("Check-in succeeded ({})", m),
            AttemptOutcome::Success { marker: None } => "Check-in succeeded".to_string(),
            AttemptOutcome::Uncertain => "No success marker found".to_string(),
            AttemptOutcome::SelectorNotFound => "Check-in button not found".to_string(),
        }
    }
}

pub struct PageActor {
    page: Arc<dyn PageDom>,
    link: Arc<dyn CoordinatorLink>,
    clock: Arc<dyn Clock>,
    config: Config,
    timestamps: Timestamps,
    need_to_sign: bool,
}

impl PageActor {
    pub async fn initialize(page: Arc<dyn PageDom>, link: Arc<dyn CoordinatorLink>) -> Self {
        Self::initialize_with_clock(page, link, Arc::new(SystemClock)).await
    }

    /// Fetches config and timestamps; falls back to defaults when the
    /// Coordinator cannot be reached.
    pub async fn initialize_with_clock(
        page: Arc<dyn PageDom>,
        link: Arc<dyn CoordinatorLink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let config = match link.get_config().await {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Could not fetch config, using defaults: {}", e);
                Config::default()
            }
        };

        let timestamps = match link.get_timestamps().await {
            Ok(timestamps) => timestamps,
            Err(e) => {
                tracing::warn!("Could not fetch timestamps, assuming none: {}", e);
                Timestamps::default()
            }
        };

        let need_to_sign = need_to_sign_with(&config, clock.now_ms(), timestamps.last_sign_time);

        let actor = Self {
            page,
            link,
            clock,
            config,
            timestamps,
            need_to_sign,
        };
        actor.debug_log(format_args!(
            "Initialized, last sign-in {}, need to sign: {}",
            crate::schedule::format_time(timestamps.last_sign_time),
            need_to_sign
        ));
        actor
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn timestamps(&self) -> Timestamps {
        self.timestamps
    }

    /// Diagnostic only; the attempt is made regardless.
    pub fn need_to_sign(&self) -> bool {
        self.need_to_sign
    }

    /// Returns `None` when the page is not the sign-in page.
    pub async fn run(self: Arc<Self>) -> Result<Option<AttemptOutcome>> {
        let url = self.page.url().await?;
        if !url.starts_with(&self.config.site.sign_in_url) {
            tracing::debug!("Not the sign-in page, skipping: {}", url);
            return Ok(None);
        }

        if self.config.debug.enabled {
            let actor = self.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(ms::PANEL_DELAY)).await;
                if let Err(e) = actor.run_panel().await {
                    tracing::warn!("Debug panel stopped: {}", e);
                }
            });
        }

        tokio::time::sleep(Duration::from_millis(self.config.schedule.page_ready_delay_ms)).await;
        self.attempt_interaction().await.map(Some)
    }

    pub async fn attempt_interaction(&self) -> Result<AttemptOutcome> {
        self.debug_log("Attempting check-in");

        if self.config.debug.enabled {
            match self.page.list_buttons(false).await {
                Ok(buttons) => {
                    self.debug_log(format_args!("Found {} button-like elements", buttons.len()));
                    for (i, b) in buttons.iter().enumerate() {
                        self.debug_log(format_args!(
                            "Button {}: text={:?} class={:?} id={:?}",
                            i + 1,
                            b.text,
                            b.classes,
                            b.id
                        ));
                    }
                }
                Err(e) => tracing::debug!("Could not list buttons: {}", e),
            }
        }

        let selector = &self.config.site.button_selector;
        if !self.page.exists(selector).await? {
            self.debug_log(format_args!("No element matches {}", selector));
            self.notify(notices::selector_not_found()).await;
            return Ok(AttemptOutcome::SelectorNotFound);
        }

        if self.config.debug.simulate_click {
            self.debug_log(format_args!("Simulated click on {}", selector));
        } else if !self.page.click(selector).await? {
            self.debug_log(format_args!("{} disappeared before the click", selector));
            self.notify(notices::selector_not_found()).await;
            return Ok(AttemptOutcome::SelectorNotFound);
        }

        tokio::time::sleep(Duration::from_millis(self.config.schedule.settle_delay_ms)).await;
        self.classify_result().await
    }

    pub async fn classify_result(&self) -> Result<AttemptOutcome> {
        let classification = match &self.config.site.success_indicator {
            SuccessIndicator::Text(markers) => {
                let text = self.page.body_text().await?;
                classify_text(&text, &markers.0)
            }
            SuccessIndicator::Element(selector) => {
                classify_element(self.page.exists(selector).await?)
            }
        };

        match classification {
            Classification::Success { marker } => {
                self.debug_log(format_args!("Success marker found: {:?}", marker));
                if let Err(e) = self.link.sign_in_success().await {
                    tracing::warn!("Failed to report success: {}", e);
                }
                Ok(AttemptOutcome::Success { marker })
            }
            Classification::Uncertain => {
                self.debug_log("No success marker found");
                self.notify(notices::uncertain()).await;
                Ok(AttemptOutcome::Uncertain)
            }
        }
    }

    /// Runs one debug panel button and returns the text for the status row.
    pub async fn handle_panel_action(&self, action: PanelAction) -> String {
        match action {
            PanelAction::ForceSignIn => match self.attempt_interaction().await {
                Ok(outcome) => outcome.describe(),
                Err(e) => format!("Attempt failed: {}", e),
            },
            PanelAction::ResetSignTime => {
                match self.link.set_storage_value(StateKey::LastSignTime, 0).await {
                    Ok(()) => "Sign time reset".to_string(),
                    Err(e) => format!("Reset failed: {}", e),
                }
            }
            PanelAction::FindButtons => match self.page.list_buttons(true).await {
                Ok(buttons) => {
                    for (i, b) in buttons.iter().enumerate() {
                        tracing::info!(
                            "Button {}: text={:?} class={:?} id={:?}",
                            i + 1,
                            b.text,
                            b.classes,
                            b.id
                        );
                    }
                    format!("Found {} buttons", buttons.len())
                }
                Err(e) => format!("Button search failed: {}", e),
            },
            PanelAction::CheckNow => match self.link.force_sign_in().await {
                Ok((_, message)) => message,
                Err(e) => format!("Check failed: {}", e),
            },
        }
    }

    pub async fn panel_view(&self, status: impl Into<String>) -> PanelView {
        let timestamps = match self.link.get_timestamps().await {
            Ok(timestamps) => timestamps,
            Err(_) => self.timestamps,
        };
        PanelView::build(&self.config, timestamps, self.clock.now_ms()).with_status(status)
    }

    async fn run_panel(&self) -> Result<()> {
        let view = self.panel_view("Ready").await;
        let mut events = self.page.show_panel(&view).await?;

        while let Some(action) = events.recv().await {
            self.debug_log(format_args!("Panel action {:?}", action));
            let status = self.handle_panel_action(action).await;
            let view = self.panel_view(status).await;
            self.page.update_panel(&view).await?;
        }

        Ok(())
    }

    async fn notify(&self, notice: Notice) {
        if !self.config.features.show_notification {
            return;
        }
        if let Err(e) = self.link.show_notification(&notice).await {
            tracing::warn!("Failed to send notification: {}", e);
        }
    }

    fn debug_log(&self, message: impl Display) {
        if self.config.debug.logging() {
            tracing::debug!("[page] {}", message);
        }
    }
}
