use crate::{Result, SignInError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

pub mod notices {
    use super::Notice;

    pub fn sign_in_success() -> Notice {
        Notice::new("Check-in succeeded", "Today's check-in is complete")
    }

    pub fn sign_in_needed() -> Notice {
        Notice::new("Auto check-in", "A check-in is due, opening the check-in page...")
    }

    pub fn open_failed() -> Notice {
        Notice::new("Check-in failed", "Could not open the check-in page")
    }

    pub fn selector_not_found() -> Notice {
        Notice::new(
            "Check-in failed",
            "Check-in button not found, please check the selector in the config",
        )
    }

    pub fn uncertain() -> Notice {
        Notice::new(
            "Check-in status unknown",
            "No success marker detected, please confirm manually",
        )
    }
}

/// User-visible notification surface.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notice: &Notice) -> Result<()>;
}

/// Native desktop notifications.
#[derive(Debug, Default, Clone)]
pub struct DesktopNotifier {
    app_name: String,
}

impl DesktopNotifier {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }
}

#[async_trait]
impl Notifier for DesktopNotifier {
    async fn notify(&self, notice: &Notice) -> Result<()> {
        let notice = notice.clone();
        let app_name = self.app_name.clone();
        tokio::task::spawn_blocking(move || {
            notify_rust::Notification::new()
                .appname(&app_name)
                .summary(&notice.title)
                .body(&notice.message)
                .show()
                .map(|_| ())
                .map_err(|e| SignInError::NotificationError(e.to_string()))
        })
        .await
        .map_err(|e| SignInError::NotificationError(e.to_string()))?
    }
}

/// Writes notices to the log, for headless hosts without a notification daemon.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notice: &Notice) -> Result<()> {
        tracing::info!(title = %notice.title, "{}", notice.message);
        Ok(())
    }
}

/// Tries the desktop first and falls back to the log when it is unavailable.
#[derive(Debug, Default, Clone)]
pub struct FallbackNotifier {
    desktop: DesktopNotifier,
}

impl FallbackNotifier {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            desktop: DesktopNotifier::new(app_name),
        }
    }
}

#[async_trait]
impl Notifier for FallbackNotifier {
    async fn notify(&self, notice: &Notice) -> Result<()> {
        if let Err(e) = self.desktop.notify(notice).await {
            tracing::debug!("Desktop notification unavailable: {}", e);
            LogNotifier.notify(notice).await?;
        }
        Ok(())
    }
}
