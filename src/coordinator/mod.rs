//! The Coordinator: owner of the persisted timestamps and the recurring alarm.
//!
//! It is the only writer of `lastSignTime` and `lastCheckTime`. Page Actors
//! and the CLI reach it through [`Coordinator::handle`]; the alarm and the
//! daemon's lifecycle hooks drive [`Coordinator::run_poll_cycle`].
//!
//! The read-decide-write sequence of a poll cycle is not locked. Two cycles
//! overlapping can both open the page; the Page Actor tolerates that.

pub mod alarm;
pub mod lifecycle;

pub use alarm::{AlarmCallback, AlarmRegistry, SIGN_IN_ALARM};
pub use lifecycle::{LifecycleEvent, ReachabilityTracker, VersionMarker};

use crate::Result;
use crate::browser::{TabController, TabId};
use crate::config::Config;
use crate::notify::{Notice, Notifier, notices};
use crate::schedule::{Clock, SystemClock, minutes_between, need_to_sign_with, poll_due};
use crate::server::protocol::{CoordinatorRequest, Reply};
use crate::state::{StateKey, StateStore, Timestamps};
use crate::timeouts::secs;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

pub const OPEN_ATTEMPTED_MESSAGE: &str = "Tried to open the check-in page";
pub const NOT_NEEDED_MESSAGE: &str = "No check-in needed right now";

/// What one poll cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Still inside the rate-limit window; nothing was written.
    Skipped,
    NotNeeded,
    /// A check-in was due and the page was opened or focused. Failures to do
    /// so were already reported as a notification.
    Opened,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub success: bool,
    pub message: String,
}

pub struct Coordinator {
    config: Arc<Config>,
    store: Arc<dyn StateStore>,
    notifier: Arc<dyn Notifier>,
    tabs: Arc<dyn TabController>,
    clock: Arc<dyn Clock>,
    alarms: AlarmRegistry,
    pending_closes: Arc<Mutex<HashMap<TabId, JoinHandle<()>>>>,
}

impl Coordinator {
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn StateStore>,
        notifier: Arc<dyn Notifier>,
        tabs: Arc<dyn TabController>,
    ) -> Self {
        Self {
            config,
            store,
            notifier,
            tabs,
            clock: Arc::new(SystemClock),
            alarms: AlarmRegistry::new(),
            pending_closes: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn alarms(&self) -> &AlarmRegistry {
        &self.alarms
    }

    pub async fn get_timestamps(&self) -> Result<Timestamps> {
        self.store.timestamps().await
    }

    pub async fn set_timestamp(&self, key: StateKey, value: i64) -> Result<()> {
        self.debug_log(format_args!("Set {} = {}", key, value));
        self.store.set(key, value).await
    }

    /// Shows `notice` when notifications are enabled. Failures are logged only.
    pub async fn notify(&self, notice: &Notice) {
        if !self.config.features.show_notification {
            return;
        }
        self.debug_log(format_args!("Notify: {} / {}", notice.title, notice.message));
        if let Err(e) = self.notifier.notify(notice).await {
            tracing::warn!("Notification failed: {}", e);
        }
    }

    pub async fn check_need_to_sign(&self) -> Result<bool> {
        let last_sign_time = self.store.get(StateKey::LastSignTime).await?;
        let need = need_to_sign_with(&self.config, self.clock.now_ms(), last_sign_time);
        self.debug_log(format_args!(
            "Need to sign: {} (last sign-in {})",
            need,
            crate::schedule::format_time(last_sign_time)
        ));
        Ok(need)
    }

    /// Records a confirmed check-in. Safe to repeat: the time is re-stamped
    /// and at most one close is pending per tab.
    pub async fn report_success(&self, origin: Option<&TabId>) -> Result<()> {
        self.store
            .set(StateKey::LastSignTime, self.clock.now_ms())
            .await?;
        tracing::info!("Check-in recorded");
        self.notify(&notices::sign_in_success()).await;

        if self.config.features.auto_close_after_success
            && let Some(tab) = origin
        {
            self.schedule_close(tab.clone());
        }
        Ok(())
    }

    fn schedule_close(&self, tab: TabId) {
        let delay = Duration::from_millis(self.config.schedule.auto_close_delay_ms);

        // Held until the handle is stored, so the task cannot remove its entry first.
        let mut pending = self.pending_closes.lock().unwrap_or_else(|e| e.into_inner());
        if pending.contains_key(&tab) {
            self.debug_log(format_args!("Close of {} already scheduled", tab));
            return;
        }
        self.debug_log(format_args!("Closing {} in {:?}", tab, delay));

        let tabs = self.tabs.clone();
        let pending_closes = self.pending_closes.clone();
        let task_tab = tab.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = tabs.close(&task_tab).await {
                tracing::warn!("Failed to close tab {}: {}", task_tab, e);
            }
            pending_closes
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&task_tab);
        });
        pending.insert(tab, handle);
    }

    pub fn pending_close_count(&self) -> usize {
        self.pending_closes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Waits until every scheduled tab close has run. Needed by short-lived
    /// processes, which would otherwise exit before the delay is over.
    pub async fn wait_for_pending_closes(&self) {
        let handles: Vec<JoinHandle<()>> = self
            .pending_closes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain()
            .map(|(_, handle)| handle)
            .collect();

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!("Tab close task failed: {}", e);
            }
        }
    }

    /// Opens the page if a check-in is due; no side effects otherwise.
    pub async fn force_check(&self) -> Result<CheckResult> {
        if self.check_need_to_sign().await? {
            self.open_sign_in_page().await;
            Ok(CheckResult {
                success: true,
                message: OPEN_ATTEMPTED_MESSAGE.to_string(),
            })
        } else {
            Ok(CheckResult {
                success: false,
                message: NOT_NEEDED_MESSAGE.to_string(),
            })
        }
    }

    pub async fn reset_sign_time(&self) -> Result<()> {
        tracing::info!("Resetting last sign-in time");
        self.store.set(StateKey::LastSignTime, 0).await
    }

    pub async fn run_poll_cycle(&self) -> Result<PollOutcome> {
        let now = self.clock.now_ms();
        let interval = self.config.schedule.auto_check_interval_minutes;
        let last_check_time = self.store.get(StateKey::LastCheckTime).await?;

        if !poll_due(now, last_check_time, interval) {
            self.debug_log(format_args!(
                "Last check {} minutes ago, under the {} minute interval",
                minutes_between(now, last_check_time),
                interval
            ));
            return Ok(PollOutcome::Skipped);
        }

        self.store.set(StateKey::LastCheckTime, now).await?;

        if !self.check_need_to_sign().await? {
            self.debug_log("No check-in needed");
            return Ok(PollOutcome::NotNeeded);
        }

        tracing::info!("Check-in due, opening the check-in page");
        self.notify(&notices::sign_in_needed()).await;
        self.open_sign_in_page().await;
        Ok(PollOutcome::Opened)
    }

    /// Focuses an existing sign-in tab or opens a new one. Errors end up as
    /// a notification.
    pub async fn open_sign_in_page(&self) {
        if let Err(e) = self.try_open_sign_in_page().await {
            tracing::error!("Failed to open the check-in page: {}", e);
            self.notify(&notices::open_failed()).await;
        }
    }

    async fn try_open_sign_in_page(&self) -> Result<()> {
        let url = &self.config.site.sign_in_url;

        if let Some(tab) = self.tabs.find_tab(url).await? {
            self.debug_log(format_args!("Focusing existing tab {}", tab));
            return self.tabs.activate(&tab).await;
        }

        let tab = self.tabs.open(url).await?;
        self.debug_log(format_args!("Opened tab {} for {}", tab, url));
        Ok(())
    }

    pub async fn handle(&self, request: CoordinatorRequest, origin: Option<TabId>) -> Result<Reply> {
        self.debug_log(format_args!("Request {}", request.action()));

        match request {
            CoordinatorRequest::GetConfig => Ok(Reply::Config {
                config: Box::new(self.config.as_ref().clone()),
            }),
            CoordinatorRequest::GetStorageValues => {
                Ok(Reply::Timestamps(self.get_timestamps().await?))
            }
            CoordinatorRequest::SetStorageValue { key, value } => {
                self.set_timestamp(key, value).await?;
                Ok(Reply::ok())
            }
            CoordinatorRequest::ShowNotification { title, message } => {
                self.notify(&Notice::new(title, message)).await;
                Ok(Reply::ok())
            }
            CoordinatorRequest::SignInSuccess => {
                self.report_success(origin.as_ref()).await?;
                Ok(Reply::ok())
            }
            CoordinatorRequest::ForceSignIn => {
                let result = self.force_check().await?;
                Ok(Reply::ack(result.success, result.message))
            }
            CoordinatorRequest::ResetSignTime => {
                self.reset_sign_time().await?;
                Ok(Reply::ok())
            }
        }
    }

    /// Replaces the recurring alarm. The alarm holds only a weak reference.
    pub fn setup_alarm(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let callback: AlarmCallback = Arc::new(move || {
            let weak = weak.clone();
            Box::pin(async move {
                if let Some(coordinator) = weak.upgrade() {
                    coordinator.on_alarm().await;
                }
            })
        });

        let period = Duration::from_secs(
            self.config
                .schedule
                .auto_check_interval_minutes
                .saturating_mul(60),
        );
        self.alarms.clear(SIGN_IN_ALARM);
        self.alarms.create(
            SIGN_IN_ALARM,
            Duration::from_secs(secs::ALARM_INITIAL_DELAY),
            period,
            callback,
        );
        self.debug_log(format_args!("Alarm set, every {:?}", period));
    }

    pub async fn on_lifecycle(self: &Arc<Self>, event: LifecycleEvent) -> Result<PollOutcome> {
        tracing::info!("Lifecycle event: {}", event);
        self.setup_alarm();
        self.run_poll_cycle().await
    }

    pub async fn on_alarm(&self) {
        if !self.config.features.check_on_any_website {
            self.debug_log("Periodic checks disabled");
            return;
        }
        match self.run_poll_cycle().await {
            Ok(outcome) => self.debug_log(format_args!("Poll cycle: {:?}", outcome)),
            Err(e) => tracing::error!("Poll cycle failed: {}", e),
        }
    }

    fn debug_log(&self, message: impl Display) {
        if self.config.debug.logging() {
            tracing::debug!("[coordinator] {}", message);
        }
    }
}
