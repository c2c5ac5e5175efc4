use crate::client::CoordinatorClient;
use crate::config::Config;
use crate::output::{self, text};
use crate::schedule::{format_time, need_to_sign_with, next_check_time};
use crate::state::Timestamps;
use crate::{Result, output::OutputFormatter};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub sign_in_url: String,
    pub last_sign_time: i64,
    pub last_check_time: i64,
    pub next_check_time: i64,
    pub need_to_sign: bool,
    pub auto_check_enabled: bool,
    pub auto_check_interval_minutes: u64,
}

impl StatusReport {
    pub fn build(config: &Config, timestamps: Timestamps, now: i64) -> Self {
        Self {
            sign_in_url: config.site.sign_in_url.clone(),
            last_sign_time: timestamps.last_sign_time,
            last_check_time: timestamps.last_check_time,
            next_check_time: next_check_time(
                timestamps.last_check_time,
                config.schedule.auto_check_interval_minutes,
            ),
            need_to_sign: need_to_sign_with(config, now, timestamps.last_sign_time),
            auto_check_enabled: config.features.check_on_any_website,
            auto_check_interval_minutes: config.schedule.auto_check_interval_minutes,
        }
    }
}

impl OutputFormatter for StatusReport {
    fn format_text(&self) -> String {
        [
            text::section("Check-in status"),
            text::key_value("Sign-in URL", &self.sign_in_url),
            text::key_value("Last sign-in", &format_time(self.last_sign_time)),
            text::key_value("Needs sign-in", &text::yes_no(self.need_to_sign)),
            text::key_value("Auto check", &text::yes_no(self.auto_check_enabled)),
            text::key_value(
                "Check interval",
                &format!("{} minutes", self.auto_check_interval_minutes),
            ),
            text::key_value("Last check", &format_time(self.last_check_time)),
            text::key_value("Next check", &format_time(self.next_check_time)),
        ]
        .join("\n")
    }

    fn format_json(&self, pretty: bool) -> Result<String> {
        output::to_json(self, pretty)
    }
}

/// Coordinator answer to `check` or `reset`.
#[derive(Debug, Serialize)]
pub struct ActionReport {
    pub success: bool,
    pub message: String,
}

impl OutputFormatter for ActionReport {
    fn format_text(&self) -> String {
        if self.success {
            text::success(&self.message)
        } else {
            text::info(&self.message)
        }
    }

    fn format_json(&self, pretty: bool) -> Result<String> {
        output::to_json(self, pretty)
    }
}

#[derive(Debug, Serialize)]
pub struct DaemonStatus {
    pub running: bool,
    pub socket_path: PathBuf,
    pub pid: Option<u32>,
}

impl OutputFormatter for DaemonStatus {
    fn format_text(&self) -> String {
        if self.running {
            let pid = self
                .pid
                .map(|p| format!(" (pid {})", p))
                .unwrap_or_default();
            text::success(&format!(
                "Daemon running at {}{}",
                self.socket_path.display(),
                pid
            ))
        } else {
            text::warning("Daemon not running")
        }
    }

    fn format_json(&self, pretty: bool) -> Result<String> {
        output::to_json(self, pretty)
    }
}

pub async fn handle_status(client: &mut CoordinatorClient, now: i64) -> Result<StatusReport> {
    let config = client.get_config().await?;
    let timestamps = client.get_timestamps().await?;
    Ok(StatusReport::build(&config, timestamps, now))
}

pub async fn handle_check(client: &mut CoordinatorClient) -> Result<ActionReport> {
    let (success, message) = client.force_sign_in().await?;
    Ok(ActionReport { success, message })
}

pub async fn handle_reset(client: &mut CoordinatorClient) -> Result<ActionReport> {
    client.reset_sign_time().await?;
    Ok(ActionReport {
        success: true,
        message: "Last sign-in time reset".to_string(),
    })
}
