//! Debug panel state and the actions its buttons send back.

use crate::config::Config;
use crate::schedule::{format_time, need_to_sign_with, next_check_time};
use crate::state::Timestamps;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PanelAction {
    ForceSignIn,
    ResetSignTime,
    FindButtons,
    CheckNow,
}

impl PanelAction {
    /// Decodes a binding payload such as `{"action":"check_now"}`.
    pub fn parse(payload: &str) -> Option<Self> {
        serde_json::from_str(payload).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelRow {
    pub field: &'static str,
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PanelView {
    pub last_sign_time: i64,
    pub need_to_sign: bool,
    pub on_sign_in_page: bool,
    pub auto_check_enabled: bool,
    pub auto_check_interval_minutes: u64,
    pub last_check_time: i64,
    pub status: String,
}

impl PanelView {
    pub fn build(config: &Config, timestamps: Timestamps, now: i64) -> Self {
        Self {
            last_sign_time: timestamps.last_sign_time,
            need_to_sign: need_to_sign_with(config, now, timestamps.last_sign_time),
            on_sign_in_page: true,
            auto_check_enabled: config.features.check_on_any_website,
            auto_check_interval_minutes: config.schedule.auto_check_interval_minutes,
            last_check_time: timestamps.last_check_time,
            status: String::new(),
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn rows(&self) -> Vec<PanelRow> {
        vec![
            PanelRow {
                field: "last_sign_time",
                label: "Last sign-in",
                value: format_time(self.last_sign_time),
            },
            PanelRow {
                field: "need_to_sign",
                label: "Needs sign-in",
                value: self.need_to_sign.to_string(),
            },
            PanelRow {
                field: "on_sign_in_page",
                label: "On sign-in page",
                value: self.on_sign_in_page.to_string(),
            },
            PanelRow {
                field: "auto_check_enabled",
                label: "Auto check enabled",
                value: self.auto_check_enabled.to_string(),
            },
            PanelRow {
                field: "auto_check_interval",
                label: "Check interval",
                value: format!("{} minutes", self.auto_check_interval_minutes),
            },
            PanelRow {
                field: "last_check_time",
                label: "Last check",
                value: format_time(self.last_check_time),
            },
            PanelRow {
                field: "next_check_time",
                label: "Next check",
                value: format_time(next_check_time(
                    self.last_check_time,
                    self.auto_check_interval_minutes,
                )),
            },
            PanelRow {
                field: "status",
                label: "Status",
                value: self.status.clone(),
            },
        ]
    }
}
