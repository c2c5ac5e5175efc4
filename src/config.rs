use crate::timeouts::ms;
use crate::{Result, SignInError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One week.
pub const MAX_AUTO_CHECK_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub features: FeatureConfig,
    #[serde(default)]
    pub debug: DebugConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// The site being checked into and how a completed check-in is recognized.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SiteConfig {
    #[serde(default = "default_sign_in_url")]
    pub sign_in_url: String,
    #[serde(default = "default_button_selector")]
    pub button_selector: String,
    #[serde(default)]
    pub success_indicator: SuccessIndicator,
}

/// Post-condition used to decide whether the check-in went through.
///
/// In `text` mode any one of the markers appearing in the page text counts as
/// success. In `element` mode the selector must match an element.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum SuccessIndicator {
    Text(Markers),
    Element(String),
}

impl Default for SuccessIndicator {
    fn default() -> Self {
        Self::Text(Markers(vec![
            "今天已经签过了哈".to_string(),
            "阅读愉快".to_string(),
        ]))
    }
}

/// Success marker strings. Accepts a single string or a list in config files.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(from = "OneOrMany")]
pub struct Markers(pub Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for Markers {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(s) => Markers(vec![s]),
            OneOrMany::Many(v) => Markers(v),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ScheduleConfig {
    /// Minimum time between check-ins.
    #[serde(default = "default_check_interval_hours")]
    pub check_interval_hours: u64,
    /// Rate limit for poll cycles, and the alarm period.
    #[serde(default = "default_auto_check_interval_minutes")]
    pub auto_check_interval_minutes: u64,
    #[serde(default = "default_page_ready_delay")]
    pub page_ready_delay_ms: u64,
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_auto_close_delay")]
    pub auto_close_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct FeatureConfig {
    #[serde(default = "default_true")]
    pub check_on_any_website: bool,
    #[serde(default)]
    pub auto_close_after_success: bool,
    #[serde(default = "default_true")]
    pub show_notification: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct DebugConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Treat a check-in as always due.
    #[serde(default)]
    pub skip_time_check: bool,
    #[serde(default = "default_true")]
    pub verbose: bool,
    /// Log the click instead of performing it.
    #[serde(default)]
    pub simulate_click: bool,
}

impl DebugConfig {
    pub fn logging(&self) -> bool {
        self.enabled && self.verbose
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct BrowserConfig {
    pub chrome_path: Option<PathBuf>,
    #[serde(default)]
    pub headless: bool,
    #[serde(default = "default_port")]
    pub port: u16,
    pub user_data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct ServerConfig {
    pub socket_path: Option<PathBuf>,
}

fn default_sign_in_url() -> String {
    "https://www.iamtxt.com".to_string()
}
fn default_button_selector() -> String {
    ".signin".to_string()
}
fn default_check_interval_hours() -> u64 {
    24
}
fn default_auto_check_interval_minutes() -> u64 {
    60
}
fn default_page_ready_delay() -> u64 {
    ms::PAGE_READY_DELAY
}
fn default_settle_delay() -> u64 {
    ms::SETTLE_DELAY
}
fn default_auto_close_delay() -> u64 {
    ms::AUTO_CLOSE_DELAY
}
fn default_true() -> bool {
    true
}
fn default_port() -> u16 {
    9222
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            sign_in_url: default_sign_in_url(),
            button_selector: default_button_selector(),
            success_indicator: SuccessIndicator::default(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            check_interval_hours: default_check_interval_hours(),
            auto_check_interval_minutes: default_auto_check_interval_minutes(),
            page_ready_delay_ms: default_page_ready_delay(),
            settle_delay_ms: default_settle_delay(),
            auto_close_delay_ms: default_auto_close_delay(),
        }
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            check_on_any_website: true,
            auto_close_after_success: false,
            show_notification: true,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            skip_time_check: false,
            verbose: true,
            simulate_click: false,
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: false,
            port: default_port(),
            user_data_dir: None,
        }
    }
}

pub fn default_config_path() -> Result<PathBuf> {
    default_config_dir().map(|p| p.join("config.toml"))
}

pub fn default_config_dir() -> Result<PathBuf> {
    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|home| PathBuf::from(home).join(".config"))
        })
        .map(|p| p.join("auto-signin"))
        .ok_or_else(|| SignInError::ConfigError("Could not determine config directory".into()))
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        let global_path = default_config_path()?;
        if global_path.exists() {
            let content = std::fs::read_to_string(&global_path)?;
            config = toml::from_str(&content)?;
        }

        let project_path = PathBuf::from(".auto-signin.toml");
        if project_path.exists() {
            let content = std::fs::read_to_string(&project_path)?;
            let project_config: Config = toml::from_str(&content)?;
            config = config.merge(project_config);
        }

        config.load_from_env();

        Ok(config)
    }

    pub fn load_with_overrides(&self, cli_overrides: ConfigOverrides) -> Self {
        let mut config = self.clone();

        if let Some(headless) = cli_overrides.headless {
            config.browser.headless = headless;
        }
        if let Some(port) = cli_overrides.port {
            config.browser.port = port;
        }
        if let Some(chrome_path) = cli_overrides.chrome_path {
            config.browser.chrome_path = Some(chrome_path);
        }
        if let Some(socket_path) = cli_overrides.socket_path {
            config.server.socket_path = Some(socket_path);
        }

        config
    }

    /// Project files override whole sections that differ from the defaults.
    fn merge(mut self, other: Config) -> Self {
        let defaults = Config::default();
        if other.site != defaults.site {
            self.site = other.site;
        }
        if other.schedule != defaults.schedule {
            self.schedule = other.schedule;
        }
        if other.features != defaults.features {
            self.features = other.features;
        }
        if other.debug != defaults.debug {
            self.debug = other.debug;
        }
        if other.browser.chrome_path.is_some() {
            self.browser.chrome_path = other.browser.chrome_path;
        }
        if other.browser.user_data_dir.is_some() {
            self.browser.user_data_dir = other.browser.user_data_dir;
        }
        if other.server.socket_path.is_some() {
            self.server.socket_path = other.server.socket_path;
        }
        self
    }

    fn load_from_env(&mut self) {
        if let Ok(url) = std::env::var("SIGNIN_URL")
            && !url.is_empty()
        {
            self.site.sign_in_url = url;
        }
        if let Ok(debug) = std::env::var("SIGNIN_DEBUG") {
            self.debug.enabled = debug == "true" || debug == "1";
        }
        if let Ok(port) = std::env::var("CHROME_DEBUG_PORT")
            && let Ok(port) = port.parse()
        {
            self.browser.port = port;
        }
        if let Ok(headless) = std::env::var("CHROME_HEADLESS") {
            self.browser.headless = headless == "true" || headless == "1";
        }
        if let Ok(path) = std::env::var("CHROME_PATH") {
            self.browser.chrome_path = Some(PathBuf::from(path));
        }
    }

    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.site.sign_in_url)
            .map_err(|e| SignInError::InvalidUrl(format!("{}: {}", self.site.sign_in_url, e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(SignInError::InvalidUrl(format!(
                "{}: only http and https are supported",
                self.site.sign_in_url
            )));
        }

        if self.site.button_selector.trim().is_empty() {
            return Err(SignInError::ConfigError(
                "button_selector must not be empty".into(),
            ));
        }

        match &self.site.success_indicator {
            SuccessIndicator::Text(markers) => {
                if markers.0.is_empty() || markers.0.iter().any(|m| m.is_empty()) {
                    return Err(SignInError::ConfigError(
                        "success_indicator needs at least one non-empty marker".into(),
                    ));
                }
            }
            SuccessIndicator::Element(selector) => {
                if selector.trim().is_empty() {
                    return Err(SignInError::ConfigError(
                        "success_indicator selector must not be empty".into(),
                    ));
                }
            }
        }

        if self.schedule.check_interval_hours == 0 {
            return Err(SignInError::ConfigError(
                "check_interval_hours must be greater than 0".into(),
            ));
        }

        if self.schedule.auto_check_interval_minutes == 0 {
            return Err(SignInError::ConfigError(
                "auto_check_interval_minutes must be greater than 0".into(),
            ));
        }

        if self.schedule.auto_check_interval_minutes > MAX_AUTO_CHECK_INTERVAL_MINUTES {
            return Err(SignInError::ConfigError(format!(
                "auto_check_interval_minutes must be at most {}",
                MAX_AUTO_CHECK_INTERVAL_MINUTES
            )));
        }

        if self.browser.port < 1024 {
            return Err(SignInError::InvalidPort(self.browser.port));
        }

        if let Some(ref path) = self.browser.chrome_path
            && !path.exists()
        {
            return Err(SignInError::ConfigError(format!(
                "Chrome path does not exist: {}",
                path.display()
            )));
        }

        Ok(())
    }

    pub fn show_masked(&self) -> String {
        let indicator = match &self.site.success_indicator {
            SuccessIndicator::Text(markers) => format!("text [{}]", markers.0.join(" | ")),
            SuccessIndicator::Element(selector) => format!("element {}", selector),
        };
        format!(
            r#"Site:
  Sign-in URL: {}
  Button Selector: {}
  Success Indicator: {}

Schedule:
  Check Interval: {}h
  Auto Check Interval: {}m
  Settle Delay: {}ms
  Auto Close Delay: {}ms

Features:
  Check On Any Website: {}
  Auto Close After Success: {}
  Notifications: {}

Debug:
  Enabled: {}
  Skip Time Check: {}
  Simulate Click: {}

Browser:
  Chrome Path: {}
  Headless: {}
  Port: {}
"#,
            self.site.sign_in_url,
            self.site.button_selector,
            indicator,
            self.schedule.check_interval_hours,
            self.schedule.auto_check_interval_minutes,
            self.schedule.settle_delay_ms,
            self.schedule.auto_close_delay_ms,
            self.features.check_on_any_website,
            self.features.auto_close_after_success,
            self.features.show_notification,
            self.debug.enabled,
            self.debug.skip_time_check,
            self.debug.simulate_click,
            self.browser
                .chrome_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "auto-detect".into()),
            self.browser.headless,
            self.browser.port,
        )
    }
}

#[derive(Debug, Default)]
pub struct ConfigOverrides {
    pub headless: Option<bool>,
    pub port: Option<u16>,
    pub chrome_path: Option<PathBuf>,
    pub socket_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.site.sign_in_url, "https://www.iamtxt.com");
        assert_eq!(config.site.button_selector, ".signin");
        assert_eq!(config.schedule.check_interval_hours, 24);
        assert_eq!(config.schedule.auto_check_interval_minutes, 60);
        assert!(config.features.show_notification);
        assert!(!config.features.auto_close_after_success);
        assert!(!config.debug.enabled);
    }

    #[test]
    fn test_config_validate_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validate_bad_url() {
        let mut config = Config::default();
        config.site.sign_in_url = "not a url".into();
        assert!(matches!(config.validate(), Err(SignInError::InvalidUrl(_))));

        config.site.sign_in_url = "ftp://example.com".into();
        assert!(matches!(config.validate(), Err(SignInError::InvalidUrl(_))));
    }

    #[test]
    fn test_config_validate_empty_markers() {
        let mut config = Config::default();
        config.site.success_indicator = SuccessIndicator::Text(Markers(vec![]));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validate_zero_intervals() {
        let mut config = Config::default();
        config.schedule.auto_check_interval_minutes = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.schedule.check_interval_hours = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validate_interval_upper_bound() {
        let mut config = Config::default();
        config.schedule.auto_check_interval_minutes = MAX_AUTO_CHECK_INTERVAL_MINUTES;
        assert!(config.validate().is_ok());

        config.schedule.auto_check_interval_minutes = u64::MAX;
        assert!(matches!(config.validate(), Err(SignInError::ConfigError(_))));
    }

    #[test]
    fn test_config_validate_invalid_port() {
        let mut config = Config::default();
        config.browser.port = 80;
        assert!(matches!(config.validate(), Err(SignInError::InvalidPort(80))));
    }

    #[test]
    fn test_success_indicator_accepts_single_string() {
        let config: Config = toml::from_str(
            r#"
[site.success_indicator]
type = "text"
value = "done for today"
"#,
        )
        .unwrap();
        assert_eq!(
            config.site.success_indicator,
            SuccessIndicator::Text(Markers(vec!["done for today".into()]))
        );
    }

    #[test]
    fn test_success_indicator_element_mode() {
        let config: Config = toml::from_str(
            r#"
[site.success_indicator]
type = "element"
value = ".signed"
"#,
        )
        .unwrap();
        assert_eq!(
            config.site.success_indicator,
            SuccessIndicator::Element(".signed".into())
        );
    }

    #[test]
    fn test_config_load_with_overrides() {
        let config = Config::default();
        let overrides = ConfigOverrides {
            headless: Some(true),
            port: Some(9333),
            chrome_path: None,
            socket_path: Some(PathBuf::from("/tmp/x.sock")),
        };

        let result = config.load_with_overrides(overrides);
        assert!(result.browser.headless);
        assert_eq!(result.browser.port, 9333);
        assert_eq!(result.server.socket_path, Some(PathBuf::from("/tmp/x.sock")));
    }

    #[test]
    fn test_config_merge_keeps_changed_sections() {
        let base = Config::default();
        let mut other = Config::default();
        other.site.button_selector = "#checkin".into();
        other.browser.chrome_path = Some(PathBuf::from("/usr/bin/chrome"));

        let merged = base.merge(other);
        assert_eq!(merged.site.button_selector, "#checkin");
        assert_eq!(
            merged.browser.chrome_path,
            Some(PathBuf::from("/usr/bin/chrome"))
        );
        assert_eq!(merged.schedule, ScheduleConfig::default());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("[site]"));
        assert!(toml_str.contains("[schedule]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_debug_logging_requires_both_flags() {
        let mut debug = DebugConfig::default();
        assert!(!debug.logging());
        debug.enabled = true;
        assert!(debug.logging());
        debug.verbose = false;
        assert!(!debug.logging());
    }
}
