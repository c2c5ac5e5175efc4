use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignInError {
    #[error("Failed to launch Chrome: {0}")]
    LaunchFailed(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Chrome connection lost")]
    ConnectionLost,

    #[error("Tab operation failed: {0}")]
    TabError(String),

    #[error("Element not found: {selector}")]
    ElementNotFound { selector: String },

    #[error("JavaScript evaluation failed: {0}")]
    EvaluationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Storage operation failed: {0}")]
    StorageError(String),

    #[error("Notification failed: {0}")]
    NotificationError(String),

    #[error("Protocol error {code}: {message}")]
    Protocol { code: i32, message: String },

    #[error("Coordinator daemon is not running")]
    DaemonNotRunning,

    #[error("Unexpected reply from coordinator: {0}")]
    UnexpectedReply(String),

    #[error("File I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDeError(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    #[error("Invalid port: {0}")]
    InvalidPort(u16),

    #[error("General error: {0}")]
    General(String),
}

impl SignInError {
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::LaunchFailed(_) => vec![
                "Ensure Chrome/Chromium is installed".into(),
                "Check if another Chrome instance is using the debugging port".into(),
                "Try specifying Chrome path with --chrome-path".into(),
            ],
            Self::ConnectionLost | Self::Connection(_) => vec![
                "Check if Chrome was closed manually".into(),
                "Verify the debugging port with --port".into(),
            ],
            Self::TabError(_) => vec![
                "Check that the browser is still running".into(),
                "The next scheduled check will retry automatically".into(),
            ],
            Self::ElementNotFound { selector } => vec![
                "Verify the selector syntax is correct".into(),
                format!("Check if element '{}' still exists on the page", selector),
                "Update site.button_selector in the config file".into(),
            ],
            Self::ConfigError(_) | Self::TomlDeError(_) | Self::TomlSerError(_) => vec![
                "Check configuration file syntax".into(),
                "Run `auto-signin config show` to inspect the effective config".into(),
                "Use --config to specify a different config file".into(),
            ],
            Self::InvalidUrl(_) => vec![
                "Ensure URL includes protocol (http:// or https://)".into(),
                "Check for typos in site.sign_in_url".into(),
            ],
            Self::StorageError(_) => vec![
                "Check write permissions for the config directory".into(),
                "Remove a corrupted state.json to start from zero".into(),
            ],
            Self::DaemonNotRunning => vec![
                "Start the coordinator with: auto-signin daemon start".into(),
                "Check the socket path with --config".into(),
            ],
            Self::InvalidPort(port) => vec![
                format!("Port {} is out of valid range (1024-65535)", port),
                "Use --port to specify a different port".into(),
            ],
            _ => vec![
                "Run with --verbose for more details".into(),
                "Check the documentation for help".into(),
            ],
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::LaunchFailed(_) | Self::ConnectionLost | Self::Connection(_) => 3,
            Self::DaemonNotRunning | Self::Protocol { .. } | Self::UnexpectedReply(_) => 4,
            Self::ElementNotFound { .. } => 5,
            Self::IoError(_) | Self::StorageError(_) => 6,
            Self::ConfigError(_)
            | Self::TomlDeError(_)
            | Self::TomlSerError(_)
            | Self::InvalidPort(_) => 7,
            Self::InvalidUrl(_) => 2,
            _ => 1,
        }
    }
}
