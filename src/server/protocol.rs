pub use crate::browser::TabId;
use crate::config::Config;
use crate::state::{StateKey, Timestamps};
use serde::{Deserialize, Serialize};

/// Everything a Page Actor or the CLI may ask of the Coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CoordinatorRequest {
    GetConfig,
    GetStorageValues,
    SetStorageValue { key: StateKey, value: i64 },
    ShowNotification { title: String, message: String },
    SignInSuccess,
    ForceSignIn,
    ResetSignTime,
}

impl CoordinatorRequest {
    pub fn action(&self) -> &'static str {
        match self {
            Self::GetConfig => "get_config",
            Self::GetStorageValues => "get_storage_values",
            Self::SetStorageValue { .. } => "set_storage_value",
            Self::ShowNotification { .. } => "show_notification",
            Self::SignInSuccess => "sign_in_success",
            Self::ForceSignIn => "force_sign_in",
            Self::ResetSignTime => "reset_sign_time",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reply {
    Config {
        config: Box<Config>,
    },
    Timestamps(Timestamps),
    Ack {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl Reply {
    pub fn ok() -> Self {
        Self::Ack {
            success: true,
            message: None,
        }
    }

    pub fn ack(success: bool, message: impl Into<String>) -> Self {
        Self::Ack {
            success,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub id: u64,
    pub call: CoordinatorRequest,
    /// Tab the request originates from, when sent by a Page Actor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<TabId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Reply>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

impl Request {
    pub fn new(id: u64, call: CoordinatorRequest, origin: Option<TabId>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            call,
            origin,
        }
    }
}

impl Response {
    pub fn success(id: u64, result: Reply) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: u64, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INTERNAL_ERROR: i32 = -32603;
    pub const STORAGE_ERROR: i32 = -32000;
    pub const BROWSER_ERROR: i32 = -32001;
}
