use crate::client::CoordinatorClient;
use crate::config::Config;
use crate::coordinator::Coordinator;
use crate::notify::Notice;
use crate::server::protocol::{CoordinatorRequest, Reply, TabId};
use crate::state::{StateKey, Timestamps};
use crate::{Result, SignInError};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

/// The Page Actor's channel to the Coordinator.
#[async_trait]
pub trait CoordinatorLink: Send + Sync {
    async fn send(&self, request: CoordinatorRequest) -> Result<Reply>;

    async fn get_config(&self) -> Result<Config> {
        match self.send(CoordinatorRequest::GetConfig).await? {
            Reply::Config { config } => Ok(*config),
            other => Err(unexpected("get_config", &other)),
        }
    }

    async fn get_timestamps(&self) -> Result<Timestamps> {
        match self.send(CoordinatorRequest::GetStorageValues).await? {
            Reply::Timestamps(timestamps) => Ok(timestamps),
            other => Err(unexpected("get_storage_values", &other)),
        }
    }

    async fn set_storage_value(&self, key: StateKey, value: i64) -> Result<()> {
        self.send(CoordinatorRequest::SetStorageValue { key, value })
            .await
            .and_then(|reply| expect_ack("set_storage_value", reply))
            .map(|_| ())
    }

    async fn show_notification(&self, notice: &Notice) -> Result<()> {
        self.send(CoordinatorRequest::ShowNotification {
            title: notice.title.clone(),
            message: notice.message.clone(),
        })
        .await
        .and_then(|reply| expect_ack("show_notification", reply))
        .map(|_| ())
    }

    async fn sign_in_success(&self) -> Result<()> {
        self.send(CoordinatorRequest::SignInSuccess)
            .await
            .and_then(|reply| expect_ack("sign_in_success", reply))
            .map(|_| ())
    }

    /// Returns the Coordinator's `(success, message)` answer.
    async fn force_sign_in(&self) -> Result<(bool, String)> {
        let reply = self.send(CoordinatorRequest::ForceSignIn).await?;
        expect_ack("force_sign_in", reply)
    }

    async fn reset_sign_time(&self) -> Result<()> {
        self.send(CoordinatorRequest::ResetSignTime)
            .await
            .and_then(|reply| expect_ack("reset_sign_time", reply))
            .map(|_| ())
    }
}

fn unexpected(action: &str, reply: &Reply) -> SignInError {
    SignInError::UnexpectedReply(format!("{}: {:?}", action, reply))
}

fn expect_ack(action: &str, reply: Reply) -> Result<(bool, String)> {
    match reply {
        Reply::Ack { success, message } => Ok((success, message.unwrap_or_default())),
        other => Err(unexpected(action, &other)),
    }
}

/// Talks to a Coordinator living in the same process.
pub struct LocalLink {
    coordinator: Arc<Coordinator>,
    origin: Option<TabId>,
}

impl LocalLink {
    pub fn new(coordinator: Arc<Coordinator>, origin: Option<TabId>) -> Self {
        Self {
            coordinator,
            origin,
        }
    }
}

#[async_trait]
impl CoordinatorLink for LocalLink {
    async fn send(&self, request: CoordinatorRequest) -> Result<Reply> {
        self.coordinator.handle(request, self.origin.clone()).await
    }
}

/// Talks to the daemon over its socket.
pub struct IpcLink {
    client: Mutex<CoordinatorClient>,
    origin: Option<TabId>,
}

impl IpcLink {
    pub fn new(client: CoordinatorClient, origin: Option<TabId>) -> Self {
        Self {
            client: Mutex::new(client),
            origin,
        }
    }
}

#[async_trait]
impl CoordinatorLink for IpcLink {
    async fn send(&self, request: CoordinatorRequest) -> Result<Reply> {
        self.client
            .lock()
            .await
            .call(request, self.origin.clone())
            .await
    }
}
