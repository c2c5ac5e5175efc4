use crate::config::Config;
use crate::server::protocol::{CoordinatorRequest, Reply, Request, Response, TabId};
use crate::state::{StateKey, Timestamps};
use crate::{Result, SignInError, timeouts::secs};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};

static REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// JSON-RPC client for the coordinator daemon.
pub struct CoordinatorClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    timeout: Duration,
}

impl CoordinatorClient {
    pub async fn connect(socket_path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(socket_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound
                || e.kind() == std::io::ErrorKind::ConnectionRefused
            {
                SignInError::DaemonNotRunning
            } else {
                SignInError::Connection(format!("Failed to connect to daemon: {}", e))
            }
        })?;
        let (read_half, writer) = stream.into_split();

        Ok(Self {
            reader: BufReader::new(read_half),
            writer,
            timeout: Duration::from_secs(secs::REQUEST / 2),
        })
    }

    pub async fn call(&mut self, call: CoordinatorRequest, origin: Option<TabId>) -> Result<Reply> {
        let id = REQUEST_ID.fetch_add(1, Ordering::SeqCst);
        let request = Request::new(id, call, origin);

        let json = serde_json::to_string(&request)?;
        self.writer
            .write_all(format!("{}\n", json).as_bytes())
            .await
            .map_err(|e| SignInError::Connection(format!("Write error: {}", e)))?;

        let mut line = String::new();
        match tokio::time::timeout(self.timeout, self.reader.read_line(&mut line)).await {
            Ok(Ok(0)) => return Err(SignInError::ConnectionLost),
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(SignInError::Connection(format!("Read error: {}", e))),
            Err(_) => {
                return Err(SignInError::Connection(format!(
                    "Request {} timed out",
                    id
                )));
            }
        }

        let response: Response = serde_json::from_str(&line)?;

        if let Some(error) = response.error {
            return Err(SignInError::Protocol {
                code: error.code,
                message: error.message,
            });
        }
        if response.id != id {
            return Err(SignInError::UnexpectedReply(format!(
                "response id {} for request {}",
                response.id, id
            )));
        }

        response
            .result
            .ok_or_else(|| SignInError::UnexpectedReply("empty result".into()))
    }

    pub async fn get_config(&mut self) -> Result<Config> {
        match self.call(CoordinatorRequest::GetConfig, None).await? {
            Reply::Config { config } => Ok(*config),
            other => Err(SignInError::UnexpectedReply(format!("{:?}", other))),
        }
    }

    pub async fn get_timestamps(&mut self) -> Result<Timestamps> {
        match self.call(CoordinatorRequest::GetStorageValues, None).await? {
            Reply::Timestamps(timestamps) => Ok(timestamps),
            other => Err(SignInError::UnexpectedReply(format!("{:?}", other))),
        }
    }

    pub async fn force_sign_in(&mut self) -> Result<(bool, String)> {
        match self.call(CoordinatorRequest::ForceSignIn, None).await? {
            Reply::Ack { success, message } => Ok((success, message.unwrap_or_default())),
            other => Err(SignInError::UnexpectedReply(format!("{:?}", other))),
        }
    }

    pub async fn reset_sign_time(&mut self) -> Result<()> {
        self.call(CoordinatorRequest::ResetSignTime, None).await?;
        Ok(())
    }

    pub async fn set_storage_value(&mut self, key: StateKey, value: i64) -> Result<()> {
        self.call(CoordinatorRequest::SetStorageValue { key, value }, None)
            .await?;
        Ok(())
    }
}

pub fn is_daemon_running(socket_path: &Path) -> bool {
    socket_path.exists() && std::os::unix::net::UnixStream::connect(socket_path).is_ok()
}
