use crate::{Result, SignInError};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast;

use super::protocol::{Request, Response, error_codes};

static CLIENT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

pub type ClientId = u64;

/// Newline-delimited JSON-RPC over a Unix socket.
pub struct IpcServer {
    socket_path: PathBuf,
    shutdown_tx: broadcast::Sender<()>,
}

impl IpcServer {
    pub fn new(socket_path: PathBuf) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            socket_path,
            shutdown_tx,
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub async fn bind(&self) -> Result<UnixListener> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }

        if let Some(parent) = self.socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        UnixListener::bind(&self.socket_path)
            .map_err(|e| SignInError::General(format!("Failed to bind socket: {}", e)))
    }

    pub async fn accept<F, Fut>(&self, listener: &UnixListener, on_request: F) -> Result<()>
    where
        F: Fn(Request) -> Fut + Send + Sync + Clone + 'static,
        Fut: std::future::Future<Output = Response> + Send,
    {
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, _)) => {
                            let client_id = CLIENT_ID_COUNTER.fetch_add(1, Ordering::SeqCst);
                            let on_request = on_request.clone();

                            tokio::spawn(async move {
                                Self::handle_client(stream, client_id, on_request).await;
                            });
                        }
                        Err(e) => {
                            tracing::error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    break;
                }
            }
        }

        Ok(())
    }

    async fn handle_client<F, Fut>(stream: UnixStream, client_id: ClientId, on_request: F)
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Response> + Send,
    {
        tracing::debug!("Client {} connected", client_id);
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();

        while let Ok(Some(line)) = lines.next_line().await {
            if line.trim().is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<Request>(&line) {
                Ok(request) => on_request(request).await,
                Err(e) => Response::error(
                    request_id(&line),
                    error_codes::PARSE_ERROR,
                    format!("Parse error: {}", e),
                ),
            };

            let Ok(json) = serde_json::to_string(&response) else {
                continue;
            };
            if write_half
                .write_all(format!("{}\n", json).as_bytes())
                .await
                .is_err()
            {
                break;
            }
        }

        tracing::debug!("Client {} disconnected", client_id);
    }

    pub fn shutdown(&self) {
        self.shutdown_tx.send(()).ok();
    }
}

/// Best-effort id of a request that failed to decode.
fn request_id(line: &str) -> u64 {
    serde_json::from_str::<serde_json::Value>(line)
        .ok()
        .and_then(|v| v.get("id").and_then(|id| id.as_u64()))
        .unwrap_or(0)
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path).ok();
        }
    }
}
