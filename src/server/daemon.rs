use crate::{Result, SignInError};
use crate::actor::ActorDispatcher;
use crate::browser::{BrowserLauncher, ChromeTabs, PageLoad, PageLoadWatcher};
use crate::config::Config;
use crate::coordinator::{Coordinator, LifecycleEvent, ReachabilityTracker, VersionMarker};
use crate::notify::FallbackNotifier;
use crate::state::FileStateStore;
use crate::timeouts::secs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};

use super::ipc::IpcServer;
use super::protocol::{Request, Response, error_codes};

const DEFAULT_SOCKET_PATH: &str = "/tmp/auto-signin.sock";
const APP_NAME: &str = "auto-signin";

pub struct DaemonConfig {
    pub socket_path: PathBuf,
    pub state_path: PathBuf,
    pub version_marker_path: PathBuf,
}

impl DaemonConfig {
    pub fn resolve(config: &Config) -> Result<Self> {
        Ok(Self {
            socket_path: config
                .server
                .socket_path
                .clone()
                .unwrap_or_else(default_socket_path),
            state_path: FileStateStore::default_path()?,
            version_marker_path: VersionMarker::default_path()?,
        })
    }
}

pub struct Daemon {
    daemon_config: DaemonConfig,
    coordinator: Arc<Coordinator>,
    launcher: Arc<BrowserLauncher>,
    loads_tx: mpsc::UnboundedSender<PageLoad>,
    loads_rx: Mutex<Option<mpsc::UnboundedReceiver<PageLoad>>>,
    ipc_server: Arc<IpcServer>,
}

impl Daemon {
    pub fn new(config: Arc<Config>, daemon_config: DaemonConfig) -> Self {
        let (loads_tx, loads_rx) = mpsc::unbounded_channel();

        let launcher = Arc::new(BrowserLauncher::new(Arc::clone(&config)));
        let tabs =
            Arc::new(ChromeTabs::new(Arc::clone(&launcher)).with_page_loads(loads_tx.clone()));
        let store = Arc::new(FileStateStore::new(daemon_config.state_path.clone()));
        let coordinator = Arc::new(Coordinator::new(
            config,
            store,
            Arc::new(FallbackNotifier::new(APP_NAME)),
            tabs,
        ));
        let ipc_server = Arc::new(IpcServer::new(daemon_config.socket_path.clone()));

        Self {
            daemon_config,
            coordinator,
            launcher,
            loads_tx,
            loads_rx: Mutex::new(Some(loads_rx)),
            ipc_server,
        }
    }

    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    pub async fn start(&self) -> Result<()> {
        tracing::info!(
            "Daemon starting on {}",
            self.daemon_config.socket_path.display()
        );

        let listener = self.ipc_server.bind().await?;
        self.write_pid_file()?;

        self.spawn_page_actors().await;
        self.spawn_load_watcher();
        self.spawn_lifecycle();
        self.spawn_browser_watcher();

        let coordinator = self.coordinator.clone();
        self.ipc_server
            .accept(&listener, move |request| {
                let coordinator = coordinator.clone();
                async move { handle_request(request, &coordinator).await }
            })
            .await?;

        Ok(())
    }

    pub async fn run(&self) -> Result<()> {
        tokio::select! {
            result = self.start() => result,
            result = crate::utils::shutdown_signal() => {
                result?;
                self.stop().await
            }
        }
    }

    pub async fn stop(&self) -> Result<()> {
        tracing::info!("Daemon stopping...");
        self.coordinator.alarms().clear(crate::coordinator::SIGN_IN_ALARM);
        self.ipc_server.shutdown();
        self.remove_pid_file();
        tracing::info!("Daemon stopped");
        Ok(())
    }

    fn spawn_lifecycle(&self) {
        let installed = match VersionMarker::new(self.daemon_config.version_marker_path.clone())
            .check_and_update(env!("CARGO_PKG_VERSION"))
        {
            Ok(installed) => installed,
            Err(e) => {
                tracing::warn!("Could not read the version marker: {}", e);
                false
            }
        };

        let coordinator = self.coordinator.clone();
        tokio::spawn(async move {
            if installed {
                run_lifecycle(&coordinator, LifecycleEvent::Installed).await;
            }
            run_lifecycle(&coordinator, LifecycleEvent::ProcessStart).await;
        });
    }

    fn spawn_browser_watcher(&self) {
        let coordinator = self.coordinator.clone();
        let launcher = self.launcher.clone();

        tokio::spawn(async move {
            let mut tracker = ReachabilityTracker::new();
            let mut interval = tokio::time::interval(Duration::from_secs(secs::BROWSER_WATCH));
            loop {
                interval.tick().await;
                if tracker.observe(launcher.is_reachable().await) {
                    launcher.invalidate().await;
                    run_lifecycle(&coordinator, LifecycleEvent::BrowserStartup).await;
                }
            }
        });
    }

    async fn spawn_page_actors(&self) {
        let Some(loads_rx) = self.loads_rx.lock().await.take() else {
            return;
        };
        let dispatcher = Arc::new(ActorDispatcher::new(self.coordinator.clone()));
        tokio::spawn(dispatcher.run(loads_rx));
    }

    fn spawn_load_watcher(&self) {
        let watcher = PageLoadWatcher::new(self.launcher.clone(), self.loads_tx.clone());
        tokio::spawn(watcher.run());
    }

    fn pid_file_path(&self) -> PathBuf {
        pid_file_path(&self.daemon_config.socket_path)
    }

    fn write_pid_file(&self) -> Result<()> {
        let pid = std::process::id();
        std::fs::write(self.pid_file_path(), pid.to_string())?;
        Ok(())
    }

    fn remove_pid_file(&self) {
        std::fs::remove_file(self.pid_file_path()).ok();
    }

    pub fn read_pid(socket_path: &Path) -> Option<u32> {
        std::fs::read_to_string(pid_file_path(socket_path))
            .ok()
            .and_then(|s| s.trim().parse().ok())
    }

    pub fn is_running(socket_path: &Path) -> bool {
        Self::read_pid(socket_path).is_some_and(crate::utils::process_exists)
    }
}

async fn run_lifecycle(coordinator: &Arc<Coordinator>, event: LifecycleEvent) {
    match coordinator.on_lifecycle(event).await {
        Ok(outcome) => tracing::debug!("Poll cycle after {}: {:?}", event, outcome),
        Err(e) => tracing::error!("Poll cycle after {} failed: {}", event, e),
    }
}

/// Runs one decoded request against the Coordinator and maps failures to
/// JSON-RPC error codes.
pub async fn handle_request(request: Request, coordinator: &Coordinator) -> Response {
    let id = request.id;
    match coordinator.handle(request.call, request.origin).await {
        Ok(reply) => Response::success(id, reply),
        Err(e @ (SignInError::StorageError(_) | SignInError::IoError(_))) => {
            Response::error(id, error_codes::STORAGE_ERROR, e.to_string())
        }
        Err(
            e @ (SignInError::TabError(_)
            | SignInError::ConnectionLost
            | SignInError::Connection(_)
            | SignInError::LaunchFailed(_)),
        ) => Response::error(id, error_codes::BROWSER_ERROR, e.to_string()),
        Err(e) => Response::error(id, error_codes::INTERNAL_ERROR, e.to_string()),
    }
}

fn pid_file_path(socket_path: &Path) -> PathBuf {
    socket_path.with_extension("pid")
}

pub fn default_socket_path() -> PathBuf {
    PathBuf::from(DEFAULT_SOCKET_PATH)
}
