pub mod daemon;
pub mod ipc;
pub mod protocol;

pub use daemon::{Daemon, DaemonConfig, default_socket_path, handle_request};
pub use ipc::IpcServer;
pub use protocol::{CoordinatorRequest, Reply, Request, Response};
