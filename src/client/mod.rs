mod connection;

pub use connection::{CoordinatorClient, is_daemon_running};
