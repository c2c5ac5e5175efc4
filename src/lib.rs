pub mod actor;
pub mod browser;
pub mod cli;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod handlers;
pub mod notify;
pub mod output;
pub mod schedule;
pub mod server;
pub mod state;
pub mod timeouts;
pub mod utils;

pub use config::{Config, SuccessIndicator};
pub use coordinator::{Coordinator, LifecycleEvent, PollOutcome};
pub use error::SignInError;

pub type Result<T> = std::result::Result<T, SignInError>;
