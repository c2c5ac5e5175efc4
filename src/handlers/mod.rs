pub mod config_handler;
pub mod sign;
pub mod status;
