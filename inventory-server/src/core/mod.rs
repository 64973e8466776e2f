//! Core server components

pub mod config;
pub mod state;

pub use config::{CacheBackend, Config, ConfigError};
pub use state::ServerState;
