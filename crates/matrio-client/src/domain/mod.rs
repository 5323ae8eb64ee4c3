//! Domain layer for the client: configuration only.

pub mod config;

pub use config::{load_config, ClientConfig, ConfigError};
