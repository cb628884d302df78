//! Infrastructure layer: storage, event bus, write/read operations, config.

pub mod commands;
pub mod config;
pub mod event_bus;
pub mod queries;
pub mod storage;


pub use commands::{UserWriter, WriteError};
pub use config::{AppConfig, ConfigError};
pub use queries::UserReader;
pub use storage::{InMemoryUserStore, PostgresUserStore, StorageError, UserStore};
