//! Command implementations.

pub mod chat;
pub mod config;
pub mod discover;

pub use self::chat::execute_chat;
pub use self::config::execute_config;
pub use self::discover::execute_discover;
