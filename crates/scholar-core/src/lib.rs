//! Scholar Core - transcript, sessions, and the conversation loop
//!
//! The pieces that make up the chat assistant: the append-only conversation
//! transcript, the completion provider abstraction, the tool server session
//! manager, and the loop that ties them together.

pub mod chat;
pub mod command;
pub mod config;
pub mod error;
pub mod provider;
pub mod sessions;
pub mod transcript;

pub use chat::{ChatEvent, ChatLoop, LoopControl};
pub use config::{Config, ConfigManager, McpServerConfig, ProviderConfig};
pub use error::{Error, Result};
pub use sessions::SessionManager;
pub use transcript::{ToolCallRequest, Transcript, Turn, TurnContent};
