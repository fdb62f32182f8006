//! Multi-client TCP Chat Relay Library
//!
//! A TCP relay server that accepts any number of clients and broadcasts
//! every message it receives to all connected sessions, tagged with the
//! sender's address.
//!
//! # Features
//! - Start/stop/restart of the listener
//! - `connected!` greeting on every accepted connection
//! - Relay of client text as `"<address>:<text>"` to every session
//! - Operator broadcasts
//! - Fan-out that skips closed sessions without stalling the rest
//! - Prompt shutdown that closes every session socket
//! - Raw (default) or newline framing, ASCII (default) or UTF-8 text
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `Hub` is the central actor owning the session registry and broadcasting
//! - Each connection has a session task (reader) plus a writer task
//! - `ServerController` owns the listener state and a cancellation token
//! - No locks needed - all registry access goes through message passing
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use chat_relay::{ServerConfig, ServerController, TracingSink};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut controller = ServerController::new(ServerConfig::default(), Arc::new(TracingSink));
//!     controller.start()?;
//!     controller.broadcast("hello everyone").await?;
//!     controller.stop().await;
//!     Ok(())
//! }
//! ```

pub mod broadcaster;
pub mod cli;
pub mod client;
pub mod codec;
pub mod config;
pub mod controller;
pub mod display;
pub mod error;
pub mod hub;
pub mod listener;
pub mod message;
pub mod registry;
pub mod session;
pub mod typist;
pub mod types;

// Re-export main types for convenience
pub use broadcaster::{BroadcastReport, Broadcaster};
pub use client::ChatClient;
pub use codec::MessageReader;
pub use config::{Framing, ServerConfig, TextEncoding, WireConfig};
pub use controller::ServerController;
pub use display::{ChannelSink, DisplaySink, TracingSink};
pub use error::{AppError, CodecError, SendError};
pub use hub::{Hub, HubCommand, HubHandle};
pub use listener::Listener;
pub use message::{Message, Origin};
pub use registry::SessionRegistry;
pub use session::{Session, SessionHandle, SessionInfo};
pub use typist::{LineTypist, OperatorInput, OutboundTypist};
pub use types::{ServerState, SessionId, SessionState};
