//! Server and wire configuration
//!
//! Defaults reproduce the reference behavior: `127.0.0.1:8888`, backlog 5,
//! 1024-byte ASCII chunks with no framing, and a `connected!` greeting.

use std::net::{Ipv4Addr, SocketAddr};

use clap::ValueEnum;

/// Default listening address
pub const DEFAULT_ADDR: SocketAddr = SocketAddr::new(std::net::IpAddr::V4(Ipv4Addr::LOCALHOST), 8888);

/// Default pending-connection backlog
pub const DEFAULT_BACKLOG: u32 = 5;

/// Default receive chunk size in bytes
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Default handshake acknowledgement
pub const DEFAULT_GREETING: &str = "connected!";

/// Channel buffer size for hub commands
const CHANNEL_BUFFER_SIZE: usize = 256;

/// How messages are delimited on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Framing {
    /// Raw byte stream; one read is one message, whatever it contains
    #[default]
    Raw,
    /// Newline-terminated messages
    Lines,
}

/// How payload bytes map to text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TextEncoding {
    /// 7-bit ASCII only
    #[default]
    Ascii,
    /// UTF-8
    Utf8,
}

/// Settings shared by the server and the client side of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireConfig {
    /// Bytes per receive; also the maximum line length under `Framing::Lines`
    pub chunk_size: usize,
    pub framing: Framing,
    pub encoding: TextEncoding,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            framing: Framing::default(),
            encoding: TextEncoding::default(),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub backlog: u32,
    pub wire: WireConfig,
    /// Sent to every accepted connection before any broadcast
    pub greeting: String,
    /// Whether a relayed message is also sent back to its originator
    pub echo_to_sender: bool,
    pub command_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_ADDR,
            backlog: DEFAULT_BACKLOG,
            wire: WireConfig::default(),
            greeting: DEFAULT_GREETING.to_string(),
            echo_to_sender: true,
            command_buffer: CHANNEL_BUFFER_SIZE,
        }
    }
}

impl ServerConfig {
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    pub fn with_backlog(mut self, backlog: u32) -> Self {
        self.backlog = backlog.max(1);
        self
    }

    pub fn with_wire(mut self, wire: WireConfig) -> Self {
        self.wire = wire;
        self
    }

    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = greeting.into();
        self
    }

    pub fn with_echo_to_sender(mut self, echo: bool) -> Self {
        self.echo_to_sender = echo;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_behavior() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8888");
        assert_eq!(config.backlog, 5);
        assert_eq!(config.wire.chunk_size, 1024);
        assert_eq!(config.wire.framing, Framing::Raw);
        assert_eq!(config.wire.encoding, TextEncoding::Ascii);
        assert_eq!(config.greeting, "connected!");
        assert!(config.echo_to_sender);
    }

    #[test]
    fn test_builder_clamps_zero_backlog() {
        let config = ServerConfig::default().with_backlog(0);
        assert_eq!(config.backlog, 1);
    }
}
