//! Command-line interface

use std::net::SocketAddr;

use clap::{Args, Parser, Subcommand};

use crate::config::{
    Framing, ServerConfig, TextEncoding, WireConfig, DEFAULT_BACKLOG, DEFAULT_CHUNK_SIZE,
    DEFAULT_GREETING,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the relay server. Stdin lines are broadcast; /start, /stop,
    /// /sessions and /quit control the listener.
    Serve(ServeArgs),
    /// Connect to a relay server and chat from stdin.
    Connect(ConnectArgs),
}

#[derive(Args, Debug, Clone)]
pub struct WireArgs {
    /// Bytes per receive, also the maximum line length with --framing lines.
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Message framing on the wire.
    #[arg(long, value_enum, default_value_t = Framing::Raw)]
    pub framing: Framing,

    /// Payload text encoding.
    #[arg(long, value_enum, default_value_t = TextEncoding::Ascii)]
    pub encoding: TextEncoding,
}

impl WireArgs {
    pub fn to_wire(&self) -> WireConfig {
        WireConfig {
            chunk_size: self.chunk_size,
            framing: self.framing,
            encoding: self.encoding,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Socket address to listen on. Use port 0 for an ephemeral port.
    #[arg(long, default_value = "127.0.0.1:8888")]
    pub listen: SocketAddr,

    /// Pending connection backlog.
    #[arg(long, default_value_t = DEFAULT_BACKLOG)]
    pub backlog: u32,

    /// Acknowledgement sent to every new connection.
    #[arg(long, default_value = DEFAULT_GREETING)]
    pub greeting: String,

    /// Do not echo relayed messages back to their sender.
    #[arg(long)]
    pub exclude_sender: bool,

    #[command(flatten)]
    pub wire: WireArgs,
}

impl ServeArgs {
    pub fn to_config(&self) -> ServerConfig {
        ServerConfig::default()
            .with_bind_addr(self.listen)
            .with_backlog(self.backlog)
            .with_greeting(self.greeting.clone())
            .with_echo_to_sender(!self.exclude_sender)
            .with_wire(self.wire.to_wire())
    }
}

#[derive(Args, Debug, Clone)]
pub struct ConnectArgs {
    /// Address of the relay server.
    #[arg(long, default_value = "127.0.0.1:8888")]
    pub server: SocketAddr,

    #[command(flatten)]
    pub wire: WireArgs,
}
