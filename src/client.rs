//! Chat client
//!
//! Connects to a relay server, shows everything it receives on a Display
//! Sink from a background task, and sends typed text.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::codec::MessageReader;
use crate::config::WireConfig;
use crate::display::DisplaySink;
use crate::error::AppError;

/// A connected client
pub struct ChatClient {
    writer: OwnedWriteHalf,
    wire: WireConfig,
    sink: Arc<dyn DisplaySink>,
    receiver: JoinHandle<()>,
}

impl ChatClient {
    /// Connect and start receiving
    pub async fn connect(
        addr: SocketAddr,
        wire: WireConfig,
        sink: Arc<dyn DisplaySink>,
    ) -> Result<Self, AppError> {
        let stream = match TcpStream::connect(addr).await {
            Ok(stream) => stream,
            Err(e) => {
                sink.append(&format!("connection failed: {e}"));
                return Err(e.into());
            }
        };
        let (read_half, writer) = stream.into_split();
        sink.append(&format!("connected to {addr}"));

        let receiver = tokio::spawn(receive(
            MessageReader::new(read_half, &wire),
            Arc::clone(&sink),
        ));

        Ok(Self {
            writer,
            wire,
            sink,
            receiver,
        })
    }

    /// Send one message
    pub async fn send(&mut self, text: &str) -> Result<(), AppError> {
        let payload = self.wire.encode(text)?;
        self.writer.write_all(&payload).await?;
        self.sink.append(&format!("sent: {text}"));
        Ok(())
    }

    /// Local address of this connection, as the server sees it
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.writer.local_addr()
    }

    /// Whether the receive loop is still running
    pub fn is_connected(&self) -> bool {
        !self.receiver.is_finished()
    }

    /// Close the connection and stop receiving
    pub async fn disconnect(mut self) {
        let _ = self.writer.shutdown().await;
        self.receiver.abort();
        let _ = (&mut self.receiver).await;
        self.sink.append("disconnected");
    }
}

impl Drop for ChatClient {
    fn drop(&mut self) {
        self.receiver.abort();
    }
}

async fn receive(mut reader: MessageReader<OwnedReadHalf>, sink: Arc<dyn DisplaySink>) {
    loop {
        match reader.next_message().await {
            Ok(Some(text)) => sink.append(&text),
            Ok(None) => {
                sink.append("server closed the connection");
                break;
            }
            Err(e) => {
                sink.append(&format!("receive error: {e}"));
                break;
            }
        }
    }
    debug!("Receive loop ended");
}
