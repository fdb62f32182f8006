//! Display Sink
//!
//! Human-readable status lines (connections, relayed text, failures) are
//! appended to a sink. The server never reports errors any other way.

use tokio::sync::mpsc;
use tracing::info;

/// Receives human-readable log lines
pub trait DisplaySink: Send + Sync + 'static {
    /// Append one line
    fn append(&self, line: &str);
}

/// Renders lines as `info` events under the `chat_relay::display` target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DisplaySink for TracingSink {
    fn append(&self, line: &str) {
        info!(target: "chat_relay::display", "{}", line);
    }
}

/// Forwards lines to an unbounded channel
///
/// Lets tests and embedding front-ends observe what the server reports.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<String>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl DisplaySink for ChannelSink {
    fn append(&self, line: &str) {
        // Nobody watching is fine
        let _ = self.sender.send(line.to_string());
    }
}
