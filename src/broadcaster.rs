//! Fan-out of one message to every session in a registry snapshot.
//!
//! Delivery is at most once per recipient. Session queues are unbounded, so
//! a live session always gets the message; a session whose queue has closed
//! is logged and skipped, never retried, and never stops the remaining sends.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::WireConfig;
use crate::display::DisplaySink;
use crate::error::AppError;
use crate::message::Message;
use crate::session::SessionHandle;

/// Outcome of one broadcast call
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Encodes messages once and queues them on every recipient
pub struct Broadcaster {
    wire: WireConfig,
    echo_to_sender: bool,
    sink: Arc<dyn DisplaySink>,
}

impl Broadcaster {
    pub fn new(wire: WireConfig, echo_to_sender: bool, sink: Arc<dyn DisplaySink>) -> Self {
        Self {
            wire,
            echo_to_sender,
            sink,
        }
    }

    /// Send `message` to each of `recipients`
    pub fn broadcast(&self, recipients: &[SessionHandle], message: &Message) -> BroadcastReport {
        let text = message.tagged();
        let payload = match self.wire.encode(&text) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Dropping unencodable broadcast: {}", e);
                self.sink.append(&format!("failed to send message: {e}"));
                return BroadcastReport::default();
            }
        };

        let mut report = BroadcastReport::default();
        for recipient in recipients {
            if !self.echo_to_sender && message.is_from(recipient.id) {
                continue;
            }

            match recipient.send(Arc::clone(&payload)) {
                Ok(()) => report.delivered += 1,
                Err(source) => {
                    report.failed += 1;
                    let err = AppError::BroadcastSend {
                        peer: recipient.peer_addr,
                        source,
                    };
                    warn!("{}", err);
                    self.sink.append(&format!("failed to send message: {err}"));
                }
            }
        }

        debug!(
            "Broadcast delivered: {}, failed: {}",
            report.delivered, report.failed
        );
        self.sink.append(&format!("sent: {text}"));
        report
    }
}
