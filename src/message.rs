//! Relay message definitions
//!
//! A message is plain text plus optional provenance. Relayed client text is
//! tagged with the sender's address when it is broadcast; operator text goes
//! out as-is.

use std::net::SocketAddr;

use crate::types::SessionId;

/// Where a relayed message came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin {
    pub session_id: SessionId,
    pub addr: SocketAddr,
}

/// Text queued for broadcast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    /// `None` for operator-authored text
    pub origin: Option<Origin>,
}

impl Message {
    /// Operator-authored text, sent untagged
    pub fn operator(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            origin: None,
        }
    }

    /// Text received from a client session
    pub fn relayed(origin: Origin, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            origin: Some(origin),
        }
    }

    /// Wire form: `"<address>:<text>"` for relayed text, the bare text otherwise
    pub fn tagged(&self) -> String {
        match &self.origin {
            Some(origin) => format!("{}:{}", origin.addr, self.text),
            None => self.text.clone(),
        }
    }

    /// Whether this message originated from the given session
    pub fn is_from(&self, session_id: SessionId) -> bool {
        self.origin
            .is_some_and(|origin| origin.session_id == session_id)
    }
}
