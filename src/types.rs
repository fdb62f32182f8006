//! Basic type definitions for the relay server
//!
//! Provides newtype wrappers and lifecycle states:
//! - `SessionId`: UUID-based unique session identifier
//! - `SessionState`: per-connection lifecycle
//! - `ServerState`: listener lifecycle owned by the controller

use std::fmt;

use uuid::Uuid;

/// Unique session identifier (newtype pattern)
///
/// Wraps a UUID v4 for type-safe session identification.
/// Implements Hash and Eq so it can key the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Create a new random session ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of one accepted connection
///
/// Only moves forward: `Active` → `Closing` → `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    /// Reader loop running, registered for broadcasts
    Active,
    /// Reader loop exited, tearing down
    Closing,
    /// Connection handle closed
    Closed,
}

impl SessionState {
    /// Whether moving from `self` to `next` is a legal forward step
    pub fn can_advance_to(self, next: SessionState) -> bool {
        matches!(
            (self, next),
            (SessionState::Active, SessionState::Closing)
                | (SessionState::Closing, SessionState::Closed)
        )
    }
}

/// Listener lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// No listening socket
    Stopped,
    /// Accept loop running
    Listening,
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerState::Stopped => f.write_str("stopped"),
            ServerState::Listening => f.write_str("listening"),
        }
    }
}
