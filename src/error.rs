//! Error types for the relay server
//!
//! Defines application-level errors, wire codec errors and
//! per-recipient send errors. Uses thiserror for ergonomic error definitions.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Application-level errors
///
/// Only `Bind` and `ChannelSend` reach callers of the controller.
/// Everything else is terminal to one session or one recipient and ends
/// up as a Display Sink line.
#[derive(Debug, Error)]
pub enum AppError {
    /// Listening address unavailable (fatal to `start`)
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// Accept failed while the listener was still meant to be running
    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),

    /// Socket read/write error (fatal to the session)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Inbound bytes could not be decoded (fatal to the session)
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// One recipient of a broadcast could not be reached
    #[error("send to {peer} failed: {source}")]
    BroadcastSend {
        peer: SocketAddr,
        #[source]
        source: SendError,
    },

    /// Channel send error (fatal - hub task is gone)
    #[error("Channel send error")]
    ChannelSend,
}

/// Text encoding and framing errors
#[derive(Debug, Error)]
pub enum CodecError {
    /// Byte outside the 7-bit range under ASCII encoding
    #[error("non-ASCII byte 0x{byte:02x} at offset {offset}")]
    NonAscii { byte: u8, offset: usize },

    /// Invalid UTF-8 under UTF-8 encoding
    #[error("invalid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// A line grew past the configured maximum before a delimiter arrived
    #[error("line exceeds {0} bytes")]
    LineTooLong(usize),

    /// Underlying socket error surfaced by the line codec
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Outbound queue errors
///
/// Occurs when a broadcast cannot be queued for one session.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,
}
