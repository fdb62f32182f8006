//! Per-connection session
//!
//! Each accepted connection gets one task running [`run_session`]: it
//! registers with the hub, starts a writer task that drains the session's
//! outbound queue onto the socket, and then runs the reader loop until the
//! peer closes, an error occurs, or the server shuts down.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::codec::MessageReader;
use crate::config::WireConfig;
use crate::display::DisplaySink;
use crate::error::{AppError, SendError};
use crate::hub::HubHandle;
use crate::message::{Message, Origin};
use crate::types::{SessionId, SessionState};

/// Encoded bytes queued for one session's socket
pub type Payload = Arc<[u8]>;

/// One accepted connection, owned by its session task
#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    pub peer_addr: SocketAddr,
    state: SessionState,
}

impl Session {
    pub fn new(peer_addr: SocketAddr) -> Self {
        Self {
            id: SessionId::new(),
            peer_addr,
            state: SessionState::Active,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Move the lifecycle forward; backwards or skipping steps is refused
    pub fn advance(&mut self, next: SessionState) -> bool {
        if !self.state.can_advance_to(next) {
            warn!(
                "Session {} refused transition {:?} -> {:?}",
                self.id, self.state, next
            );
            return false;
        }
        self.state = next;
        true
    }

    pub fn origin(&self) -> Origin {
        Origin {
            session_id: self.id,
            addr: self.peer_addr,
        }
    }
}

/// The registry's view of a session
///
/// Cheap to clone; broadcast snapshots hold copies of these.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub id: SessionId,
    pub peer_addr: SocketAddr,
    outbound: mpsc::UnboundedSender<Payload>,
}

impl SessionHandle {
    pub fn new(
        id: SessionId,
        peer_addr: SocketAddr,
        outbound: mpsc::UnboundedSender<Payload>,
    ) -> Self {
        Self {
            id,
            peer_addr,
            outbound,
        }
    }

    /// Queue a payload without waiting
    ///
    /// The queue is unbounded, so a live session never loses a message;
    /// this only fails once the session's writer has gone away.
    pub fn send(&self, payload: Payload) -> Result<(), SendError> {
        self.outbound
            .send(payload)
            .map_err(|_| SendError::ChannelClosed)
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id,
            peer_addr: self.peer_addr,
        }
    }
}

/// Public summary of a registered session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: SessionId,
    pub peer_addr: SocketAddr,
}

/// Everything a session task needs from the server
#[derive(Clone)]
pub struct SessionContext {
    pub hub: HubHandle,
    pub wire: WireConfig,
    /// Already encoded and framed
    pub greeting: Payload,
    pub sink: Arc<dyn DisplaySink>,
    pub shutdown: CancellationToken,
}

/// Why a reader loop ended without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    PeerClosed,
    Shutdown,
}

/// Drive one accepted connection to completion
pub async fn run_session(stream: TcpStream, peer_addr: SocketAddr, ctx: SessionContext) {
    let mut session = Session::new(peer_addr);
    ctx.sink.append(&format!("connection from {peer_addr}"));

    let (read_half, write_half) = stream.into_split();
    let (outbound, queue) = mpsc::unbounded_channel::<Payload>();

    // Greeting goes in first so it precedes any broadcast on the wire
    if outbound.send(Arc::clone(&ctx.greeting)).is_err() {
        error!("Session {} could not queue greeting", session.id);
        return;
    }

    match ctx
        .hub
        .register(SessionHandle::new(session.id, peer_addr, outbound))
        .await
    {
        // Fresh v4 ids never collide
        Ok(added) => debug_assert!(added, "session {} registered twice", session.id),
        Err(e) => {
            error!("Failed to register session {} - hub closed: {}", session.id, e);
            return;
        }
    }

    info!("Session {} connected from {}", session.id, peer_addr);

    // Writer starts only after registration, so a peer that has read the
    // greeting is guaranteed to be in the registry
    let writer = tokio::spawn(write_outbound(write_half, queue, ctx.shutdown.clone()));

    let outcome = read_inbound(&session, read_half, &ctx).await;

    session.advance(SessionState::Closing);
    match outcome {
        Ok(SessionEnd::PeerClosed) => {
            ctx.sink.append(&format!("{peer_addr} disconnected"));
        }
        Ok(SessionEnd::Shutdown) => {
            ctx.sink.append(&format!("{peer_addr} closed by server shutdown"));
        }
        Err(e) => {
            warn!("Session {} error: {}", session.id, e);
            ctx.sink.append(&format!("error from {peer_addr}: {e}"));
        }
    }

    if let Err(e) = ctx.hub.unregister(session.id).await {
        debug!("Hub gone while unregistering {}: {}", session.id, e);
    }

    // Anything still queued for a closing session is dropped
    writer.abort();
    let _ = writer.await;
    session.advance(SessionState::Closed);

    info!("Session {} closed", session.id);
}

/// Reader loop: decode inbound text and hand it to the hub for broadcast
async fn read_inbound(
    session: &Session,
    read_half: OwnedReadHalf,
    ctx: &SessionContext,
) -> Result<SessionEnd, AppError> {
    let mut reader = MessageReader::new(read_half, &ctx.wire);

    loop {
        let next = tokio::select! {
            _ = ctx.shutdown.cancelled() => {
                debug!("Shutdown observed by session {}", session.id);
                return Ok(SessionEnd::Shutdown);
            }
            next = reader.next_message() => next?,
        };

        let Some(text) = next else {
            debug!("Peer {} closed its write side", session.peer_addr);
            return Ok(SessionEnd::PeerClosed);
        };

        ctx.sink
            .append(&format!("client {}: {}", session.peer_addr, text));
        ctx.hub
            .broadcast(Message::relayed(session.origin(), text))
            .await?;
    }
}

/// Writer loop: drain the outbound queue onto the socket
async fn write_outbound(
    mut writer: OwnedWriteHalf,
    mut queue: mpsc::UnboundedReceiver<Payload>,
    shutdown: CancellationToken,
) {
    loop {
        let payload = tokio::select! {
            _ = shutdown.cancelled() => break,
            payload = queue.recv() => match payload {
                Some(payload) => payload,
                None => break,
            },
        };

        if let Err(e) = writer.write_all(&payload).await {
            debug!("Socket write failed, ending writer: {}", e);
            break;
        }
    }

    let _ = writer.shutdown().await;
    debug!("Writer task ended");
}
