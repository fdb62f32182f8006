//! Hub actor implementation
//!
//! The central actor that owns the session registry and runs every broadcast.
//! Session tasks and the controller talk to it through an mpsc channel, so
//! registry mutation and broadcast snapshots never race.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::broadcaster::Broadcaster;
use crate::error::AppError;
use crate::message::Message;
use crate::registry::SessionRegistry;
use crate::session::{SessionHandle, SessionInfo};
use crate::types::SessionId;

/// Commands sent to the Hub actor
#[derive(Debug)]
pub enum HubCommand {
    /// New session accepted; replies `false` on a duplicate ID
    Register {
        handle: SessionHandle,
        reply: oneshot::Sender<bool>,
    },
    /// Session reader loop exited
    Unregister { session_id: SessionId },
    /// Fan a message out to every registered session
    Broadcast { message: Message },
    /// List the registered sessions
    Snapshot {
        reply: oneshot::Sender<Vec<SessionInfo>>,
    },
}

/// The Hub actor
pub struct Hub {
    registry: SessionRegistry,
    broadcaster: Broadcaster,
    receiver: mpsc::Receiver<HubCommand>,
}

impl Hub {
    /// Create a new Hub with the given command receiver
    pub fn new(receiver: mpsc::Receiver<HubCommand>, broadcaster: Broadcaster) -> Self {
        Self {
            registry: SessionRegistry::new(),
            broadcaster,
            receiver,
        }
    }

    /// Run the Hub event loop
    ///
    /// Continuously receives and processes commands until all senders are dropped.
    pub async fn run(mut self) {
        info!("Hub started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!("Hub shutting down");
    }

    /// Process a single command
    fn handle_command(&mut self, cmd: HubCommand) {
        match cmd {
            HubCommand::Register { handle, reply } => {
                let session_id = handle.id;
                let added = self.registry.add(handle);
                if added {
                    debug!("Session {} registered", session_id);
                }
                debug!("Total sessions: {}", self.registry.len());
                let _ = reply.send(added);
            }
            HubCommand::Unregister { session_id } => {
                if self.registry.remove(session_id).is_some() {
                    debug!("Session {} unregistered", session_id);
                }
                debug!("Total sessions: {}", self.registry.len());
            }
            HubCommand::Broadcast { message } => {
                let recipients = self.registry.snapshot();
                self.broadcaster.broadcast(&recipients, &message);
            }
            HubCommand::Snapshot { reply } => {
                let _ = reply.send(self.registry.infos());
            }
        }
    }
}

/// Cloneable front door to a running Hub
#[derive(Debug, Clone)]
pub struct HubHandle {
    sender: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    /// Spawn a Hub task and return a handle to it
    pub fn spawn(broadcaster: Broadcaster, buffer: usize) -> Self {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        tokio::spawn(Hub::new(receiver, broadcaster).run());
        Self { sender }
    }

    pub async fn register(&self, handle: SessionHandle) -> Result<bool, AppError> {
        let (reply, response) = oneshot::channel();
        self.send(HubCommand::Register { handle, reply }).await?;
        response.await.map_err(|_| AppError::ChannelSend)
    }

    pub async fn unregister(&self, session_id: SessionId) -> Result<(), AppError> {
        self.send(HubCommand::Unregister { session_id }).await
    }

    pub async fn broadcast(&self, message: Message) -> Result<(), AppError> {
        self.send(HubCommand::Broadcast { message }).await
    }

    pub async fn sessions(&self) -> Result<Vec<SessionInfo>, AppError> {
        let (reply, response) = oneshot::channel();
        self.send(HubCommand::Snapshot { reply }).await?;
        response.await.map_err(|_| AppError::ChannelSend)
    }

    async fn send(&self, cmd: HubCommand) -> Result<(), AppError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| AppError::ChannelSend)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::WireConfig;
    use crate::display::ChannelSink;
    use crate::message::Origin;
    use crate::session::Payload;

    fn spawn_hub() -> (HubHandle, mpsc::UnboundedReceiver<String>) {
        let (sink, lines) = ChannelSink::new();
        let broadcaster = Broadcaster::new(WireConfig::default(), true, Arc::new(sink));
        (HubHandle::spawn(broadcaster, 16), lines)
    }

    fn session(port: u16) -> (SessionHandle, mpsc::UnboundedReceiver<Payload>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let addr = format!("127.0.0.1:{port}").parse().unwrap();
        (SessionHandle::new(SessionId::new(), addr, tx), rx)
    }

    #[tokio::test]
    async fn test_register_and_unregister() {
        let (hub, _lines) = spawn_hub();
        let (a, _rx_a) = session(1000);
        let (b, _rx_b) = session(1001);
        let a_id = a.id;

        assert!(hub.register(a.clone()).await.unwrap());
        assert!(!hub.register(a).await.unwrap());
        assert!(hub.register(b).await.unwrap());
        assert_eq!(hub.sessions().await.unwrap().len(), 2);

        hub.unregister(a_id).await.unwrap();
        hub.unregister(a_id).await.unwrap();
        let remaining = hub.sessions().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].peer_addr.port(), 1001);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_registered_session() {
        let (hub, mut lines) = spawn_hub();
        let (a, mut rx_a) = session(1000);
        let (b, mut rx_b) = session(1001);
        let origin = Origin {
            session_id: a.id,
            addr: a.peer_addr,
        };
        hub.register(a).await.unwrap();
        hub.register(b).await.unwrap();

        hub.broadcast(Message::relayed(origin, "hello")).await.unwrap();

        assert_eq!(&rx_a.recv().await.unwrap()[..], b"127.0.0.1:1000:hello");
        assert_eq!(&rx_b.recv().await.unwrap()[..], b"127.0.0.1:1000:hello");
        assert_eq!(lines.recv().await.unwrap(), "sent: 127.0.0.1:1000:hello");
    }

    #[tokio::test]
    async fn test_unregistered_session_misses_later_broadcasts() {
        let (hub, _lines) = spawn_hub();
        let (a, mut rx_a) = session(1000);
        let a_id = a.id;
        hub.register(a).await.unwrap();
        hub.unregister(a_id).await.unwrap();

        hub.broadcast(Message::operator("late")).await.unwrap();
        // Snapshot round-trip orders us after the broadcast
        hub.sessions().await.unwrap();

        // Registry dropped its sender, so the queue is closed and empty
        assert!(rx_a.recv().await.is_none());
    }
}
