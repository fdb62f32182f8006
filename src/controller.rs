//! Server controller
//!
//! Toggles the listener between `Stopped` and `Listening`. The state lives
//! here only; the accept loop and the session tasks see the transition to
//! `Stopped` through a cancellation token, which also closes every session
//! socket so `stop()` never waits on a peer.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::broadcaster::Broadcaster;
use crate::config::ServerConfig;
use crate::display::DisplaySink;
use crate::error::AppError;
use crate::hub::HubHandle;
use crate::listener::Listener;
use crate::message::Message;
use crate::session::{SessionContext, SessionInfo};
use crate::typist::{OperatorInput, OutboundTypist};
use crate::types::ServerState;

/// A started listener and the means to stop it
struct Running {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
    accept_loop: JoinHandle<usize>,
}

/// Starts, stops and restarts the relay server
///
/// Must be created inside a tokio runtime: the hub task is spawned on
/// construction and lives as long as the controller.
pub struct ServerController {
    config: ServerConfig,
    sink: Arc<dyn DisplaySink>,
    hub: HubHandle,
    running: Option<Running>,
}

impl ServerController {
    pub fn new(config: ServerConfig, sink: Arc<dyn DisplaySink>) -> Self {
        let broadcaster = Broadcaster::new(config.wire, config.echo_to_sender, Arc::clone(&sink));
        let hub = HubHandle::spawn(broadcaster, config.command_buffer);
        Self {
            config,
            sink,
            hub,
            running: None,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> ServerState {
        if self.running.is_some() {
            ServerState::Listening
        } else {
            ServerState::Stopped
        }
    }

    /// Bound address while listening
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.local_addr)
    }

    /// Bind and start accepting
    ///
    /// A no-op returning the current address if already listening.
    pub fn start(&mut self) -> Result<SocketAddr, AppError> {
        if let Some(running) = &self.running {
            debug!("Start ignored, already listening on {}", running.local_addr);
            return Ok(running.local_addr);
        }

        let greeting = self.config.wire.encode(&self.config.greeting)?;
        let listener = match Listener::bind(self.config.bind_addr, self.config.backlog) {
            Ok(listener) => listener,
            Err(e) => {
                error!("{}", e);
                self.sink.append(&format!("server failed to start: {e}"));
                return Err(e);
            }
        };
        let local_addr = listener.local_addr();
        let shutdown = CancellationToken::new();

        let ctx = SessionContext {
            hub: self.hub.clone(),
            wire: self.config.wire,
            greeting,
            sink: Arc::clone(&self.sink),
            shutdown: shutdown.clone(),
        };
        let accept_loop = tokio::spawn(listener.run(ctx));

        self.running = Some(Running {
            local_addr,
            shutdown,
            accept_loop,
        });

        info!("Relay server listening on {}", local_addr);
        self.sink.append(&format!("server started on {local_addr}"));
        Ok(local_addr)
    }

    /// Stop accepting, close every session and wait for their tasks
    ///
    /// A no-op if already stopped.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            debug!("Stop ignored, not listening");
            return;
        };

        running.shutdown.cancel();
        self.sink.append("server stopped");

        match running.accept_loop.await {
            Ok(drained) => info!(
                "Listener on {} stopped, {} sessions closed",
                running.local_addr, drained
            ),
            Err(e) => error!("Accept loop task failed: {}", e),
        }
    }

    /// Broadcast operator-authored text to every session
    pub async fn broadcast(&self, text: impl Into<String>) -> Result<(), AppError> {
        self.hub.broadcast(Message::operator(text)).await
    }

    /// Currently registered sessions
    pub async fn sessions(&self) -> Result<Vec<SessionInfo>, AppError> {
        self.hub.sessions().await
    }

    /// Serve operator commands from `typist` until `/quit` or `interrupt`
    ///
    /// An exhausted typist only ends input: the server keeps relaying until
    /// `interrupt` resolves. Stops the server before returning.
    pub async fn operate<T, F>(&mut self, typist: &mut T, interrupt: F) -> Result<(), AppError>
    where
        T: OutboundTypist,
        F: Future<Output = ()>,
    {
        tokio::pin!(interrupt);
        let mut reading = true;

        loop {
            let line = tokio::select! {
                _ = &mut interrupt => {
                    info!("Interrupted");
                    break;
                }
                line = typist.next_message(), if reading => line?,
            };

            let Some(line) = line else {
                info!("Operator input closed, serving until interrupted");
                reading = false;
                continue;
            };

            match OperatorInput::parse(&line) {
                None => {}
                Some(OperatorInput::Start) => {
                    if let Err(e) = self.start() {
                        warn!("Start failed: {}", e);
                    }
                }
                Some(OperatorInput::Stop) => self.stop().await,
                Some(OperatorInput::Sessions) => {
                    let sessions = self.sessions().await?;
                    self.sink.append(&format!(
                        "{} session(s), server {}",
                        sessions.len(),
                        self.state()
                    ));
                    for session in sessions {
                        self.sink
                            .append(&format!("  {} {}", session.id, session.peer_addr));
                    }
                }
                Some(OperatorInput::Quit) => break,
                Some(OperatorInput::Say(text)) => self.broadcast(text).await?,
            }
        }

        self.stop().await;
        Ok(())
    }
}

impl Drop for ServerController {
    fn drop(&mut self) {
        if let Some(running) = &self.running {
            running.shutdown.cancel();
        }
    }
}
