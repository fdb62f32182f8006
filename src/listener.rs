//! TCP listener and accept loop
//!
//! Owns the listening socket. Every accepted connection becomes a session task
//! tracked in a `JoinSet`, so shutdown can join all of them.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, TcpSocket};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::display::DisplaySink;
use crate::error::AppError;
use crate::session::{run_session, SessionContext};

/// Pause after the first failed accept
const ACCEPT_BACKOFF_MIN: Duration = Duration::from_millis(10);

/// Longest pause between consecutive failed accepts
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Delay schedule for a run of failed accepts
///
/// Errors such as EMFILE persist until a descriptor frees up, so retrying
/// immediately would spin the accept loop.
#[derive(Debug)]
struct AcceptBackoff {
    next: Duration,
}

impl AcceptBackoff {
    fn new() -> Self {
        Self {
            next: ACCEPT_BACKOFF_MIN,
        }
    }

    /// Report a failed accept and return how long to pause
    fn on_error(&mut self, e: io::Error, sink: &dyn DisplaySink) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(ACCEPT_BACKOFF_MAX);

        let err = AppError::Accept(e);
        warn!("{}, retrying in {:?}", err, delay);
        sink.append(&err.to_string());
        delay
    }

    fn reset(&mut self) {
        self.next = ACCEPT_BACKOFF_MIN;
    }
}

/// A bound, listening socket
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
    local_addr: SocketAddr,
}

impl Listener {
    /// Bind `addr` and start listening with the given backlog
    pub fn bind(addr: SocketAddr, backlog: u32) -> Result<Self, AppError> {
        let bind_err = |source| AppError::Bind { addr, source };

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(bind_err)?;

        // Lets a restart rebind while old connections sit in TIME_WAIT
        #[cfg(not(windows))]
        socket.set_reuseaddr(true).map_err(bind_err)?;

        socket.bind(addr).map_err(bind_err)?;
        let inner = socket.listen(backlog).map_err(bind_err)?;
        let local_addr = inner.local_addr().map_err(bind_err)?;

        Ok(Self { inner, local_addr })
    }

    /// Actual bound address (resolves port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections until `ctx.shutdown` fires
    ///
    /// Closes the listening socket on exit and joins every session task
    /// before returning. Returns how many sessions were still running.
    pub async fn run(self, ctx: SessionContext) -> usize {
        let Listener { inner, local_addr } = self;
        let mut sessions = JoinSet::new();
        let mut backoff = AcceptBackoff::new();

        loop {
            tokio::select! {
                _ = ctx.shutdown.cancelled() => break,
                accepted = inner.accept() => match accepted {
                    Ok((stream, peer_addr)) => {
                        backoff.reset();
                        info!("New connection from {}", peer_addr);
                        sessions.spawn(run_session(stream, peer_addr, ctx.clone()));
                    }
                    Err(e) if ctx.shutdown.is_cancelled() => {
                        debug!("Accept interrupted by shutdown: {}", e);
                        break;
                    }
                    Err(e) => {
                        let delay = backoff.on_error(e, ctx.sink.as_ref());
                        tokio::select! {
                            _ = ctx.shutdown.cancelled() => break,
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                },
            }

            while let Some(finished) = sessions.try_join_next() {
                log_join(finished);
            }
        }

        drop(inner);
        info!("Listener on {} closed", local_addr);

        let mut drained = 0;
        while let Some(finished) = sessions.join_next().await {
            log_join(finished);
            drained += 1;
        }
        debug!("Joined {} session tasks", drained);
        drained
    }
}

fn log_join(result: Result<(), JoinError>) {
    if let Err(e) = result {
        error!("Session task failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::ChannelSink;

    #[tokio::test]
    async fn test_bind_resolves_ephemeral_port() {
        let listener = Listener::bind("127.0.0.1:0".parse().unwrap(), 5).unwrap();
        assert_ne!(listener.local_addr().port(), 0);
    }

    #[tokio::test]
    async fn test_bind_conflict_is_bind_error() {
        let first = Listener::bind("127.0.0.1:0".parse().unwrap(), 5).unwrap();
        let taken = first.local_addr();

        match Listener::bind(taken, 5) {
            Err(AppError::Bind { addr, .. }) => assert_eq!(addr, taken),
            other => panic!("expected bind error, got {other:?}"),
        }
    }

    #[test]
    fn test_accept_errors_back_off_up_to_a_cap() {
        let (sink, mut lines) = ChannelSink::new();
        let mut backoff = AcceptBackoff::new();

        let mut delays = Vec::new();
        for _ in 0..10 {
            let e = io::Error::new(io::ErrorKind::Other, "too many open files");
            delays.push(backoff.on_error(e, &sink));
        }

        assert_eq!(delays[0], ACCEPT_BACKOFF_MIN);
        assert_eq!(delays[1], ACCEPT_BACKOFF_MIN * 2);
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*delays.last().unwrap(), ACCEPT_BACKOFF_MAX);

        // Every failure still reaches the display
        for _ in 0..10 {
            let line = lines.try_recv().unwrap();
            assert!(line.contains("too many open files"), "got {line}");
        }
    }

    #[test]
    fn test_successful_accept_resets_backoff() {
        let (sink, _lines) = ChannelSink::new();
        let mut backoff = AcceptBackoff::new();
        for _ in 0..5 {
            backoff.on_error(io::Error::from(io::ErrorKind::Other), &sink);
        }

        backoff.reset();
        let delay = backoff.on_error(io::Error::from(io::ErrorKind::Other), &sink);
        assert_eq!(delay, ACCEPT_BACKOFF_MIN);
    }
}
