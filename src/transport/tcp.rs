// TCP Transport Implementation
// Single-peer TCP client with inline reconnect on the next send

use crate::transport::{ConnectionState, TargetKind, TargetOutcome, Transport, TransportError};
use std::net::SocketAddr;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpSocket, TcpStream};
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

// ============================================================================
// TCP SESSION
// ============================================================================

/// The live stream to the peer. Dropping it closes the connection.
struct TcpSession {
    stream: TcpStream,
}

// ============================================================================
// TCP TRANSPORT
// ============================================================================

/// TCP transport to exactly one peer.
///
/// A failed connect or write drops the session; the next `send` makes one
/// reconnect attempt before giving up for that call.
pub struct TcpTransport {
    target: SocketAddr,
    bind: Option<SocketAddr>,
    connect_timeout: Duration,
    session: Option<TcpSession>,
    reconnect_attempts: u64,
}

impl TcpTransport {
    /// Create a disconnected transport. `bind` is only applied when it names
    /// a specific IP or port.
    pub fn new(target: SocketAddr, bind: Option<SocketAddr>, connect_timeout: Duration) -> Self {
        let bind = bind.filter(|b| !b.ip().is_unspecified() || b.port() != 0);
        Self {
            target,
            bind,
            connect_timeout,
            session: None,
            reconnect_attempts: 0,
        }
    }

    /// Whether a session is currently up
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Reconnects attempted from inside `send`
    pub fn reconnect_attempts(&self) -> u64 {
        self.reconnect_attempts
    }

    /// Open a fresh session, replacing any existing one
    pub async fn connect(&mut self) -> Result<(), TransportError> {
        self.session = None;

        let socket = match self.target {
            SocketAddr::V4(_) => TcpSocket::new_v4()?,
            SocketAddr::V6(_) => TcpSocket::new_v6()?,
        };
        if let Some(bind) = self.bind {
            socket.set_reuseaddr(true)?;
            socket
                .bind(bind)
                .map_err(|e| TransportError::BindFailed(e.to_string()))?;
        }

        let stream = timeout(self.connect_timeout, socket.connect(self.target))
            .await
            .map_err(|_| TransportError::Timeout)?
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        // Sentences are tiny and latency matters more than throughput
        stream.set_nodelay(true).ok();

        info!(dest = %self.target, "TCP connected");
        self.session = Some(TcpSession { stream });
        Ok(())
    }

    async fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        let session = self.session.as_mut().ok_or(TransportError::NotConnected)?;
        session
            .stream
            .write_all(data)
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        Ok(data.len())
    }
}

impl Transport for TcpTransport {
    async fn send(&mut self, data: &[u8]) -> Vec<TargetOutcome> {
        let target = self.target.to_string();

        if self.session.is_none() {
            self.reconnect_attempts += 1;
            debug!(dest = %target, "TCP not connected, reconnecting");
            if let Err(e) = self.connect().await {
                // Peer down: retried on every tick, so only debug
                if e.is_connection_error() {
                    debug!(dest = %target, error = %e, "TCP reconnect failed");
                } else {
                    warn!(dest = %target, error = %e, "TCP reconnect failed");
                }
                return vec![TargetOutcome::new(TargetKind::Stream, target, Err(e))];
            }
        }

        let result = self.write(data).await;
        if let Err(ref e) = result {
            warn!(dest = %target, error = %e, "TCP write failed, dropping session");
            self.session = None;
        }
        vec![TargetOutcome::new(TargetKind::Stream, target, result)]
    }

    async fn shutdown(&mut self) {
        if let Some(mut session) = self.session.take() {
            let _ = session.stream.shutdown().await;
            debug!(dest = %self.target, "TCP session closed");
        }
    }

    fn state(&self) -> ConnectionState {
        if self.is_connected() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    fn target(&self) -> SocketAddr {
        self.target
    }
}
