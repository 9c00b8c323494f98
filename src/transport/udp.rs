// UDP Transport Implementation
// Unicast datagrams, optionally mirrored to a broadcast address

use crate::transport::{ConnectionState, TargetKind, TargetOutcome, Transport, TransportError};
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{debug, warn};

/// UDP transport.
///
/// With a broadcast address configured every payload goes out twice, first
/// to the broadcast address and then to the unicast target. The two legs
/// are independent: one failing never skips or undoes the other.
pub struct UdpTransport {
    socket: Option<UdpSocket>,
    unicast: SocketAddr,
    broadcast: Option<SocketAddr>,
}

impl UdpTransport {
    /// Bind the outbound socket
    pub async fn bind(
        local: SocketAddr,
        unicast: SocketAddr,
        broadcast: Option<SocketAddr>,
    ) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|e| TransportError::BindFailed(e.to_string()))?;
        if broadcast.is_some() {
            socket.set_broadcast(true)?;
        }
        debug!(
            local = ?socket.local_addr().ok(),
            unicast = %unicast,
            broadcast = ?broadcast,
            "UDP socket bound"
        );
        Ok(Self {
            socket: Some(socket),
            unicast,
            broadcast,
        })
    }

    /// Local address of the outbound socket
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    /// Broadcast destination, if enabled
    pub fn broadcast(&self) -> Option<SocketAddr> {
        self.broadcast
    }

    async fn send_leg(&self, kind: TargetKind, dest: SocketAddr, data: &[u8]) -> TargetOutcome {
        let result = match self.socket.as_ref() {
            Some(socket) => socket
                .send_to(data, dest)
                .await
                .map_err(|e| TransportError::SendFailed(e.to_string())),
            None => Err(TransportError::NotConfigured),
        };
        if let Err(ref e) = result {
            warn!(dest = %dest, leg = ?kind, error = %e, "UDP send failed");
        }
        TargetOutcome::new(kind, dest.to_string(), result)
    }
}

impl Transport for UdpTransport {
    async fn send(&mut self, data: &[u8]) -> Vec<TargetOutcome> {
        let mut outcomes = Vec::with_capacity(2);
        if let Some(broadcast) = self.broadcast {
            outcomes.push(self.send_leg(TargetKind::Broadcast, broadcast, data).await);
        }
        outcomes.push(self.send_leg(TargetKind::Unicast, self.unicast, data).await);
        outcomes
    }

    async fn shutdown(&mut self) {
        self.socket = None;
    }

    fn state(&self) -> ConnectionState {
        if self.socket.is_some() {
            ConnectionState::Ready
        } else {
            ConnectionState::NotConfigured
        }
    }

    fn target(&self) -> SocketAddr {
        self.unicast
    }
}
