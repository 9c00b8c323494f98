// Relay Forwarder
// Drains externally produced sentences from a loopback UDP socket and
// re-sends every properly framed line through the primary transport

use crate::transport::{SendReport, TransportError, TransportManager};
use serde::{Deserialize, Serialize};
use socket2::{Domain, Protocol as SockProtocol, Socket, Type};
use std::io::ErrorKind;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{debug, info, trace, warn};

/// Default relay listen address
pub const DEFAULT_RELAY_ADDR: &str = "127.0.0.1:10111";

// ============================================================================
// RELAY CONFIG
// ============================================================================

/// Configuration for the relay socket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Address to listen on
    pub bind_addr: String,
    /// Upper bound on datagrams drained per tick
    pub max_datagrams_per_tick: usize,
    /// Receive buffer size
    pub buffer_size: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_RELAY_ADDR.to_string(),
            max_datagrams_per_tick: 64,
            buffer_size: 2048,
        }
    }
}

impl RelayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bind_addr(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    pub fn with_max_datagrams_per_tick(mut self, max: usize) -> Self {
        self.max_datagrams_per_tick = max;
        self
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    fn socket_addr(&self) -> Result<SocketAddr, TransportError> {
        self.bind_addr
            .trim()
            .parse()
            .map_err(|_| TransportError::BindFailed(format!("invalid relay address {}", self.bind_addr)))
    }
}

// ============================================================================
// RELAY STATS
// ============================================================================

/// Counters for the relay path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayStats {
    /// Datagrams read from the socket
    pub datagrams_received: u64,
    /// Framed lines handed to the transport
    pub lines_forwarded: u64,
    /// Lines dropped for lacking a `$` or `!` start
    pub lines_skipped: u64,
}

// ============================================================================
// RELAY FORWARDER
// ============================================================================

/// Passive receiver that feeds the primary transport.
///
/// Each datagram must hold complete lines; nothing is buffered across
/// datagrams or ticks.
pub struct RelayForwarder {
    config: RelayConfig,
    socket: Option<UdpSocket>,
    buffer: Vec<u8>,
    stats: RelayStats,
}

impl RelayForwarder {
    pub fn new(config: RelayConfig) -> Self {
        let buffer = vec![0u8; config.buffer_size.max(1)];
        Self {
            config,
            socket: None,
            buffer,
            stats: RelayStats::default(),
        }
    }

    /// Bind the relay socket, replacing any existing one.
    ///
    /// Address and port reuse are requested so a quick disable/enable
    /// toggle does not trip over the previous socket. Must be called from
    /// within a tokio runtime.
    pub fn enable(&mut self) -> Result<SocketAddr, TransportError> {
        self.socket = None;
        let addr = self.config.socket_addr()?;

        let bind_err = |e: std::io::Error| TransportError::BindFailed(format!("{}: {}", addr, e));
        let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(SockProtocol::UDP))
            .map_err(bind_err)?;
        socket.set_reuse_address(true).map_err(bind_err)?;
        #[cfg(all(unix, not(any(target_os = "solaris", target_os = "illumos"))))]
        socket.set_reuse_port(true).map_err(bind_err)?;
        socket.set_nonblocking(true).map_err(bind_err)?;
        socket.bind(&addr.into()).map_err(bind_err)?;

        let socket = UdpSocket::from_std(socket.into()).map_err(bind_err)?;
        let local = socket.local_addr()?;
        info!(addr = %local, "Relay enabled");
        self.socket = Some(socket);
        Ok(local)
    }

    /// Close the relay socket
    pub fn disable(&mut self) {
        if self.socket.take().is_some() {
            info!("Relay disabled");
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.socket.is_some()
    }

    /// Bound address while enabled
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    pub fn stats(&self) -> RelayStats {
        self.stats.clone()
    }

    /// Read every pending datagram without waiting and return the framed
    /// lines found in them, each terminated with `\r\n`.
    ///
    /// Readiness comes from the runtime's reactor, so datagrams that arrived
    /// since it last polled the socket are picked up on a later call.
    pub fn drain(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        let Some(socket) = self.socket.as_ref() else {
            return lines;
        };

        for _ in 0..self.config.max_datagrams_per_tick {
            let len = match socket.try_recv_from(&mut self.buffer) {
                Ok((len, from)) => {
                    trace!(from = %from, len, "Relay datagram");
                    len
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(error = %e, "Relay receive failed");
                    break;
                }
            };
            self.stats.datagrams_received += 1;

            let text = String::from_utf8_lossy(&self.buffer[..len]);
            for line in text.split(|c: char| c == '\r' || c == '\n').filter(|l| !l.is_empty()) {
                if is_framed(line) {
                    lines.push(format!("{}\r\n", line));
                } else {
                    self.stats.lines_skipped += 1;
                    trace!(line, "Relay line skipped");
                }
            }
        }
        lines
    }

    /// Drain the socket and send each framed line through `transport`.
    ///
    /// `on_forward` sees every forwarded line with its send report. Returns
    /// the number of lines forwarded.
    pub async fn drain_and_forward<F>(&mut self, transport: &mut TransportManager, mut on_forward: F) -> usize
    where
        F: FnMut(&str, &SendReport),
    {
        let lines = self.drain();
        for line in &lines {
            let report = transport.send(line.as_bytes()).await;
            on_forward(line, &report);
        }
        self.stats.lines_forwarded += lines.len() as u64;
        if !lines.is_empty() {
            debug!(count = lines.len(), "Relay forwarded lines");
        }
        lines.len()
    }
}

impl Drop for RelayForwarder {
    fn drop(&mut self) {
        self.disable();
    }
}

/// NMEA framing: the line starts with `$` or `!`
fn is_framed(line: &str) -> bool {
    line.starts_with('$') || line.starts_with('!')
}
