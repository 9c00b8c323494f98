// Transport Traits and Core Types
// Configuration snapshot, status, per-send reports and the Transport trait

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use thiserror::Error;

/// Standard NMEA-0183 over IP port
pub const DEFAULT_NMEA_PORT: u16 = 10110;

/// Fixed TCP connect timeout
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

// ============================================================================
// PROTOCOL
// ============================================================================

/// Outbound protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => f.write_str("tcp"),
            Self::Udp => f.write_str("udp"),
        }
    }
}

impl FromStr for Protocol {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tcp" => Ok(Self::Tcp),
            "udp" => Ok(Self::Udp),
            other => Err(ConfigError::UnknownProtocol(other.to_string())),
        }
    }
}

// ============================================================================
// TRANSPORT CONFIG
// ============================================================================

/// Immutable snapshot of where and how sentences are delivered.
///
/// Applying a new snapshot always rebuilds the sockets from scratch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// TCP or UDP
    pub protocol: Protocol,
    /// Receiver host name or IP
    pub target_host: String,
    /// Receiver port
    pub target_port: u16,
    /// Local address to bind outbound sockets to (`ip:port`, port 0 for any)
    pub local_bind_addr: String,
    /// Also send every UDP datagram to `broadcast_addr`
    pub use_broadcast: bool,
    /// Broadcast IP; datagrams go to `broadcast_addr:target_port`
    pub broadcast_addr: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            protocol: Protocol::Udp,
            target_host: "127.0.0.1".to_string(),
            target_port: DEFAULT_NMEA_PORT,
            local_bind_addr: "0.0.0.0:0".to_string(),
            use_broadcast: false,
            broadcast_addr: "255.255.255.255".to_string(),
        }
    }
}

impl TransportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// UDP unicast to `host:port`
    pub fn udp(host: &str, port: u16) -> Self {
        Self::new().with_protocol(Protocol::Udp).with_target(host, port)
    }

    /// TCP client to `host:port`
    pub fn tcp(host: &str, port: u16) -> Self {
        Self::new().with_protocol(Protocol::Tcp).with_target(host, port)
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_target(mut self, host: &str, port: u16) -> Self {
        self.target_host = host.to_string();
        self.target_port = port;
        self
    }

    pub fn with_local_bind_addr(mut self, addr: &str) -> Self {
        self.local_bind_addr = addr.to_string();
        self
    }

    /// Enable hybrid broadcast + unicast delivery
    pub fn with_broadcast(mut self, addr: &str) -> Self {
        self.use_broadcast = true;
        self.broadcast_addr = addr.to_string();
        self
    }

    pub fn without_broadcast(mut self) -> Self {
        self.use_broadcast = false;
        self
    }

    /// `host:port` as shown to the user and kept in connection history
    pub fn target_label(&self) -> String {
        format!("{}:{}", self.target_host, self.target_port)
    }

    /// Parsed local bind address
    pub fn bind_socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.local_bind_addr
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddress(self.local_bind_addr.clone()))
    }

    /// Broadcast destination, if broadcast is enabled
    pub fn broadcast_socket_addr(&self) -> Result<Option<SocketAddr>, ConfigError> {
        if !self.use_broadcast {
            return Ok(None);
        }
        let ip: IpAddr = self
            .broadcast_addr
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidBroadcastAddress(self.broadcast_addr.clone()))?;
        if !ip.is_ipv4() {
            return Err(ConfigError::InvalidBroadcastAddress(self.broadcast_addr.clone()));
        }
        Ok(Some(SocketAddr::new(ip, self.target_port)))
    }

    /// Validate the snapshot without touching the network
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.target_port == 0 {
            return Err(ConfigError::InvalidPort(self.target_port));
        }
        self.bind_socket_addr()?;
        if self.protocol == Protocol::Udp {
            self.broadcast_socket_addr()?;
        }
        Ok(())
    }
}

// ============================================================================
// ERRORS
// ============================================================================

/// Rejected configuration; the previous configuration stays in effect
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Target host is empty")]
    EmptyHost,

    #[error("Invalid port: {0}")]
    InvalidPort(u16),

    #[error("Unknown protocol: {0}")]
    UnknownProtocol(String),

    #[error("Invalid bind address: {0}")]
    InvalidBindAddress(String),

    #[error("Invalid broadcast address: {0}")]
    InvalidBroadcastAddress(String),

    #[error("Cannot resolve host: {0}")]
    UnresolvableHost(String),

    #[error("Cannot bind socket: {0}")]
    BindFailed(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// Send-time failures. Recorded per attempt and never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Connection timeout")]
    Timeout,

    #[error("Not connected")]
    NotConnected,

    #[error("No transport configured")]
    NotConfigured,

    #[error("Bind failed: {0}")]
    BindFailed(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl TransportError {
    /// Check if this is a connection-related error
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed(_) | Self::NotConnected | Self::Timeout
        )
    }

    /// Check if the next tick may succeed where this one failed
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::NotConfigured | Self::BindFailed(_))
    }
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        Self::IoError(e.to_string())
    }
}

// ============================================================================
// CONNECTION STATE
// ============================================================================

/// What the status display shows for the primary transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No configuration applied yet
    NotConfigured,
    /// TCP session down; the next send retries
    Disconnected,
    /// TCP session up
    Connected,
    /// UDP socket bound
    Ready,
}

impl ConnectionState {
    /// Connected (TCP) or ready (UDP)
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Connected | Self::Ready)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotConfigured => "not configured",
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::Ready => "ready",
        };
        f.write_str(s)
    }
}

/// Snapshot returned by `TransportManager::status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportStatus {
    pub protocol: Option<Protocol>,
    pub state: ConnectionState,
    pub last_target: Option<String>,
}

impl TransportStatus {
    pub fn unconfigured() -> Self {
        Self {
            protocol: None,
            state: ConnectionState::NotConfigured,
            last_target: None,
        }
    }
}

impl fmt::Display for TransportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.protocol, &self.last_target) {
            (Some(p), Some(t)) => write!(f, "{} {} ({})", p, t, self.state),
            (Some(p), None) => write!(f, "{} ({})", p, self.state),
            _ => write!(f, "{}", self.state),
        }
    }
}

// ============================================================================
// SEND REPORTS
// ============================================================================

/// Which leg of a send an outcome belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetKind {
    Stream,
    Unicast,
    Broadcast,
}

/// Result of one delivery attempt to one destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetOutcome {
    pub kind: TargetKind,
    pub target: String,
    pub result: Result<usize, TransportError>,
}

impl TargetOutcome {
    pub fn new(kind: TargetKind, target: impl Into<String>, result: Result<usize, TransportError>) -> Self {
        Self {
            kind,
            target: target.into(),
            result,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

impl fmt::Display for TargetOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            Ok(_) => write!(f, "{} ok", self.target),
            Err(e) => write!(f, "{} failed ({})", self.target, e),
        }
    }
}

/// Everything one `send` call did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendReport {
    pub targets: Vec<TargetOutcome>,
}

impl SendReport {
    pub fn new(targets: Vec<TargetOutcome>) -> Self {
        Self { targets }
    }

    /// At least one destination accepted the payload
    pub fn ok(&self) -> bool {
        self.targets.iter().any(TargetOutcome::is_ok)
    }

    /// Count of failed destinations
    pub fn failures(&self) -> usize {
        self.targets.iter().filter(|t| !t.is_ok()).count()
    }

    /// One-line description for status display
    pub fn describe(&self) -> String {
        if self.targets.is_empty() {
            return TransportError::NotConfigured.to_string();
        }
        self.targets
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// ============================================================================
// TRANSPORT STATISTICS
// ============================================================================

/// Running counters for the primary transport
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportStats {
    /// Payloads accepted by at least one destination
    pub sentences_sent: u64,
    /// Bytes written across all destinations
    pub bytes_sent: u64,
    /// Failed destination attempts
    pub send_failures: u64,
    /// Inline TCP reconnect attempts
    pub reconnects: u64,
    /// Configurations applied
    pub reconfigurations: u64,
}

// ============================================================================
// TRANSPORT TRAIT
// ============================================================================

/// A live outbound transport
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Deliver one payload, reporting every destination attempted
    async fn send(&mut self, data: &[u8]) -> Vec<TargetOutcome>;

    /// Close sockets; the transport is not used afterwards
    async fn shutdown(&mut self);

    /// Current connection state
    fn state(&self) -> ConnectionState;

    /// Primary destination, `ip:port`
    fn target(&self) -> SocketAddr;
}
