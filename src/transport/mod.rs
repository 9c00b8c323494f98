// Transport module - THE WIRE
// Delivers sentences over TCP, UDP unicast or hybrid UDP broadcast + unicast

mod manager;
mod tcp;
mod traits;
mod udp;

pub use traits::{
    // Core trait
    Transport,
    // Configuration
    Protocol, TransportConfig, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_NMEA_PORT,
    // Status
    ConnectionState, TransportStatus,
    // Send results
    SendReport, TargetKind, TargetOutcome,
    // Errors
    ConfigError, TransportError,
    // Statistics
    TransportStats,
};

pub use manager::{TransportManager, CONNECTION_HISTORY_LEN};
pub use tcp::TcpTransport;
pub use udp::UdpTransport;
