// Relay module - THE LOOPBACK
// Re-forwards sentences produced by other programs on this host

mod forwarder;

pub use forwarder::{RelayConfig, RelayForwarder, RelayStats, DEFAULT_RELAY_ADDR};
