// Transport Manager
// Owns the active transport and swaps it as a whole on every reconfiguration

use crate::transport::{
    ConfigError, ConnectionState, Protocol, SendReport, TcpTransport, Transport, TransportConfig,
    TransportStats, TransportStatus, UdpTransport, DEFAULT_CONNECT_TIMEOUT_SECS,
};
use std::collections::VecDeque;
use std::net::SocketAddr;
use tokio::time::Duration;
use tracing::{debug, info, warn};

/// Distinct targets remembered for the settings screen
pub const CONNECTION_HISTORY_LEN: usize = 5;

// ============================================================================
// ACTIVE TRANSPORT
// ============================================================================

/// The transport built from one configuration snapshot
enum ActiveTransport {
    Tcp(TcpTransport),
    Udp(UdpTransport),
}

impl ActiveTransport {
    fn protocol(&self) -> Protocol {
        match self {
            Self::Tcp(_) => Protocol::Tcp,
            Self::Udp(_) => Protocol::Udp,
        }
    }

    fn needs_reconnect(&self) -> bool {
        matches!(self, Self::Tcp(t) if !t.is_connected())
    }

    async fn send(&mut self, data: &[u8]) -> SendReport {
        let targets = match self {
            Self::Tcp(t) => t.send(data).await,
            Self::Udp(u) => u.send(data).await,
        };
        SendReport::new(targets)
    }

    async fn shutdown(&mut self) {
        match self {
            Self::Tcp(t) => t.shutdown().await,
            Self::Udp(u) => u.shutdown().await,
        }
    }

    fn state(&self) -> ConnectionState {
        match self {
            Self::Tcp(t) => t.state(),
            Self::Udp(u) => u.state(),
        }
    }
}

// ============================================================================
// TRANSPORT MANAGER
// ============================================================================

/// Delivers encoded sentences over whichever transport is configured.
///
/// Failures are never raised from `send`; they are reported in the
/// returned `SendReport` and counted in the stats.
pub struct TransportManager {
    config: Option<TransportConfig>,
    active: Option<ActiveTransport>,
    connect_timeout: Duration,
    last_target: Option<String>,
    last_report: Option<SendReport>,
    history: VecDeque<String>,
    stats: TransportStats,
}

impl Default for TransportManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportManager {
    pub fn new() -> Self {
        Self {
            config: None,
            active: None,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            last_target: None,
            last_report: None,
            history: VecDeque::with_capacity(CONNECTION_HISTORY_LEN),
            stats: TransportStats::default(),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Apply a configuration snapshot.
    ///
    /// The snapshot is validated and its host resolved first; on error the
    /// current transport is left untouched. A new UDP socket is bound before
    /// the old transport is torn down, so a bind failure also leaves the
    /// current transport in place. A TCP connect failure is not an error: it
    /// shows up as `Disconnected` in the returned status.
    pub async fn configure(&mut self, config: TransportConfig) -> Result<TransportStatus, ConfigError> {
        config.validate()?;
        let bind = config.bind_socket_addr()?;
        let target = resolve_target(&config, bind).await?;
        let broadcast = match config.protocol {
            Protocol::Udp => config.broadcast_socket_addr()?,
            Protocol::Tcp => None,
        };

        let active = match config.protocol {
            Protocol::Tcp => {
                self.teardown().await;
                let mut tcp = TcpTransport::new(target, Some(bind), self.connect_timeout);
                if let Err(e) = tcp.connect().await {
                    warn!(dest = %target, error = %e, "TCP connect failed, will retry on send");
                }
                ActiveTransport::Tcp(tcp)
            }
            Protocol::Udp => {
                let udp = self.bind_udp(bind, target, broadcast).await?;
                self.teardown().await;
                ActiveTransport::Udp(udp)
            }
        };

        info!(
            protocol = %config.protocol,
            dest = %config.target_label(),
            broadcast = ?broadcast,
            "Transport configured"
        );

        self.remember_target(config.target_label());
        self.last_target = Some(config.target_label());
        self.active = Some(active);
        self.config = Some(config);
        self.stats.reconfigurations += 1;

        Ok(self.status())
    }

    /// Bind the socket for a new UDP transport while the old one keeps
    /// running. If the old UDP transport itself holds `bind`, it is released
    /// and the bind retried; should the retry fail too, the old transport is
    /// rebuilt before returning the error.
    async fn bind_udp(
        &mut self,
        bind: SocketAddr,
        target: SocketAddr,
        broadcast: Option<SocketAddr>,
    ) -> Result<UdpTransport, ConfigError> {
        let err = match UdpTransport::bind(bind, target, broadcast).await {
            Ok(udp) => return Ok(udp),
            Err(e) => e,
        };

        let previous = match &self.active {
            Some(ActiveTransport::Udp(old)) if bind.port() != 0 && old.local_addr() == Some(bind) => {
                Some((old.target(), old.broadcast()))
            }
            _ => None,
        };
        let Some((old_target, old_broadcast)) = previous else {
            warn!(bind = %bind, error = %err, "UDP bind failed, keeping current transport");
            return Err(ConfigError::BindFailed(err.to_string()));
        };

        debug!(bind = %bind, "Releasing current UDP socket to rebind its address");
        self.teardown().await;
        match UdpTransport::bind(bind, target, broadcast).await {
            Ok(udp) => Ok(udp),
            Err(e) => {
                warn!(bind = %bind, error = %e, "UDP rebind failed, restoring previous transport");
                match UdpTransport::bind(bind, old_target, old_broadcast).await {
                    Ok(old) => self.active = Some(ActiveTransport::Udp(old)),
                    Err(restore) => {
                        warn!(error = %restore, "Previous UDP transport could not be restored");
                        self.config = None;
                    }
                }
                Err(ConfigError::BindFailed(e.to_string()))
            }
        }
    }

    async fn teardown(&mut self) {
        if let Some(mut old) = self.active.take() {
            old.shutdown().await;
            debug!("Previous transport torn down");
        }
    }

    /// Tear down the active transport
    pub async fn shutdown(&mut self) {
        self.teardown().await;
        self.config = None;
    }

    /// Deliver one payload. Never fails; see the report for outcomes.
    pub async fn send(&mut self, data: &[u8]) -> SendReport {
        let Some(active) = self.active.as_mut() else {
            let report = SendReport::default();
            self.last_report = Some(report.clone());
            return report;
        };

        if active.needs_reconnect() {
            self.stats.reconnects += 1;
        }
        let report = active.send(data).await;

        for outcome in &report.targets {
            match &outcome.result {
                Ok(n) => self.stats.bytes_sent += *n as u64,
                Err(e) => {
                    self.stats.send_failures += 1;
                    if !e.is_retryable() {
                        warn!(dest = %outcome.target, error = %e, "Send cannot succeed until reconfigured");
                    }
                }
            }
        }
        if report.ok() {
            self.stats.sentences_sent += 1;
            debug!(bytes = data.len(), targets = %report.describe(), "Sentence sent");
        }
        if let Some(last) = report.targets.last() {
            self.last_target = Some(last.target.clone());
        }

        self.last_report = Some(report.clone());
        report
    }

    /// Protocol, connection state and last target
    pub fn status(&self) -> TransportStatus {
        match &self.active {
            Some(active) => TransportStatus {
                protocol: Some(active.protocol()),
                state: active.state(),
                last_target: self.last_target.clone(),
            },
            None => TransportStatus::unconfigured(),
        }
    }

    /// The configuration currently in effect
    pub fn config(&self) -> Option<&TransportConfig> {
        self.config.as_ref()
    }

    /// Report from the most recent `send`
    pub fn last_report(&self) -> Option<&SendReport> {
        self.last_report.as_ref()
    }

    /// Recently applied targets, newest first
    pub fn connection_history(&self) -> Vec<String> {
        self.history.iter().cloned().collect()
    }

    pub fn stats(&self) -> TransportStats {
        self.stats.clone()
    }

    fn remember_target(&mut self, label: String) {
        if self.history.front() == Some(&label) {
            return;
        }
        self.history.push_front(label);
        self.history.truncate(CONNECTION_HISTORY_LEN);
    }
}

/// Resolve the target, preferring an address of the same family as the
/// local bind address.
async fn resolve_target(config: &TransportConfig, bind: SocketAddr) -> Result<SocketAddr, ConfigError> {
    let host = config.target_host.trim();
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, config.target_port))
        .await
        .map_err(|e| ConfigError::UnresolvableHost(format!("{}: {}", host, e)))?
        .collect();

    addrs
        .iter()
        .find(|a| a.is_ipv4() == bind.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| ConfigError::UnresolvableHost(host.to_string()))
}
