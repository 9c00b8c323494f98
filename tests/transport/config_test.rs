// Transport Config Tests
// Validation, builders and manager behaviour around reconfiguration

use tokio::net::UdpSocket;
use tokio::time::{timeout, Duration};
use windsim::transport::{
    ConfigError, ConnectionState, Protocol, SendReport, TargetKind, TargetOutcome,
    TransportConfig, TransportError, TransportManager, TransportStatus, DEFAULT_NMEA_PORT,
};

// ============================================================================
// TRANSPORT CONFIG
// ============================================================================

#[test]
fn test_config_default() {
    let config = TransportConfig::default();

    assert_eq!(config.protocol, Protocol::Udp);
    assert_eq!(config.target_host, "127.0.0.1");
    assert_eq!(config.target_port, DEFAULT_NMEA_PORT);
    assert_eq!(config.local_bind_addr, "0.0.0.0:0");
    assert!(!config.use_broadcast);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_builders() {
    let config = TransportConfig::tcp("plotter.local", 2000).with_local_bind_addr("0.0.0.0:4000");

    assert_eq!(config.protocol, Protocol::Tcp);
    assert_eq!(config.target_label(), "plotter.local:2000");
    assert_eq!(config.bind_socket_addr().unwrap().port(), 4000);
}

#[test]
fn test_config_with_broadcast() {
    let config = TransportConfig::udp("192.168.1.20", 10110).with_broadcast("192.168.1.255");

    assert!(config.use_broadcast);
    assert_eq!(
        config.broadcast_socket_addr().unwrap(),
        Some("192.168.1.255:10110".parse().unwrap())
    );

    let config = config.without_broadcast();
    assert_eq!(config.broadcast_socket_addr().unwrap(), None);
}

#[test]
fn test_config_rejects_empty_host() {
    let config = TransportConfig::udp("  ", 10110);

    assert_eq!(config.validate(), Err(ConfigError::EmptyHost));
}

#[test]
fn test_config_rejects_port_zero() {
    let config = TransportConfig::udp("127.0.0.1", 0);

    assert_eq!(config.validate(), Err(ConfigError::InvalidPort(0)));
}

#[test]
fn test_config_rejects_bad_bind_address() {
    let config = TransportConfig::udp("127.0.0.1", 10110).with_local_bind_addr("nowhere");

    assert!(matches!(config.validate(), Err(ConfigError::InvalidBindAddress(_))));
}

#[test]
fn test_config_rejects_bad_broadcast_address() {
    let config = TransportConfig::udp("127.0.0.1", 10110).with_broadcast("not-an-ip");
    assert!(matches!(config.validate(), Err(ConfigError::InvalidBroadcastAddress(_))));

    let config = TransportConfig::udp("127.0.0.1", 10110).with_broadcast("::1");
    assert!(matches!(config.validate(), Err(ConfigError::InvalidBroadcastAddress(_))));
}

#[test]
fn test_broadcast_ignored_for_tcp() {
    let config = TransportConfig::tcp("127.0.0.1", 10110).with_broadcast("not-an-ip");

    assert!(config.validate().is_ok());
}

#[test]
fn test_protocol_parse() {
    assert_eq!("TCP".parse::<Protocol>(), Ok(Protocol::Tcp));
    assert_eq!(" udp ".parse::<Protocol>(), Ok(Protocol::Udp));
    assert!(matches!("sctp".parse::<Protocol>(), Err(ConfigError::UnknownProtocol(_))));
    assert_eq!(Protocol::Tcp.to_string(), "tcp");
}

// ============================================================================
// REPORTS AND STATUS
// ============================================================================

#[test]
fn test_report_ok_when_any_leg_succeeds() {
    let report = SendReport::new(vec![
        TargetOutcome::new(TargetKind::Broadcast, "255.255.255.255:10110", Err(TransportError::SendFailed("denied".into()))),
        TargetOutcome::new(TargetKind::Unicast, "127.0.0.1:10110", Ok(12)),
    ]);

    assert!(report.ok());
    assert_eq!(report.failures(), 1);
    assert!(report.describe().contains("127.0.0.1:10110 ok"));
    assert!(report.describe().contains("255.255.255.255:10110 failed"));
}

#[test]
fn test_empty_report_is_not_ok() {
    let report = SendReport::default();

    assert!(!report.ok());
    assert_eq!(report.describe(), "No transport configured");
}

#[test]
fn test_error_classification() {
    assert!(TransportError::Timeout.is_connection_error());
    assert!(TransportError::ConnectionFailed("refused".into()).is_retryable());
    assert!(!TransportError::NotConfigured.is_retryable());
    assert!(!TransportError::SendFailed("x".into()).is_connection_error());
}

#[test]
fn test_status_display() {
    assert_eq!(TransportStatus::unconfigured().to_string(), "not configured");

    let status = TransportStatus {
        protocol: Some(Protocol::Udp),
        state: ConnectionState::Ready,
        last_target: Some("127.0.0.1:10110".to_string()),
    };
    assert_eq!(status.to_string(), "udp 127.0.0.1:10110 (ready)");
    assert!(status.state.is_usable());
    assert!(!ConnectionState::Disconnected.is_usable());
}

// ============================================================================
// TRANSPORT MANAGER
// ============================================================================

#[tokio::test]
async fn test_manager_starts_unconfigured() {
    let manager = TransportManager::new();

    assert_eq!(manager.status(), TransportStatus::unconfigured());
    assert!(manager.config().is_none());
    assert!(manager.connection_history().is_empty());
}

#[tokio::test]
async fn test_manager_configure_udp() {
    let mut manager = TransportManager::new();

    let status = manager
        .configure(TransportConfig::udp("127.0.0.1", 10110).with_local_bind_addr("127.0.0.1:0"))
        .await
        .unwrap();

    assert_eq!(status.protocol, Some(Protocol::Udp));
    assert_eq!(status.state, ConnectionState::Ready);
    assert_eq!(status.last_target.as_deref(), Some("127.0.0.1:10110"));
    assert_eq!(manager.stats().reconfigurations, 1);
}

#[tokio::test]
async fn test_manager_rejected_config_keeps_previous() {
    let mut manager = TransportManager::new();
    let good = TransportConfig::udp("127.0.0.1", 10110).with_local_bind_addr("127.0.0.1:0");
    manager.configure(good.clone()).await.unwrap();

    let result = manager.configure(TransportConfig::udp("127.0.0.1", 0)).await;

    assert_eq!(result, Err(ConfigError::InvalidPort(0)));
    assert_eq!(manager.config(), Some(&good));
    assert_eq!(manager.status().state, ConnectionState::Ready);
}

async fn recv_datagram(socket: &UdpSocket) -> Vec<u8> {
    let mut buf = [0u8; 256];
    let (len, _) = timeout(Duration::from_secs(2), socket.recv_from(&mut buf))
        .await
        .expect("datagram not received")
        .unwrap();
    buf[..len].to_vec()
}

#[tokio::test]
async fn test_manager_bind_failure_keeps_previous() {
    let rx = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = rx.local_addr().unwrap().port();
    let mut manager = TransportManager::new();
    let good = TransportConfig::udp("127.0.0.1", port).with_local_bind_addr("127.0.0.1:0");
    manager.configure(good.clone()).await.unwrap();

    // Another socket already owns the requested local address
    let occupied = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
    let taken = occupied.local_addr().unwrap().to_string();
    let result = manager
        .configure(TransportConfig::udp("127.0.0.1", port).with_local_bind_addr(&taken))
        .await;

    assert!(matches!(result, Err(ConfigError::BindFailed(_))));
    assert_eq!(manager.config(), Some(&good));
    assert_eq!(manager.status().state, ConnectionState::Ready);
    assert_eq!(manager.stats().reconfigurations, 1);

    assert!(manager.send(b"$A*41\r\n").await.ok());
    assert_eq!(recv_datagram(&rx).await, b"$A*41\r\n");
}

#[tokio::test]
async fn test_manager_rebind_same_fixed_port() {
    let rx_a = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let rx_b = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let bind = {
        let scratch = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        scratch.local_addr().unwrap().to_string()
    };
    let mut manager = TransportManager::new();
    manager
        .configure(
            TransportConfig::udp("127.0.0.1", rx_a.local_addr().unwrap().port())
                .with_local_bind_addr(&bind),
        )
        .await
        .unwrap();

    let status = manager
        .configure(
            TransportConfig::udp("127.0.0.1", rx_b.local_addr().unwrap().port())
                .with_local_bind_addr(&bind),
        )
        .await
        .unwrap();

    assert_eq!(status.state, ConnectionState::Ready);
    assert!(manager.send(b"$B*42\r\n").await.ok());
    let mut buf = [0u8; 64];
    let (len, from) = timeout(Duration::from_secs(2), rx_b.recv_from(&mut buf))
        .await
        .expect("datagram not received")
        .unwrap();
    assert_eq!(&buf[..len], b"$B*42\r\n");
    assert_eq!(from.to_string(), bind);
}

#[tokio::test]
async fn test_manager_rejects_unresolvable_host() {
    let mut manager = TransportManager::new();

    let result = manager
        .configure(TransportConfig::udp("no-such-host.invalid", 10110))
        .await;

    assert!(matches!(result, Err(ConfigError::UnresolvableHost(_))));
    assert_eq!(manager.status().state, ConnectionState::NotConfigured);
}

#[tokio::test]
async fn test_manager_connection_history_newest_first() {
    let mut manager = TransportManager::new();
    for port in [10110, 10110, 10112, 10113] {
        manager
            .configure(TransportConfig::udp("127.0.0.1", port).with_local_bind_addr("127.0.0.1:0"))
            .await
            .unwrap();
    }

    assert_eq!(
        manager.connection_history(),
        vec!["127.0.0.1:10113", "127.0.0.1:10112", "127.0.0.1:10110"]
    );
    assert_eq!(manager.stats().reconfigurations, 4);
}

#[tokio::test]
async fn test_manager_shutdown_clears_transport() {
    let mut manager = TransportManager::new();
    manager
        .configure(TransportConfig::udp("127.0.0.1", 10110).with_local_bind_addr("127.0.0.1:0"))
        .await
        .unwrap();

    manager.shutdown().await;

    assert_eq!(manager.status().state, ConnectionState::NotConfigured);
    assert!(!manager.send(b"$X*58\r\n").await.ok());
}
