// Simulator Context Tests
// Ticks, edit-driven sends, send history, relay forwarding and status

use std::net::UdpSocket as StdUdpSocket;
use tokio::net::UdpSocket;
use tokio::time::{sleep, timeout, Duration};
use windsim::nmea::{encode_wind, validate_sentence, SentenceKind};
use windsim::relay::RelayConfig;
use windsim::sim::SimMode;
use windsim::simulator::{LineSource, Simulator, SimulatorConfig};
use windsim::transport::{ConfigError, ConnectionState, TransportConfig};

async fn receiver() -> (UdpSocket, u16) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = socket.local_addr().unwrap().port();
    (socket, port)
}

async fn recv_line(socket: &UdpSocket) -> String {
    let mut buf = [0u8; 256];
    let (len, _) = timeout(Duration::from_secs(2), socket.recv_from(&mut buf))
        .await
        .expect("sentence not received")
        .unwrap();
    String::from_utf8_lossy(&buf[..len]).into_owned()
}

async fn simulator_to(port: u16, config: SimulatorConfig) -> Simulator {
    let mut sim = Simulator::new(config.with_seed(1)).unwrap();
    sim.apply_transport_config(TransportConfig::udp("127.0.0.1", port).with_local_bind_addr("127.0.0.1:0"))
        .await
        .unwrap();
    sim
}

// ============================================================================
// CONSTRUCTION
// ============================================================================

#[test]
fn test_new_rejects_invalid_config() {
    let zero_tick = SimulatorConfig::new().with_tick_interval_ms(0);
    assert!(matches!(Simulator::new(zero_tick), Err(ConfigError::InvalidValue(_))));

    let inverted = SimulatorConfig::new().with_speed_limits(10.0, 5.0);
    assert!(matches!(Simulator::new(inverted), Err(ConfigError::InvalidValue(_))));
}

#[test]
fn test_new_applies_initial_wind() {
    let sim = Simulator::new(SimulatorConfig::new().with_initial_wind(-45.0, 99.0)).unwrap();

    assert_eq!(sim.wind().angle_deg, 315.0);
    assert_eq!(sim.wind().speed_kn, 70.0);
    assert_eq!(sim.tick_interval(), Duration::from_millis(200));
    assert_eq!(sim.connection_status().state, ConnectionState::NotConfigured);
}

// ============================================================================
// TICKS
// ============================================================================

#[tokio::test]
async fn test_periodic_tick_sends_enabled_sentences_in_order() {
    let (rx, port) = receiver().await;
    let config = SimulatorConfig::new().with_sentences(vec![SentenceKind::MwvTrue, SentenceKind::Vwr]);
    let mut sim = simulator_to(port, config).await;

    let summary = sim.tick().await;

    assert_eq!(summary.wind_sent, 2);
    assert_eq!(summary.gps_sent, 0);
    assert_eq!(recv_line(&rx).await, encode_wind(45.0, 10.5, SentenceKind::Vwr));
    assert_eq!(recv_line(&rx).await, encode_wind(45.0, 10.5, SentenceKind::MwvTrue));
}

#[tokio::test]
async fn test_empty_wind_set_still_sends_rmc() {
    let (rx, port) = receiver().await;
    let mut sim = simulator_to(port, SimulatorConfig::new().with_sentences(Vec::new())).await;
    sim.set_mode(SimMode::Gps, true);

    let summary = sim.tick().await;

    assert_eq!(summary.wind_sent, 0);
    assert_eq!(summary.gps_sent, 1);
    let line = recv_line(&rx).await;
    assert!(line.starts_with("$GPRMC,"), "{}", line);
    assert!(validate_sentence(&line).is_ok());
    assert_eq!(sim.last_sent().map(|s| s.source), Some(LineSource::Gps));
}

#[tokio::test]
async fn test_tick_without_transport_records_failure() {
    let mut sim = Simulator::new(SimulatorConfig::new()).unwrap();

    let summary = sim.tick().await;

    assert_eq!(summary.wind_sent, 1);
    let last = sim.last_sent().expect("history entry");
    assert!(!last.ok);
    assert_eq!(last.detail, "No transport configured");
}

#[tokio::test]
async fn test_history_is_bounded_and_trimmed() {
    let (_rx, port) = receiver().await;
    let mut sim = simulator_to(port, SimulatorConfig::new().with_history_capacity(3)).await;

    for _ in 0..5 {
        sim.tick().await;
    }

    let lines = sim.last_sent_lines();
    assert_eq!(lines.len(), 3);
    assert!(lines.iter().all(|l| !l.ends_with('\n') && !l.ends_with('\r')));
    assert!(lines.iter().all(|l| l.starts_with("$WIVWR,")));
    assert_eq!(sim.snapshot().transport_stats.sentences_sent, 5);
}

#[tokio::test]
async fn test_sentence_toggle() {
    let (_rx, port) = receiver().await;
    let mut sim = simulator_to(port, SimulatorConfig::new()).await;

    sim.set_sentence_enabled(SentenceKind::MwvRelative, true);
    sim.set_sentence_enabled(SentenceKind::Vwr, false);

    assert_eq!(sim.enabled_sentences(), vec![SentenceKind::MwvRelative]);
    assert_eq!(sim.tick().await.wind_sent, 1);
}

// ============================================================================
// EDIT-DRIVEN SENDS
// ============================================================================

#[tokio::test]
async fn test_set_wind_sends_immediately_without_periodic() {
    let (rx, port) = receiver().await;
    let mut sim = simulator_to(port, SimulatorConfig::new().with_periodic_send(false)).await;

    assert!(sim.set_wind(270.0, 12.0).await);

    assert_eq!(recv_line(&rx).await, encode_wind(270.0, 12.0, SentenceKind::Vwr));
    assert_eq!(sim.tick().await.wind_sent, 0);
}

#[tokio::test]
async fn test_set_wind_waits_for_tick_with_periodic() {
    let (_rx, port) = receiver().await;
    let mut sim = simulator_to(port, SimulatorConfig::new()).await;

    assert!(sim.set_wind(270.0, 12.0).await);

    assert!(sim.history().is_empty());
    sim.tick().await;
    assert_eq!(
        sim.last_sent_lines(),
        vec![encode_wind(270.0, 12.0, SentenceKind::Vwr).trim_end().to_string()]
    );
}

#[tokio::test]
async fn test_set_wind_ignored_in_demo() {
    let (_rx, port) = receiver().await;
    let mut sim = simulator_to(port, SimulatorConfig::new().with_periodic_send(false)).await;
    sim.set_mode(SimMode::Demo, true);

    assert!(!sim.set_wind(270.0, 12.0).await);
    assert!(!sim.nudge_speed(1.0).await);
    assert!(sim.history().is_empty());
}

#[tokio::test]
async fn test_nudge_speed_sends_without_periodic() {
    let (rx, port) = receiver().await;
    let mut sim = simulator_to(port, SimulatorConfig::new().with_periodic_send(false)).await;

    assert!(sim.nudge_speed(1.5).await);

    assert_eq!(recv_line(&rx).await, encode_wind(45.0, 12.0, SentenceKind::Vwr));
}

#[tokio::test]
async fn test_demo_sends_without_periodic() {
    let (_rx, port) = receiver().await;
    let mut sim = simulator_to(port, SimulatorConfig::new().with_periodic_send(false)).await;
    sim.set_mode(SimMode::Demo, true);

    assert_eq!(sim.tick().await.wind_sent, 1);

    sim.set_mode(SimMode::Manual, true);
    assert_eq!(sim.tick().await.wind_sent, 0);
}

// ============================================================================
// TRANSPORT AND RELAY
// ============================================================================

#[tokio::test]
async fn test_rejected_transport_config_keeps_previous() {
    let (rx, port) = receiver().await;
    let mut sim = simulator_to(port, SimulatorConfig::new()).await;

    let result = sim.apply_transport_config(TransportConfig::udp("", port)).await;
    assert_eq!(result, Err(ConfigError::EmptyHost));

    sim.tick().await;
    assert!(recv_line(&rx).await.starts_with("$WIVWR,"));
}

#[tokio::test]
async fn test_reconfigure_moves_next_tick() {
    let (rx_a, port_a) = receiver().await;
    let (rx_b, port_b) = receiver().await;
    let mut sim = simulator_to(port_a, SimulatorConfig::new()).await;
    sim.tick().await;
    recv_line(&rx_a).await;

    sim.apply_transport_config(TransportConfig::udp("127.0.0.1", port_b).with_local_bind_addr("127.0.0.1:0"))
        .await
        .unwrap();
    sim.tick().await;

    assert!(recv_line(&rx_b).await.starts_with("$WIVWR,"));
    let history = sim.snapshot().connection_history;
    assert_eq!(history[0], format!("127.0.0.1:{}", port_b));
    assert_eq!(history[1], format!("127.0.0.1:{}", port_a));
}

#[tokio::test]
async fn test_relay_lines_forwarded_on_tick() {
    let (rx, port) = receiver().await;
    let config = SimulatorConfig::new()
        .with_periodic_send(false)
        .with_relay(RelayConfig::new().with_bind_addr("127.0.0.1:0"));
    let mut sim = simulator_to(port, config).await;
    let relay_addr = sim.toggle_relay(true).unwrap().expect("relay address");

    let sender = StdUdpSocket::bind("127.0.0.1:0").unwrap();
    sender
        .send_to(b"$WIMWV,10.0,R,5.0,N,A*XX\r\njunkline\r\n$WIVWR,1.0,R,1.0,N,,,,*YY\r\n", relay_addr)
        .unwrap();
    sleep(Duration::from_millis(50)).await;

    let summary = sim.tick().await;

    assert_eq!(summary.relayed, 2);
    assert_eq!(summary.total(), 2);
    assert_eq!(recv_line(&rx).await, "$WIMWV,10.0,R,5.0,N,A*XX\r\n");
    assert_eq!(recv_line(&rx).await, "$WIVWR,1.0,R,1.0,N,,,,*YY\r\n");
    assert!(sim.history().entries().all(|e| e.source == LineSource::Relay));

    let snapshot = sim.snapshot();
    assert_eq!(snapshot.relay_addr, Some(relay_addr));
    assert_eq!(snapshot.relay_stats.lines_forwarded, 2);
    assert_eq!(snapshot.relay_stats.lines_skipped, 1);

    assert_eq!(sim.toggle_relay(false), Ok(None));
    assert_eq!(sim.snapshot().relay_addr, None);
}

#[tokio::test]
async fn test_snapshot_reflects_state() {
    let (_rx, port) = receiver().await;
    let mut sim = simulator_to(port, SimulatorConfig::new()).await;
    sim.set_mode(SimMode::Gps, true);
    sim.set_periodic_send(false);
    sim.tick().await;

    let snapshot = sim.snapshot();

    assert!(snapshot.gps_active);
    assert!(!snapshot.demo_active);
    assert!(snapshot.demo_turn.is_none());
    assert!(!snapshot.periodic_send);
    assert_eq!(snapshot.sentences, vec![SentenceKind::Vwr]);
    assert_eq!(snapshot.connection.state, ConnectionState::Ready);
    assert_eq!(snapshot.ticks, 1);
}

#[tokio::test]
async fn test_shutdown_closes_transport() {
    let (_rx, port) = receiver().await;
    let mut sim = simulator_to(port, SimulatorConfig::new()).await;

    sim.shutdown().await;

    assert_eq!(sim.connection_status().state, ConnectionState::NotConfigured);
}
