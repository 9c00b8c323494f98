// Simulator Handle Tests
// Commands through the scheduler task, periodic ticking and shutdown

use tokio::net::UdpSocket;
use tokio::time::{sleep, timeout, Duration};
use windsim::nmea::{encode_wind, SentenceKind};
use windsim::sim::SimMode;
use windsim::simulator::{spawn, HandleError, Simulator, SimulatorConfig};
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

fn udp_to(port: u16) -> TransportConfig {
    TransportConfig::udp("127.0.0.1", port).with_local_bind_addr("127.0.0.1:0")
}

fn fast_config() -> SimulatorConfig {
    SimulatorConfig::new().with_tick_interval_ms(20).with_seed(8)
}

#[tokio::test]
async fn test_scheduler_ticks_periodically() {
    let (rx, port) = receiver().await;
    let (handle, task) = spawn(Simulator::new(fast_config()).unwrap());
    handle.apply_transport_config(udp_to(port)).await.unwrap().unwrap();

    for _ in 0..3 {
        assert!(recv_line(&rx).await.starts_with("$WIVWR,"));
    }

    handle.shutdown().await;
    let sim = task.await.unwrap();
    assert!(sim.snapshot().ticks >= 3);
}

#[tokio::test]
async fn test_set_wind_through_handle() {
    let (rx, port) = receiver().await;
    let (handle, task) = spawn(Simulator::new(fast_config().with_periodic_send(false)).unwrap());
    handle.apply_transport_config(udp_to(port)).await.unwrap().unwrap();

    assert_eq!(handle.set_wind(270.0, 12.0).await, Ok(true));

    assert_eq!(recv_line(&rx).await, encode_wind(270.0, 12.0, SentenceKind::Vwr));
    assert_eq!(
        handle.last_sent_lines().await.unwrap(),
        vec![encode_wind(270.0, 12.0, SentenceKind::Vwr).trim_end().to_string()]
    );

    handle.shutdown().await;
    task.await.unwrap();
}

#[tokio::test]
async fn test_demo_blocks_manual_wind_through_handle() {
    let (handle, task) = spawn(Simulator::new(fast_config()).unwrap());

    handle.set_mode(SimMode::Demo, true).await.unwrap();

    assert_eq!(handle.set_wind(10.0, 10.0).await, Ok(false));
    assert_eq!(handle.nudge_speed(1.0).await, Ok(false));
    assert!(handle.snapshot().await.unwrap().demo_active);

    handle.shutdown().await;
    task.await.unwrap();
}

#[tokio::test]
async fn test_rejected_config_reported_to_caller() {
    let (handle, task) = spawn(Simulator::new(fast_config()).unwrap());

    let result = handle.apply_transport_config(udp_to(0)).await.unwrap();

    assert_eq!(result, Err(ConfigError::InvalidPort(0)));
    assert_eq!(
        handle.connection_status().await.unwrap().state,
        ConnectionState::NotConfigured
    );

    handle.shutdown().await;
    task.await.unwrap();
}

#[tokio::test]
async fn test_settings_commands_apply_in_order() {
    let (handle, task) = spawn(Simulator::new(fast_config()).unwrap());

    handle.set_sentence_enabled(SentenceKind::MwvTrue, true).await.unwrap();
    handle.set_periodic_send(false).await.unwrap();
    handle.set_mode(SimMode::Gps, true).await.unwrap();
    let snapshot = handle.snapshot().await.unwrap();

    assert_eq!(snapshot.sentences, vec![SentenceKind::Vwr, SentenceKind::MwvTrue]);
    assert!(!snapshot.periodic_send);
    assert!(snapshot.gps_active);

    handle.shutdown().await;
    task.await.unwrap();
}

#[tokio::test]
async fn test_relay_toggle_through_handle() {
    let config = fast_config().with_relay(windsim::relay::RelayConfig::new().with_bind_addr("127.0.0.1:0"));
    let (handle, task) = spawn(Simulator::new(config).unwrap());

    let addr = handle.toggle_relay(true).await.unwrap().unwrap();
    assert!(addr.is_some());
    assert_eq!(handle.toggle_relay(false).await.unwrap(), Ok(None));

    handle.shutdown().await;
    task.await.unwrap();
}

#[tokio::test]
async fn test_handle_errors_after_shutdown() {
    let (handle, task) = spawn(Simulator::new(fast_config()).unwrap());

    handle.shutdown().await;
    task.await.unwrap();

    assert_eq!(handle.snapshot().await.err(), Some(HandleError::Stopped));
    assert_eq!(handle.set_wind(1.0, 1.0).await, Err(HandleError::Stopped));
    // Shutting down twice is harmless
    handle.shutdown().await;
}

#[tokio::test]
async fn test_dropping_all_handles_stops_scheduler() {
    let (handle, task) = spawn(Simulator::new(fast_config()).unwrap());
    sleep(Duration::from_millis(30)).await;

    drop(handle);

    let sim = timeout(Duration::from_secs(2), task)
        .await
        .expect("scheduler kept running")
        .unwrap();
    assert_eq!(sim.connection_status().state, ConnectionState::NotConfigured);
}
