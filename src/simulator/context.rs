// Simulator Context
// The single owner of wind, GPS, transport and relay state

use crate::nmea::{encode_gps, encode_wind, SentenceKind};
use crate::relay::{RelayForwarder, RelayStats};
use crate::sim::{DemoTurn, GpsState, SimMode, SimulationClock, WindState};
use crate::simulator::{LineSource, SendHistory, SentLine, SimulatorConfig};
use crate::transport::{
    ConfigError, SendReport, TransportConfig, TransportError, TransportManager, TransportStats,
    TransportStatus,
};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeSet;
use std::net::SocketAddr;
use tokio::time::Duration;
use tracing::{debug, info};

/// What one tick sent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Wind sentences sent
    pub wind_sent: usize,
    /// RMC sentences sent
    pub gps_sent: usize,
    /// Relay lines forwarded
    pub relayed: usize,
}

impl TickSummary {
    pub fn total(&self) -> usize {
        self.wind_sent + self.gps_sent + self.relayed
    }
}

/// Read-only view for status displays
#[derive(Debug, Clone, Serialize)]
pub struct SimulatorSnapshot {
    pub wind: WindState,
    pub gps: GpsState,
    pub demo_active: bool,
    pub demo_turn: Option<DemoTurn>,
    pub gps_active: bool,
    pub periodic_send: bool,
    pub sentences: Vec<SentenceKind>,
    pub connection: TransportStatus,
    pub connection_history: Vec<String>,
    pub transport_stats: TransportStats,
    pub relay_addr: Option<SocketAddr>,
    pub relay_stats: RelayStats,
    pub ticks: u64,
}

/// The simulator.
///
/// Every mutation goes through `&mut self`, so whoever owns the value (the
/// scheduler task in `run`) serializes all access; a reconfiguration always
/// completes before the next tick sends anything.
pub struct Simulator {
    config: SimulatorConfig,
    clock: SimulationClock,
    transport: TransportManager,
    relay: RelayForwarder,
    enabled: BTreeSet<SentenceKind>,
    periodic_send: bool,
    history: SendHistory,
}

impl Simulator {
    /// Build a simulator with no transport configured yet
    pub fn new(config: SimulatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let limits = config.speed_limits();
        let wind = WindState::new(config.initial_angle_deg, config.initial_speed_kn, &limits);
        let mut clock = SimulationClock::new(wind, config.initial_gps, limits, tick_duration(&config));
        if let Some(seed) = config.seed {
            clock = clock.with_seed(seed);
        }

        Ok(Self {
            clock,
            transport: TransportManager::new(),
            relay: RelayForwarder::new(config.relay.clone()),
            enabled: config.sentences.iter().copied().collect(),
            periodic_send: config.periodic_send,
            history: SendHistory::new(config.history_capacity),
            config,
        })
    }

    /// Replace the transport manager, e.g. one with a shorter connect timeout
    pub fn with_transport_manager(mut self, transport: TransportManager) -> Self {
        self.transport = transport;
        self
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn tick_interval(&self) -> Duration {
        tick_duration(&self.config)
    }

    // ========================================================================
    // ENTRY POINTS
    // ========================================================================

    /// Manual wind input.
    ///
    /// Ignored while demo mode drives the wind. With periodic sending off
    /// the new value is sent once right away, otherwise the next tick
    /// carries it.
    pub async fn set_wind(&mut self, angle_deg: f64, speed_kn: f64) -> bool {
        let applied = self.clock.set_wind(angle_deg, speed_kn);
        if applied {
            self.send_on_edit().await;
        } else {
            debug!("Manual wind ignored while demo mode is active");
        }
        applied
    }

    /// Manual speed nudge, same rules as `set_wind`
    pub async fn nudge_speed(&mut self, delta_kn: f64) -> bool {
        let applied = self.clock.nudge_speed(delta_kn);
        if applied {
            self.send_on_edit().await;
        }
        applied
    }

    pub fn set_sentence_enabled(&mut self, kind: SentenceKind, enabled: bool) {
        if enabled {
            self.enabled.insert(kind);
        } else {
            self.enabled.remove(&kind);
        }
    }

    /// Enabled wind sentences in emission order
    pub fn enabled_sentences(&self) -> Vec<SentenceKind> {
        self.enabled.iter().copied().collect()
    }

    pub fn set_mode(&mut self, mode: SimMode, enabled: bool) {
        self.clock.set_mode(mode, enabled);
    }

    pub fn set_periodic_send(&mut self, enabled: bool) {
        self.periodic_send = enabled;
    }

    pub fn is_periodic_send(&self) -> bool {
        self.periodic_send
    }

    /// Swap the outbound transport. Rejected configurations leave the
    /// current transport in place.
    pub async fn apply_transport_config(&mut self, config: TransportConfig) -> Result<TransportStatus, ConfigError> {
        self.transport.configure(config).await
    }

    /// Turn the relay on (returns its bound address) or off
    pub fn toggle_relay(&mut self, enabled: bool) -> Result<Option<SocketAddr>, TransportError> {
        if enabled {
            self.relay.enable().map(Some)
        } else {
            self.relay.disable();
            Ok(None)
        }
    }

    /// Sent sentences without CR/LF, most recent last
    pub fn last_sent_lines(&self) -> Vec<String> {
        self.history.lines()
    }

    /// The most recent send with its outcome
    pub fn last_sent(&self) -> Option<&SentLine> {
        self.history.last()
    }

    pub fn history(&self) -> &SendHistory {
        &self.history
    }

    pub fn connection_status(&self) -> TransportStatus {
        self.transport.status()
    }

    pub fn wind(&self) -> WindState {
        self.clock.wind()
    }

    pub fn gps(&self) -> GpsState {
        self.clock.gps()
    }

    pub fn snapshot(&self) -> SimulatorSnapshot {
        SimulatorSnapshot {
            wind: self.clock.wind(),
            gps: self.clock.gps(),
            demo_active: self.clock.is_demo_active(),
            demo_turn: self.clock.demo().and_then(|d| d.turn().copied()),
            gps_active: self.clock.is_gps_active(),
            periodic_send: self.periodic_send,
            sentences: self.enabled_sentences(),
            connection: self.transport.status(),
            connection_history: self.transport.connection_history(),
            transport_stats: self.transport.stats(),
            relay_addr: self.relay.local_addr(),
            relay_stats: self.relay.stats(),
            ticks: self.clock.ticks(),
        }
    }

    // ========================================================================
    // TICK
    // ========================================================================

    /// One scheduler period: advance the clock, send what is due, drain
    /// the relay.
    pub async fn tick(&mut self) -> TickSummary {
        let plan = self.clock.tick(self.periodic_send);
        let mut summary = TickSummary::default();

        if plan.send_wind {
            summary.wind_sent = self.send_wind().await;
        }
        if plan.send_gps {
            self.send_gps().await;
            summary.gps_sent = 1;
        }

        let history = &mut self.history;
        summary.relayed = self
            .relay
            .drain_and_forward(&mut self.transport, |line, report| {
                history.push(record(line, LineSource::Relay, report));
            })
            .await;

        summary
    }

    /// Close the relay and the transport
    pub async fn shutdown(&mut self) {
        self.relay.disable();
        self.transport.shutdown().await;
        info!(stats = ?self.transport.stats(), "Simulator stopped");
    }

    async fn send_on_edit(&mut self) {
        if !self.periodic_send && !self.clock.is_demo_active() {
            self.send_wind().await;
        }
    }

    /// Send every enabled wind sentence; an empty set sends nothing
    async fn send_wind(&mut self) -> usize {
        let wind = self.clock.wind();
        let kinds: Vec<SentenceKind> = self.enabled.iter().copied().collect();
        for kind in &kinds {
            let line = encode_wind(wind.angle_deg, wind.speed_kn, *kind);
            self.emit(line, LineSource::Wind).await;
        }
        kinds.len()
    }

    async fn send_gps(&mut self) {
        let line = encode_gps(&self.clock.gps().fix(), Utc::now());
        self.emit(line, LineSource::Gps).await;
    }

    async fn emit(&mut self, line: String, source: LineSource) {
        let report = self.transport.send(line.as_bytes()).await;
        self.history.push(record(&line, source, &report));
    }
}

fn tick_duration(config: &SimulatorConfig) -> Duration {
    Duration::from_millis(config.tick_interval_ms)
}

fn record(line: &str, source: LineSource, report: &SendReport) -> SentLine {
    SentLine {
        line: line.trim_end_matches(&['\r', '\n'][..]).to_string(),
        source,
        ok: report.ok(),
        detail: report.describe(),
        sent_at: Utc::now(),
    }
}
