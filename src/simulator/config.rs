// Simulator Configuration
// Startup values for the clock, send history and relay

use crate::nmea::SentenceKind;
use crate::relay::RelayConfig;
use crate::sim::{GpsState, SpeedLimits, SPEED_MAX, SPEED_MIN};
use crate::transport::ConfigError;
use serde::{Deserialize, Serialize};

/// Configuration for a `Simulator`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Scheduler period in milliseconds
    pub tick_interval_ms: u64,
    /// Sent lines kept for display
    pub history_capacity: usize,
    /// Slowest wind speed, knots
    pub speed_min_kn: f64,
    /// Fastest wind speed, knots
    pub speed_max_kn: f64,
    /// Starting wind angle
    pub initial_angle_deg: f64,
    /// Starting wind speed
    pub initial_speed_kn: f64,
    /// Starting GPS state
    pub initial_gps: GpsState,
    /// Wind sentences enabled at startup
    pub sentences: Vec<SentenceKind>,
    /// Resend the wind every tick even when nothing changes
    pub periodic_send: bool,
    /// Fixed seed for demo/GPS randomness
    pub seed: Option<u64>,
    /// Relay socket settings
    pub relay: RelayConfig,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 200,
            history_capacity: 20,
            speed_min_kn: SPEED_MIN,
            speed_max_kn: SPEED_MAX,
            initial_angle_deg: 45.0,
            initial_speed_kn: 10.5,
            initial_gps: GpsState::default(),
            sentences: vec![SentenceKind::Vwr],
            periodic_send: true,
            seed: None,
            relay: RelayConfig::default(),
        }
    }
}

impl SimulatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tick_interval_ms(mut self, ms: u64) -> Self {
        self.tick_interval_ms = ms;
        self
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    pub fn with_speed_limits(mut self, min_kn: f64, max_kn: f64) -> Self {
        self.speed_min_kn = min_kn;
        self.speed_max_kn = max_kn;
        self
    }

    pub fn with_initial_wind(mut self, angle_deg: f64, speed_kn: f64) -> Self {
        self.initial_angle_deg = angle_deg;
        self.initial_speed_kn = speed_kn;
        self
    }

    pub fn with_initial_gps(mut self, gps: GpsState) -> Self {
        self.initial_gps = gps;
        self
    }

    pub fn with_sentences(mut self, sentences: Vec<SentenceKind>) -> Self {
        self.sentences = sentences;
        self
    }

    pub fn with_periodic_send(mut self, enabled: bool) -> Self {
        self.periodic_send = enabled;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_relay(mut self, relay: RelayConfig) -> Self {
        self.relay = relay;
        self
    }

    pub fn speed_limits(&self) -> SpeedLimits {
        SpeedLimits::new(self.speed_min_kn, self.speed_max_kn)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidValue("tick_interval_ms cannot be 0".to_string()));
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::InvalidValue("history_capacity cannot be 0".to_string()));
        }
        if !self.speed_limits().is_valid() {
            return Err(ConfigError::InvalidValue(format!(
                "speed limits {}..{} are not a valid range",
                self.speed_min_kn, self.speed_max_kn
            )));
        }
        if !self.initial_angle_deg.is_finite() || !self.initial_speed_kn.is_finite() {
            return Err(ConfigError::InvalidValue("initial wind must be finite".to_string()));
        }
        if self.relay.max_datagrams_per_tick == 0 {
            return Err(ConfigError::InvalidValue(
                "relay max_datagrams_per_tick cannot be 0".to_string(),
            ));
        }
        Ok(())
    }
}
