// Simulation Clock
// Advances wind and GPS state once per tick and decides what is due to send

use crate::sim::{DemoDriver, GpsSimulator, GpsState, SpeedLimits, WindState};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio::time::Duration;
use tracing::debug;

/// Simulation modes the UI can select
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimMode {
    /// External setters drive the wind; demo and GPS stopped
    Manual,
    /// Scripted wind turns
    Demo,
    /// Dead-reckoning position, independent of the wind driver
    Gps,
}

impl fmt::Display for SimMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manual => f.write_str("manual"),
            Self::Demo => f.write_str("demo"),
            Self::Gps => f.write_str("gps"),
        }
    }
}

impl FromStr for SimMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "manual" => Ok(Self::Manual),
            "demo" => Ok(Self::Demo),
            "gps" => Ok(Self::Gps),
            other => Err(format!("unknown mode: {}", other)),
        }
    }
}

/// What one tick wants sent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickPlan {
    /// Send every enabled wind sentence
    pub send_wind: bool,
    /// Send an RMC sentence
    pub send_gps: bool,
}

/// Owner of the simulated wind and position.
///
/// One call to `tick` per scheduler period; the plan it returns is the only
/// thing that triggers periodic sends, so demo/GPS activity and periodic
/// sending never produce two sends of the same sentence in one tick.
pub struct SimulationClock {
    wind: WindState,
    gps: GpsState,
    limits: SpeedLimits,
    tick_interval: Duration,
    demo: Option<DemoDriver>,
    gps_sim: Option<GpsSimulator>,
    rng: StdRng,
    ticks: u64,
}

impl SimulationClock {
    pub fn new(wind: WindState, gps: GpsState, limits: SpeedLimits, tick_interval: Duration) -> Self {
        Self {
            wind,
            gps,
            limits,
            tick_interval,
            demo: None,
            gps_sim: None,
            rng: StdRng::from_entropy(),
            ticks: 0,
        }
    }

    /// Deterministic randomness for reproducible runs
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn wind(&self) -> WindState {
        self.wind
    }

    pub fn gps(&self) -> GpsState {
        self.gps
    }

    pub fn limits(&self) -> SpeedLimits {
        self.limits
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_demo_active(&self) -> bool {
        self.demo.is_some()
    }

    pub fn is_gps_active(&self) -> bool {
        self.gps_sim.is_some()
    }

    /// Demo driver state while demo mode is on
    pub fn demo(&self) -> Option<&DemoDriver> {
        self.demo.as_ref()
    }

    /// Turn a mode on or off.
    ///
    /// `Manual` stops demo and GPS regardless of `enabled`. Starting a mode
    /// that is already running keeps its counters.
    pub fn set_mode(&mut self, mode: SimMode, enabled: bool) {
        match mode {
            SimMode::Manual => {
                self.demo = None;
                self.gps_sim = None;
            }
            SimMode::Demo if enabled => {
                self.demo.get_or_insert_with(DemoDriver::new);
            }
            SimMode::Demo => self.demo = None,
            SimMode::Gps if enabled => {
                let tick_secs = self.tick_interval.as_secs_f64();
                self.gps_sim.get_or_insert_with(|| GpsSimulator::new(tick_secs));
            }
            SimMode::Gps => self.gps_sim = None,
        }
        debug!(
            %mode,
            enabled,
            demo = self.is_demo_active(),
            gps = self.is_gps_active(),
            "Simulation mode changed"
        );
    }

    /// Manual wind input. Ignored while demo mode owns the wind; returns
    /// whether the value was applied.
    pub fn set_wind(&mut self, angle_deg: f64, speed_kn: f64) -> bool {
        if self.is_demo_active() {
            return false;
        }
        self.wind.set(angle_deg, speed_kn, &self.limits);
        true
    }

    /// Manual speed nudge, same ownership rule as `set_wind`
    pub fn nudge_speed(&mut self, delta_kn: f64) -> bool {
        if self.is_demo_active() {
            return false;
        }
        self.wind.nudge_speed(delta_kn, &self.limits);
        true
    }

    /// Advance active modes by one tick
    pub fn tick(&mut self, periodic_send: bool) -> TickPlan {
        if let Some(demo) = self.demo.as_mut() {
            demo.step(&mut self.wind, &self.limits, &mut self.rng);
        }
        if let Some(sim) = self.gps_sim.as_mut() {
            sim.step(&mut self.gps, &mut self.rng);
        }
        self.ticks += 1;

        TickPlan {
            send_wind: periodic_send || self.demo.is_some(),
            send_gps: self.gps_sim.is_some(),
        }
    }
}
