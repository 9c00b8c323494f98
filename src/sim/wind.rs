// Wind State
// Apparent wind angle and speed, kept normalized and within speed limits

use crate::nmea::normalize_angle;
use serde::{Deserialize, Serialize};

/// Lowest speed the simulator will produce, knots
pub const SPEED_MIN: f64 = 0.0;

/// Highest speed the simulator will produce, knots
pub const SPEED_MAX: f64 = 70.0;

/// Inclusive speed bounds in knots
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedLimits {
    pub min: f64,
    pub max: f64,
}

impl Default for SpeedLimits {
    fn default() -> Self {
        Self {
            min: SPEED_MIN,
            max: SPEED_MAX,
        }
    }
}

impl SpeedLimits {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, speed_kn: f64) -> f64 {
        if speed_kn.is_nan() {
            return self.min;
        }
        speed_kn.clamp(self.min, self.max)
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min >= 0.0 && self.min <= self.max
    }
}

/// Current wind as the instrument reports it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindState {
    /// Angle off the bow, `[0, 360)`
    pub angle_deg: f64,
    /// Speed in knots
    pub speed_kn: f64,
}

impl Default for WindState {
    fn default() -> Self {
        Self {
            angle_deg: 45.0,
            speed_kn: 10.5,
        }
    }
}

impl WindState {
    pub fn new(angle_deg: f64, speed_kn: f64, limits: &SpeedLimits) -> Self {
        let mut wind = Self::default();
        wind.set(angle_deg, speed_kn, limits);
        wind
    }

    /// Overwrite both values, normalizing the angle and clamping the speed
    pub fn set(&mut self, angle_deg: f64, speed_kn: f64, limits: &SpeedLimits) {
        if angle_deg.is_finite() {
            self.angle_deg = normalize_angle(angle_deg);
        }
        self.speed_kn = limits.clamp(speed_kn);
    }

    /// Add `delta` to the speed, staying within limits
    pub fn nudge_speed(&mut self, delta: f64, limits: &SpeedLimits) {
        self.speed_kn = limits.clamp(self.speed_kn + delta);
    }
}
