// Demo Driver
// Scripted wind shifts: a 20° turn every 25 ticks, an 80° turn every 100

use crate::nmea::normalize_angle;
use crate::sim::{SpeedLimits, WindState};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Ticks between large turns
pub const LARGE_TURN_EVERY: u64 = 100;
/// Size of a large turn, degrees
pub const LARGE_TURN_DEG: f64 = 80.0;
/// Steps a large turn takes (3 s at 200 ms)
pub const LARGE_TURN_STEPS: u32 = 15;

/// Ticks between small turns
pub const SMALL_TURN_EVERY: u64 = 25;
/// Size of a small turn, degrees
pub const SMALL_TURN_DEG: f64 = 20.0;
/// Steps a small turn takes (5 s at 200 ms)
pub const SMALL_TURN_STEPS: u32 = 25;

/// Maximum speed change per tick, knots
pub const SPEED_JITTER_KN: f64 = 0.2;

/// Signed difference `target - start` taking the short way round, in
/// `[-180, 180)`.
pub fn shortest_signed_delta(target_deg: f64, start_deg: f64) -> f64 {
    (target_deg - start_deg + 540.0).rem_euclid(360.0) - 180.0
}

// ============================================================================
// DEMO TURN
// ============================================================================

/// A turn in progress
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DemoTurn {
    pub start_angle: f64,
    pub target_angle: f64,
    pub total_steps: u32,
    pub current_step: u32,
}

impl DemoTurn {
    pub fn new(start_angle: f64, target_angle: f64, total_steps: u32) -> Self {
        Self {
            start_angle: normalize_angle(start_angle),
            target_angle: normalize_angle(target_angle),
            total_steps: total_steps.max(1),
            current_step: 0,
        }
    }

    /// Turn `delta_deg` away from `start_angle`
    pub fn by(start_angle: f64, delta_deg: f64, total_steps: u32) -> Self {
        Self::new(start_angle, start_angle + delta_deg, total_steps)
    }

    /// Move one step; the last step lands exactly on the target
    pub fn advance(&mut self) -> f64 {
        if self.current_step < self.total_steps {
            self.current_step += 1;
        }
        let frac = self.current_step as f64 / self.total_steps as f64;
        let delta = shortest_signed_delta(self.target_angle, self.start_angle);
        normalize_angle(self.start_angle + frac * delta)
    }

    pub fn is_complete(&self) -> bool {
        self.current_step >= self.total_steps
    }
}

// ============================================================================
// DEMO DRIVER
// ============================================================================

/// Drives `WindState` while demo mode is on
#[derive(Debug, Clone, Default)]
pub struct DemoDriver {
    tick_count: u64,
    turn: Option<DemoTurn>,
}

impl DemoDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn in progress, if any
    pub fn turn(&self) -> Option<&DemoTurn> {
        self.turn.as_ref()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Advance one tick: maybe start a turn, step the active turn, jitter
    /// the speed.
    pub fn step<R: Rng>(&mut self, wind: &mut WindState, limits: &SpeedLimits, rng: &mut R) {
        if self.tick_count % LARGE_TURN_EVERY == 0 {
            let delta = random_direction(rng) * LARGE_TURN_DEG;
            self.turn = Some(DemoTurn::by(wind.angle_deg, delta, LARGE_TURN_STEPS));
        } else if self.tick_count % SMALL_TURN_EVERY == 0 {
            let delta = random_direction(rng) * SMALL_TURN_DEG;
            self.turn = Some(DemoTurn::by(wind.angle_deg, delta, SMALL_TURN_STEPS));
        }

        if let Some(turn) = self.turn.as_mut() {
            wind.angle_deg = turn.advance();
            if turn.is_complete() {
                self.turn = None;
            }
        }

        let jitter = rng.gen_range(-SPEED_JITTER_KN..=SPEED_JITTER_KN);
        wind.speed_kn = limits.clamp(wind.speed_kn + jitter);

        self.tick_count += 1;
    }
}

fn random_direction<R: Rng>(rng: &mut R) -> f64 {
    if rng.gen_bool(0.5) {
        1.0
    } else {
        -1.0
    }
}
