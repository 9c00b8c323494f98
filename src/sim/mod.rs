// Sim module - THE CLOCK
// Wind and GPS state machines advanced once per scheduler tick

mod clock;
mod demo;
mod gps;
mod wind;

pub use clock::{SimMode, SimulationClock, TickPlan};

pub use demo::{
    shortest_signed_delta, DemoDriver, DemoTurn,
    LARGE_TURN_DEG, LARGE_TURN_EVERY, LARGE_TURN_STEPS,
    SMALL_TURN_DEG, SMALL_TURN_EVERY, SMALL_TURN_STEPS,
    SPEED_JITTER_KN,
};

pub use gps::{
    dead_reckon, GpsSimulator, GpsState,
    HEADING_CHANGE_EVERY, HEADING_JITTER_DEG, METERS_PER_DEGREE,
    SPEED_CHANGE_EVERY, SPEED_RANGE_KN,
};

pub use wind::{SpeedLimits, WindState, SPEED_MAX, SPEED_MIN};
