// GPS Simulation
// Dead reckoning from speed and heading with occasional random changes

use crate::nmea::{normalize_angle, GpsFix, KNOTS_TO_MS};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Meters per degree of latitude in the flat-earth approximation
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Ticks between speed changes
pub const SPEED_CHANGE_EVERY: u64 = 25;
/// Random speed range, knots
pub const SPEED_RANGE_KN: (f64, f64) = (3.0, 8.0);

/// Ticks between heading changes
pub const HEADING_CHANGE_EVERY: u64 = 50;
/// Maximum heading change, degrees either way
pub const HEADING_JITTER_DEG: f64 = 5.0;

/// Latitude is kept away from the poles where `cos(lat)` vanishes
const MAX_LATITUDE: f64 = 89.9;

/// Simulated vessel position and motion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsState {
    /// Decimal degrees, north positive
    pub lat: f64,
    /// Decimal degrees, east positive
    pub lon: f64,
    /// Clockwise from north, `[0, 360)`
    pub heading_deg: f64,
    /// Speed over ground, knots
    pub speed_kn: f64,
}

impl Default for GpsState {
    fn default() -> Self {
        // Helsinki, South Harbour
        Self {
            lat: 60.1580,
            lon: 24.9550,
            heading_deg: 180.0,
            speed_kn: 5.0,
        }
    }
}

impl GpsState {
    pub fn new(lat: f64, lon: f64, heading_deg: f64, speed_kn: f64) -> Self {
        Self {
            lat: lat.clamp(-MAX_LATITUDE, MAX_LATITUDE),
            lon: wrap_longitude(lon),
            heading_deg: normalize_angle(heading_deg),
            speed_kn: speed_kn.max(0.0),
        }
    }

    /// Values for the RMC encoder
    pub fn fix(&self) -> GpsFix {
        GpsFix {
            lat: self.lat,
            lon: self.lon,
            speed_kn: self.speed_kn,
            heading_deg: self.heading_deg,
        }
    }
}

fn wrap_longitude(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Move `gps` along its heading for `dt_secs` seconds.
///
/// Flat-earth projection: one degree of latitude is `METERS_PER_DEGREE`,
/// one degree of longitude shrinks with `cos(lat)`.
pub fn dead_reckon(gps: &mut GpsState, dt_secs: f64) {
    let distance_m = gps.speed_kn * KNOTS_TO_MS * dt_secs;
    let heading = gps.heading_deg.to_radians();
    let d_deg = distance_m / METERS_PER_DEGREE;

    // North-positive: heading 0 raises latitude. Formulas written as
    // `-(d/111320)*cos(h)` assume a south-positive axis and are not used here.
    let d_lat = d_deg * heading.cos();
    let d_lon = d_deg * heading.sin() / gps.lat.to_radians().cos();

    gps.lat = (gps.lat + d_lat).clamp(-MAX_LATITUDE, MAX_LATITUDE);
    gps.lon = wrap_longitude(gps.lon + d_lon);
}

/// Drives `GpsState` while GPS simulation is on
#[derive(Debug, Clone)]
pub struct GpsSimulator {
    tick_count: u64,
    tick_secs: f64,
}

impl GpsSimulator {
    pub fn new(tick_secs: f64) -> Self {
        Self {
            tick_count: 0,
            tick_secs,
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Advance one tick: maybe re-pick speed or heading, then move
    pub fn step<R: Rng>(&mut self, gps: &mut GpsState, rng: &mut R) {
        if self.tick_count % SPEED_CHANGE_EVERY == 0 {
            gps.speed_kn = rng.gen_range(SPEED_RANGE_KN.0..=SPEED_RANGE_KN.1);
        }
        if self.tick_count % HEADING_CHANGE_EVERY == 0 {
            let change = rng.gen_range(-HEADING_JITTER_DEG..=HEADING_JITTER_DEG);
            gps.heading_deg = normalize_angle(gps.heading_deg + change);
        }

        dead_reckon(gps, self.tick_secs);
        self.tick_count += 1;
    }
}
