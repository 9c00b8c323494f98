// NMEA Sentence Encoders
// Wind (VWR/VWT/MWV) and position (RMC) sentences built from plain values

use crate::nmea::checksum::frame;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Knots to meters per second
pub const KNOTS_TO_MS: f64 = 0.514444;

/// Knots to kilometers per hour
pub const KNOTS_TO_KMH: f64 = 1.852;

// ============================================================================
// ANGLES
// ============================================================================

/// Wrap any angle into `[0, 360)`
pub fn normalize_angle(angle_deg: f64) -> f64 {
    let a = angle_deg.rem_euclid(360.0);
    // rem_euclid can round tiny negatives up to exactly 360.0
    if a >= 360.0 {
        0.0
    } else {
        a
    }
}

/// Normalize and round to the one decimal the wire carries, so that
/// 359.96 goes out as 0.0 instead of 360.0.
fn wire_angle(angle_deg: f64) -> f64 {
    let rounded = (normalize_angle(angle_deg) * 10.0).round() / 10.0;
    if rounded >= 360.0 {
        0.0
    } else {
        rounded
    }
}

/// Which tack the wind is on, relative to the bow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn as_char(&self) -> char {
        match self {
            Self::Left => 'L',
            Self::Right => 'R',
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Split a compass angle into magnitude off the bow plus side.
///
/// Angles up to and including 180 are starboard (`R`), everything past it
/// is port (`L`) measured the other way round.
pub fn to_side_components(angle_deg: f64) -> (f64, Side) {
    let a = normalize_angle(angle_deg);
    if a <= 180.0 {
        (a, Side::Right)
    } else {
        (360.0 - a, Side::Left)
    }
}

// ============================================================================
// SENTENCE KIND
// ============================================================================

/// Wind sentence variants the simulator can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SentenceKind {
    /// Relative wind, magnitude + side
    Vwr,
    /// True wind, magnitude + side
    Vwt,
    /// MWV with apparent (R) reference
    MwvRelative,
    /// MWV with true (T) reference
    MwvTrue,
}

type PayloadFormatter = fn(f64, f64) -> String;

/// Variant → payload formatter, in emission order
const WIND_ENCODERS: [(SentenceKind, PayloadFormatter); 4] = [
    (SentenceKind::Vwr, vwr_payload),
    (SentenceKind::Vwt, vwt_payload),
    (SentenceKind::MwvRelative, mwv_relative_payload),
    (SentenceKind::MwvTrue, mwv_true_payload),
];

impl SentenceKind {
    /// All kinds in emission order
    pub const ALL: [SentenceKind; 4] = [
        SentenceKind::Vwr,
        SentenceKind::Vwt,
        SentenceKind::MwvRelative,
        SentenceKind::MwvTrue,
    ];

    /// Human label, as shown in settings and accepted on the command line
    pub fn label(&self) -> &'static str {
        match self {
            Self::Vwr => "VWR",
            Self::Vwt => "VWT",
            Self::MwvRelative => "MWV(R)",
            Self::MwvTrue => "MWV(T)",
        }
    }

    /// Three-letter sentence formatter on the wire
    pub fn formatter(&self) -> &'static str {
        match self {
            Self::Vwr => "VWR",
            Self::Vwt => "VWT",
            Self::MwvRelative | Self::MwvTrue => "MWV",
        }
    }

    fn payload_formatter(&self) -> PayloadFormatter {
        WIND_ENCODERS
            .iter()
            .find(|(kind, _)| kind == self)
            .map(|(_, f)| *f)
            .unwrap_or(vwr_payload)
    }
}

impl fmt::Display for SentenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SentenceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "VWR" => Ok(Self::Vwr),
            "VWT" => Ok(Self::Vwt),
            "MWV(R)" | "MWVR" | "MWV-R" => Ok(Self::MwvRelative),
            "MWV(T)" | "MWVT" | "MWV-T" => Ok(Self::MwvTrue),
            other => Err(format!("unknown sentence kind: {}", other)),
        }
    }
}

// ============================================================================
// WIND PAYLOADS
// ============================================================================

fn side_payload(id: &str, angle_deg: f64, speed_kn: f64) -> String {
    let (magnitude, side) = to_side_components(angle_deg);
    format!(
        "{},{:.1},{},{:.1},N,{:.2},M,{:.2},K",
        id,
        magnitude,
        side,
        speed_kn,
        speed_kn * KNOTS_TO_MS,
        speed_kn * KNOTS_TO_KMH,
    )
}

fn vwr_payload(angle_deg: f64, speed_kn: f64) -> String {
    side_payload("WIVWR", angle_deg, speed_kn)
}

fn vwt_payload(angle_deg: f64, speed_kn: f64) -> String {
    side_payload("WIVWT", angle_deg, speed_kn)
}

fn mwv_relative_payload(angle_deg: f64, speed_kn: f64) -> String {
    format!("WIMWV,{:.1},R,{:.1},N,A", wire_angle(angle_deg), speed_kn)
}

fn mwv_true_payload(angle_deg: f64, speed_kn: f64) -> String {
    format!("WIMWV,{:.1},T,{:.1},N,A", wire_angle(angle_deg), speed_kn)
}

/// Encode a wind reading as a complete, checksummed sentence
pub fn encode_wind(angle_deg: f64, speed_kn: f64, kind: SentenceKind) -> String {
    frame(&(kind.payload_formatter())(angle_deg, speed_kn))
}

// ============================================================================
// POSITION
// ============================================================================

/// Position, speed and course for an RMC sentence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsFix {
    /// Decimal degrees, north positive
    pub lat: f64,
    /// Decimal degrees, east positive
    pub lon: f64,
    /// Speed over ground in knots
    pub speed_kn: f64,
    /// Course over ground, clockwise from north
    pub heading_deg: f64,
}

/// Split absolute decimal degrees into whole degrees and minutes rounded to
/// four decimals, carrying 60.0000 into the next degree.
fn degrees_minutes(abs_deg: f64) -> (u32, f64) {
    let whole = abs_deg.floor();
    let minutes = ((abs_deg - whole) * 60.0 * 10_000.0).round() / 10_000.0;
    if minutes >= 60.0 {
        (whole as u32 + 1, 0.0)
    } else {
        (whole as u32, minutes)
    }
}

/// Encode an RMC sentence.
///
/// Time and date come from the caller so that the encoder stays pure.
pub fn encode_gps(fix: &GpsFix, utc: DateTime<Utc>) -> String {
    let (lat_deg, lat_min) = degrees_minutes(fix.lat.abs());
    let (lon_deg, lon_min) = degrees_minutes(fix.lon.abs());
    let ns = if fix.lat < 0.0 { 'S' } else { 'N' };
    let ew = if fix.lon < 0.0 { 'W' } else { 'E' };

    let payload = format!(
        "GPRMC,{},A,{:02}{:07.4},{},{:03}{:07.4},{},{:.1},{:.1},{},,,",
        utc.format("%H%M%S"),
        lat_deg,
        lat_min,
        ns,
        lon_deg,
        lon_min,
        ew,
        fix.speed_kn,
        wire_angle(fix.heading_deg),
        utc.format("%d%m%y"),
    );
    frame(&payload)
}
