// NMEA module - THE SENTENCES
// Pure encoding of wind and position sentences with XOR checksums

mod checksum;
mod sentence;

pub use checksum::{checksum, frame, validate_sentence, NmeaError};

pub use sentence::{
    // Encoders
    encode_gps, encode_wind,
    // Angle helpers
    normalize_angle, to_side_components,
    // Types
    GpsFix, SentenceKind, Side,
    // Unit conversions
    KNOTS_TO_KMH, KNOTS_TO_MS,
};
