// NMEA Checksum
// XOR checksum over the payload between the start marker and '*'

use thiserror::Error;

/// Errors found while validating a framed sentence
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NmeaError {
    #[error("Missing '$' or '!' start marker")]
    MissingStart,

    #[error("Missing '*' checksum delimiter")]
    MissingChecksum,

    #[error("Malformed checksum: {0}")]
    MalformedChecksum(String),

    #[error("Checksum mismatch: computed {computed:02X}, found {found:02X}")]
    ChecksumMismatch { computed: u8, found: u8 },
}

fn is_start_marker(c: char) -> bool {
    c == '$' || c == '!'
}

/// XOR of every byte in the payload.
///
/// Accepts a bare payload (`WIMWV,...`) or a framed one (`$WIMWV,...*CC`);
/// the leading marker and anything from the first `*` onwards are ignored.
pub fn checksum(payload: &str) -> u8 {
    let body = payload.strip_prefix(is_start_marker).unwrap_or(payload);
    let body = body.split_once('*').map_or(body, |(head, _)| head);
    body.bytes().fold(0u8, |acc, b| acc ^ b)
}

/// Wrap a payload as `$<payload>*<CC>\r\n`
pub fn frame(payload: &str) -> String {
    format!("${}*{:02X}\r\n", payload, checksum(payload))
}

/// Check that a framed sentence carries the checksum of its payload.
///
/// Trailing CR/LF is ignored. Hex digits are accepted in either case.
pub fn validate_sentence(line: &str) -> Result<(), NmeaError> {
    let line = line.trim_end_matches(&['\r', '\n'][..]);
    let body = line
        .strip_prefix(is_start_marker)
        .ok_or(NmeaError::MissingStart)?;
    let (payload, digits) = body.rsplit_once('*').ok_or(NmeaError::MissingChecksum)?;

    if digits.len() != 2 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(NmeaError::MalformedChecksum(digits.to_string()));
    }
    let found = u8::from_str_radix(digits, 16)
        .map_err(|e| NmeaError::MalformedChecksum(e.to_string()))?;

    let computed = checksum(payload);
    if computed != found {
        return Err(NmeaError::ChecksumMismatch { computed, found });
    }
    Ok(())
}
