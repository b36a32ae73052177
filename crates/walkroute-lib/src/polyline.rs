//! Encoded polyline codec (precision 1e5).
//!
//! Each coordinate is scaled by 100000, rounded, and delta-encoded against
//! the previous point (starting from `(0, 0)`). Deltas are zig-zag
//! transformed so the sign lives in the lowest bit, split into 5-bit groups
//! (least significant first) with `0x20` marking a continuation, and offset
//! by 63 into printable ASCII. Latitude precedes longitude for every point.

use crate::coord::Coordinate;
use crate::error::{Error, Result};

/// Scale between degrees and encoded integer units.
const PRECISION: f64 = 1e5;

/// Offset that moves 5-bit chunks into printable ASCII.
const CHUNK_OFFSET: u8 = 63;

/// Continuation flag on every chunk except the last of a value.
const CONTINUATION: u64 = 0x20;

const CHUNK_MASK: u64 = 0x1f;

/// Encode points as a polyline string.
pub fn encode(points: &[Coordinate]) -> String {
    let mut encoded = String::with_capacity(points.len() * 8);
    let mut previous = (0i64, 0i64);

    for point in points {
        let lat = scale(point.lat);
        let lon = scale(point.lon);
        encode_value(lat - previous.0, &mut encoded);
        encode_value(lon - previous.1, &mut encoded);
        previous = (lat, lon);
    }

    encoded
}

/// Decode a polyline string back into points.
pub fn decode(encoded: &str) -> Result<Vec<Coordinate>> {
    let bytes = encoded.as_bytes();
    let mut points = Vec::new();
    let mut position = 0usize;
    let mut lat = 0i64;
    let mut lon = 0i64;

    while position < bytes.len() {
        lat = accumulate(lat, bytes, &mut position)?;
        if position >= bytes.len() {
            return Err(Error::MalformedPolyline { position });
        }
        lon = accumulate(lon, bytes, &mut position)?;

        points.push(Coordinate::new(
            lat as f64 / PRECISION,
            lon as f64 / PRECISION,
        ));
    }

    Ok(points)
}

fn scale(degrees: f64) -> i64 {
    // f64::round rounds half away from zero.
    (degrees * PRECISION).round() as i64
}

fn encode_value(delta: i64, out: &mut String) {
    let mut value = ((delta << 1) ^ (delta >> 63)) as u64;
    while value >= CONTINUATION {
        out.push(chunk_char((CONTINUATION | (value & CHUNK_MASK)) as u8));
        value >>= 5;
    }
    out.push(chunk_char(value as u8));
}

fn chunk_char(chunk: u8) -> char {
    char::from(chunk + CHUNK_OFFSET)
}

/// Add the next delta to a running value; overflow is malformed input.
fn accumulate(current: i64, bytes: &[u8], position: &mut usize) -> Result<i64> {
    let start = *position;
    let delta = decode_value(bytes, position)?;
    current
        .checked_add(delta)
        .ok_or(Error::MalformedPolyline { position: start })
}

fn decode_value(bytes: &[u8], position: &mut usize) -> Result<i64> {
    let mut result = 0u64;
    let mut shift = 0u32;

    loop {
        let Some(&byte) = bytes.get(*position) else {
            return Err(Error::MalformedPolyline {
                position: *position,
            });
        };
        if !(CHUNK_OFFSET..=b'~').contains(&byte) || shift >= 64 {
            return Err(Error::MalformedPolyline {
                position: *position,
            });
        }
        *position += 1;

        let chunk = u64::from(byte - CHUNK_OFFSET);
        result |= (chunk & CHUNK_MASK) << shift;
        shift += 5;

        if chunk & CONTINUATION == 0 {
            break;
        }
    }

    let value = (result >> 1) as i64;
    Ok(if result & 1 == 1 { !value } else { value })
}
