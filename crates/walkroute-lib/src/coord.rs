use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Scale applied to degrees in fixed-point storage.
pub const FIXED_POINT_SCALE: f64 = 1e9;

/// Mean Earth radius in meters (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance in meters using the haversine formula.
    pub fn haversine_distance(&self, other: &Self) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlat = lat2 - lat1;
        let dlon = (other.lon - self.lon).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
    }

    /// Position on a sphere of radius [`EARTH_RADIUS_M`], centred on the Earth.
    pub(crate) fn to_cartesian(self) -> [f64; 3] {
        let lat = self.lat.to_radians();
        let lon = self.lon.to_radians();
        [
            EARTH_RADIUS_M * lat.cos() * lon.cos(),
            EARTH_RADIUS_M * lat.cos() * lon.sin(),
            EARTH_RADIUS_M * lat.sin(),
        ]
    }

    fn validate(self, input: &str) -> Result<Self, Error> {
        let reason = if !self.lat.is_finite() || !self.lon.is_finite() {
            Some("values must be finite numbers")
        } else if !(-90.0..=90.0).contains(&self.lat) {
            Some("latitude must be within [-90, 90]")
        } else if !(-180.0..=180.0).contains(&self.lon) {
            Some("longitude must be within [-180, 180]")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(Error::InvalidCoordinate {
                input: input.to_string(),
                reason: reason.to_string(),
            }),
            None => Ok(self),
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.lat, self.lon)
    }
}

/// Parses `"lat,lng"` in degrees.
impl FromStr for Coordinate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| Error::InvalidCoordinate {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let mut parts = s.split(',');
        let (Some(lat), Some(lon), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(invalid("expected 'lat,lng'"));
        };

        let lat: f64 = lat
            .trim()
            .parse()
            .map_err(|_| invalid("latitude is not a number"))?;
        let lon: f64 = lon
            .trim()
            .parse()
            .map_err(|_| invalid("longitude is not a number"))?;

        Coordinate::new(lat, lon).validate(s)
    }
}

const MAX_LAT_E9: i64 = 90_000_000_000;
const MAX_LON_E9: i64 = 180_000_000_000;

/// Position stored as integer degrees scaled by 1e9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FixedCoordinate {
    pub lat_e9: i64,
    pub lon_e9: i64,
}

impl FixedCoordinate {
    pub fn new(lat_e9: i64, lon_e9: i64) -> Self {
        Self { lat_e9, lon_e9 }
    }

    pub fn from_degrees(coordinate: Coordinate) -> Self {
        Self {
            lat_e9: (coordinate.lat * FIXED_POINT_SCALE).round() as i64,
            lon_e9: (coordinate.lon * FIXED_POINT_SCALE).round() as i64,
        }
    }

    /// `true` when latitude is within ±90° and longitude within ±180°.
    pub fn is_in_range(&self) -> bool {
        (-MAX_LAT_E9..=MAX_LAT_E9).contains(&self.lat_e9)
            && (-MAX_LON_E9..=MAX_LON_E9).contains(&self.lon_e9)
    }

    pub fn to_degrees(self) -> Coordinate {
        Coordinate {
            lat: self.lat_e9 as f64 / FIXED_POINT_SCALE,
            lon: self.lon_e9 as f64 / FIXED_POINT_SCALE,
        }
    }
}
