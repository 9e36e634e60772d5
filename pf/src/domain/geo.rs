//! Geographic points

use serde::{Deserialize, Serialize};
use std::fmt;

/// A longitude/latitude pair (WGS84, degrees)
///
/// Longitude comes first to match the mapping provider's `[lng, lat]` ordering.
/// `(0, 0)` is the "unset" sentinel used by location selections.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinates {
    pub longitude: f64,
    pub latitude: f64,
}

impl Coordinates {
    /// The unset sentinel
    pub const ZERO: Coordinates = Coordinates {
        longitude: 0.0,
        latitude: 0.0,
    };

    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self { longitude, latitude }
    }

    /// Check if this is the unset sentinel
    pub fn is_unset(&self) -> bool {
        self.longitude == 0.0 && self.latitude == 0.0
    }

    /// Check that both components are finite and in range
    pub fn is_valid(&self) -> bool {
        self.longitude.is_finite()
            && self.latitude.is_finite()
            && (-180.0..=180.0).contains(&self.longitude)
            && (-90.0..=90.0).contains(&self.latitude)
    }

    /// `[lng, lat]` pair as used by GeoJSON and the mapping provider
    pub fn as_lng_lat(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5},{:.5}", self.longitude, self.latitude)
    }
}

/// A named point such as a plan's start or end
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NamedPoint {
    pub name: String,
    pub coordinates: Coordinates,
}

impl NamedPoint {
    pub fn new(name: impl Into<String>, coordinates: Coordinates) -> Self {
        Self {
            name: name.into(),
            coordinates,
        }
    }
}
