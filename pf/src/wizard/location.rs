//! Start and end location selections

use crate::domain::{Coordinates, NamedPoint};

/// A chosen location: display name plus coordinates
///
/// Unset is an empty name and [`Coordinates::ZERO`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationSelection {
    pub name: String,
    pub coordinates: Coordinates,
}

impl LocationSelection {
    pub fn new(name: impl Into<String>, coordinates: Coordinates) -> Self {
        Self {
            name: name.into(),
            coordinates,
        }
    }

    pub fn unset() -> Self {
        Self::default()
    }

    /// Set means a non-empty display name
    pub fn is_set(&self) -> bool {
        !self.name.trim().is_empty()
    }

    pub fn to_named_point(&self) -> NamedPoint {
        NamedPoint::new(self.name.trim(), self.coordinates)
    }
}

impl From<NamedPoint> for LocationSelection {
    fn from(point: NamedPoint) -> Self {
        Self::new(point.name, point.coordinates)
    }
}
