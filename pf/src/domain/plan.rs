//! Plan types
//!
//! A plan is a saved evening route: start point, ordered venues, end point and
//! optional scheduling. Venue order is significant (it is the walking order).

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::{Coordinates, NamedPoint, PlanId, Venue};

/// A saved plan with its venues resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub name: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub start_time: Option<NaiveTime>,
    pub start: NamedPoint,
    pub end: NamedPoint,
    pub venues: Vec<Venue>,
    #[serde(default)]
    pub is_public: bool,
}

impl Plan {
    /// Every point of the walking route in order: start, venues, end
    pub fn waypoints(&self) -> Vec<Coordinates> {
        let mut points = Vec::with_capacity(self.venues.len() + 2);
        points.push(self.start.coordinates);
        points.extend(self.venues.iter().map(|v| v.coordinates));
        points.push(self.end.coordinates);
        points
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            id: self.id,
            name: self.name.clone(),
            start_date: self.start_date,
            start_time: self.start_time,
            venue_count: self.venues.len(),
        }
    }
}

/// Listing entry for a plan (public plan lists)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub id: PlanId,
    pub name: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub start_time: Option<NaiveTime>,
    pub venue_count: usize,
}
