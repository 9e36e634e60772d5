//! Domain types for Pathfinder
//!
//! Core entities shared by the API client, the wizard and the front-ends:
//! venues, attributes, plans, users and geographic points. Wire shapes from the
//! backend are parsed into these types at the API boundary (see `api::types`);
//! nothing outside that module sees raw JSON.

mod geo;
mod id;
mod plan;
mod user;
mod venue;

pub use geo::{Coordinates, NamedPoint};
pub use id::{PlanId, UserId, VenueId};
pub use plan::{Plan, PlanSummary};
pub use user::User;
pub use venue::{Attribute, Rating, RatingError, Venue};
