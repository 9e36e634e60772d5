//! Pathfinder - venue discovery and evening planning client
//!
//! Pathfinder plans an evening out as a walk: pick a start and an end point, describe
//! each stop by the attributes you want ("Live Music", "Pub"), and the backend suggests
//! one venue per stop along the shortest route. Logged-in users can save the result as
//! a plan.
//!
//! # Modules
//!
//! - [`api`] - backend REST client trait and HTTP implementation
//! - [`mapping`] - geocoding and walking directions
//! - [`session`] - login state backed by persistent storage
//! - [`wizard`] - the Location -> Attributes -> Results flow, suggestions and saving
//! - [`tui`] - interactive terminal front-end
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod mapping;
pub mod session;
pub mod tui;
pub mod wizard;

pub use api::{ApiError, Credentials, HttpApiClient, NewPlan, PathfinderApi, Registration, SuggestQuery, create_client};
pub use config::Config;
pub use domain::{Attribute, Coordinates, NamedPoint, Plan, PlanId, PlanSummary, Rating, User, Venue, VenueId};
pub use mapping::{MapClient, MapError, MapboxClient, Place, Route, create_map_client};
pub use session::{AuthError, Session};
pub use wizard::{
    LocationSelection, PlanDetails, PlanPersister, SaveError, ScriptError, ScriptOutcome, ScriptedPlan, Stage,
    SuggestionFetcher, SuggestionState, Wizard, WizardError,
};
