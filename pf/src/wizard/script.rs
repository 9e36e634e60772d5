//! Non-interactive wizard run
//!
//! Drives the same [`Wizard`], [`SuggestionFetcher`] and [`PlanPersister`] the TUI uses,
//! from free-text locations and a list of stops. Each location resolves to its best
//! geocoding match.

use thiserror::Error;
use tracing::{debug, info};

use super::{LocationSelection, PlanDetails, PlanPersister, SaveError, Stage, SuggestionFetcher, SuggestionState, Wizard, WizardError};
use crate::api::ApiError;
use crate::domain::{Attribute, PlanId, Venue};
use crate::mapping::{MapClient, MapError};
use crate::session::Session;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("No place found for '{0}'")]
    NoPlace(String),

    #[error("Location search failed: {0}")]
    Map(#[from] MapError),

    #[error("Stop {0} has no attributes")]
    EmptyStop(usize),

    #[error("Stop {0} could not be added")]
    StopRejected(usize),

    #[error("Unknown attribute '{0}' (see `pf attributes`)")]
    UnknownAttribute(String),

    #[error("Failed to load attributes: {0}")]
    Attributes(ApiError),

    #[error("No venues match these stops")]
    NoSuggestions,

    #[error(transparent)]
    Wizard(#[from] WizardError),

    #[error(transparent)]
    Save(#[from] SaveError),
}

/// A complete wizard input
#[derive(Debug, Clone)]
pub struct ScriptedPlan {
    pub start: String,
    pub end: String,
    /// Attribute tags per stop, in stop order
    pub stops: Vec<Vec<String>>,
    pub details: PlanDetails,
    /// Stop after fetching suggestions
    pub dry_run: bool,
}

/// What a scripted run resolved and produced
#[derive(Debug, Clone)]
pub struct ScriptOutcome {
    pub start: LocationSelection,
    pub end: LocationSelection,
    pub stops: Vec<Vec<String>>,
    pub venues: Vec<Venue>,
    /// Set unless this was a dry run
    pub plan_id: Option<PlanId>,
}

impl ScriptedPlan {
    pub async fn run(
        &self,
        session: &Session,
        maps: &dyn MapClient,
        persister: &PlanPersister,
    ) -> Result<ScriptOutcome, ScriptError> {
        debug!(start = %self.start, end = %self.end, stops = %self.stops.len(), dry_run = %self.dry_run, "ScriptedPlan::run: called");
        if !self.dry_run && !session.is_logged_in() {
            return Err(SaveError::LoginRequired.into());
        }
        // Stops are 1-based in messages
        if let Some(i) = self.stops.iter().position(|tags| tags.is_empty()) {
            return Err(ScriptError::EmptyStop(i + 1));
        }

        let mut wizard = Wizard::new();
        wizard.set_start(resolve(maps, &self.start).await?);
        wizard.set_end(resolve(maps, &self.end).await?);

        let attributes = session.api().attributes().await.map_err(ScriptError::Attributes)?;
        for (i, tags) in self.stops.iter().enumerate() {
            if i > 0 && !wizard.add_stop() {
                return Err(ScriptError::StopRejected(i + 1));
            }
            for tag in tags {
                let name = canonical(&attributes, tag)?;
                // Repeated tags are harmless, anything else means the stop was not filled
                let present = wizard.stops().stop(i).is_some_and(|stop| stop.contains(name));
                if !wizard.add_attribute(i, name) && !present {
                    return Err(ScriptError::StopRejected(i + 1));
                }
            }
        }
        wizard.set_available_attributes(attributes);
        wizard.go_to(Stage::Results)?;

        let mut fetcher = SuggestionFetcher::new(session.api().clone());
        fetcher.update(wizard.suggest_key());
        let venues = match fetcher.settle().await {
            SuggestionState::Ready(venues) => venues.clone(),
            _ => return Err(ScriptError::NoSuggestions),
        };
        debug!(count = %venues.len(), "ScriptedPlan::run: suggestions ready");

        let plan_id = if self.dry_run {
            None
        } else {
            let id = persister.save(session, &wizard, &venues, self.details.clone()).await?;
            info!(plan_id = %id, "Scripted plan saved");
            Some(id)
        };

        Ok(ScriptOutcome {
            start: wizard.start().clone(),
            end: wizard.end().clone(),
            stops: wizard.stops().attribute_sets(),
            venues,
            plan_id,
        })
    }
}

async fn resolve(maps: &dyn MapClient, query: &str) -> Result<LocationSelection, ScriptError> {
    let places = maps.geocode(query).await?;
    let place = places
        .into_iter()
        .next()
        .ok_or_else(|| ScriptError::NoPlace(query.to_string()))?;
    debug!(%query, name = %place.name, "resolve: best match");
    Ok(LocationSelection::new(place.name, place.coordinates))
}

/// The backend's spelling of a tag, matched case-insensitively
fn canonical<'a>(attributes: &'a [Attribute], tag: &str) -> Result<&'a str, ScriptError> {
    attributes
        .iter()
        .find(|a| a.name.eq_ignore_ascii_case(tag.trim()))
        .map(|a| a.name.as_str())
        .ok_or_else(|| ScriptError::UnknownAttribute(tag.to_string()))
}
