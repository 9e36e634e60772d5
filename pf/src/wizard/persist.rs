//! Saving the finished plan

use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::Wizard;
use crate::api::{ApiError, NewPlan};
use crate::config::PlanConfig;
use crate::domain::{PlanId, Venue};
use crate::session::Session;

/// User-entered details on the save form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanDetails {
    pub name: String,
    pub start_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("Log in to save a plan")]
    LoginRequired,

    #[error("No suggested venues to save")]
    NoSuggestions,

    #[error("Start and end locations must be set")]
    LocationsUnset,

    #[error("Failed to save plan: {0}")]
    Api(#[from] ApiError),
}

#[derive(Debug, Clone)]
pub struct PlanPersister {
    default_name: String,
}

impl PlanPersister {
    pub fn new(default_name: impl Into<String>) -> Self {
        Self {
            default_name: default_name.into(),
        }
    }

    pub fn from_config(config: &PlanConfig) -> Self {
        Self::new(config.default_name.clone())
    }

    /// Build the create request without sending it
    ///
    /// Venues keep the order given, which is the walking order.
    pub fn build(&self, wizard: &Wizard, venues: &[Venue], details: PlanDetails) -> Result<NewPlan, SaveError> {
        debug!(venues = %venues.len(), "PlanPersister::build: called");
        if venues.is_empty() {
            return Err(SaveError::NoSuggestions);
        }
        if !wizard.start().is_set() || !wizard.end().is_set() {
            return Err(SaveError::LocationsUnset);
        }

        let name = match details.name.trim() {
            "" => {
                debug!(default = %self.default_name, "PlanPersister::build: blank name, using default");
                self.default_name.clone()
            }
            name => name.to_string(),
        };

        Ok(NewPlan {
            name,
            start_date: details.start_date,
            start_time: details.start_time,
            venues: venues.iter().map(|v| v.id).collect(),
            start: wizard.start().to_named_point(),
            end: wizard.end().to_named_point(),
        })
    }

    /// Create the plan on the backend
    ///
    /// Logged-out callers get [`SaveError::LoginRequired`] before anything is sent.
    /// Failures are returned as-is and never retried.
    pub async fn save(
        &self,
        session: &Session,
        wizard: &Wizard,
        venues: &[Venue],
        details: PlanDetails,
    ) -> Result<PlanId, SaveError> {
        debug!("PlanPersister::save: called");
        if !session.is_logged_in() {
            debug!("PlanPersister::save: not logged in");
            return Err(SaveError::LoginRequired);
        }

        let plan = self.build(wizard, venues, details)?;
        match session.api().create_plan(&plan).await {
            Ok(id) => {
                info!(plan_id = %id, name = %plan.name, "Plan saved");
                Ok(id)
            }
            Err(e) => {
                warn!(error = %e, "Plan save failed");
                Err(SaveError::Api(e))
            }
        }
    }
}
