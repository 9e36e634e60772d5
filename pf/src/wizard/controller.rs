//! Three-stage plan-creation flow: Location, Attributes (filter), Results
//!
//! Stages unlock in order. After any change to locations or stops the current stage is
//! checked against its guard again; if it no longer holds, the wizard falls back to the
//! furthest stage that is still permitted. Nothing the user entered is discarded when
//! moving between stages.

use std::fmt;

use thiserror::Error;
use tracing::debug;

use super::{LocationSelection, StopAccumulator};
use crate::api::SuggestQuery;
use crate::domain::Attribute;

/// Wizard stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    #[default]
    Location,
    Filter,
    Results,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Location, Stage::Filter, Stage::Results];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn title(self) -> &'static str {
        match self {
            Stage::Location => "Location",
            Stage::Filter => "Attributes",
            Stage::Results => "Results",
        }
    }

    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Location => Some(Stage::Filter),
            Stage::Filter => Some(Stage::Results),
            Stage::Results => None,
        }
    }

    pub fn previous(self) -> Option<Stage> {
        match self {
            Stage::Location => None,
            Stage::Filter => Some(Stage::Location),
            Stage::Results => Some(Stage::Filter),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WizardError {
    #[error("Set both a start and an end location first")]
    LocationsRequired,

    #[error("Choose at least one attribute for the first stop first")]
    AttributeRequired,

    #[error("Already at the last stage")]
    NoNextStage,
}

/// Plan-creation wizard state
#[derive(Debug, Clone, Default)]
pub struct Wizard {
    stage: Stage,
    start: LocationSelection,
    end: LocationSelection,
    stops: StopAccumulator,
    attributes: Vec<Attribute>,
}

impl Wizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn start(&self) -> &LocationSelection {
        &self.start
    }

    pub fn end(&self) -> &LocationSelection {
        &self.end
    }

    pub fn stops(&self) -> &StopAccumulator {
        &self.stops
    }

    /// The attribute tags available to choose from
    pub fn available_attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn set_available_attributes(&mut self, attributes: Vec<Attribute>) {
        debug!(count = %attributes.len(), "Wizard::set_available_attributes: called");
        self.attributes = attributes;
    }

    fn guard(&self, stage: Stage) -> Result<(), WizardError> {
        let locations = self.start.is_set() && self.end.is_set();
        match stage {
            Stage::Location => Ok(()),
            Stage::Filter if !locations => Err(WizardError::LocationsRequired),
            Stage::Filter => Ok(()),
            Stage::Results if !locations => Err(WizardError::LocationsRequired),
            Stage::Results if self.stops.first_is_empty() => Err(WizardError::AttributeRequired),
            Stage::Results => Ok(()),
        }
    }

    /// Whether `stage` and every stage before it is unlocked
    pub fn can_enter(&self, stage: Stage) -> bool {
        self.guard(stage).is_ok()
    }

    /// The furthest stage currently permitted
    pub fn furthest_permitted(&self) -> Stage {
        Stage::ALL
            .into_iter()
            .rev()
            .find(|s| self.can_enter(*s))
            .unwrap_or(Stage::Location)
    }

    /// Jump to any unlocked stage
    pub fn go_to(&mut self, stage: Stage) -> Result<(), WizardError> {
        debug!(from = %self.stage(), to = %stage, "Wizard::go_to: called");
        self.guard(stage)?;
        self.stage = stage;
        Ok(())
    }

    pub fn advance(&mut self) -> Result<Stage, WizardError> {
        let next = self.stage().next().ok_or(WizardError::NoNextStage)?;
        self.go_to(next)?;
        Ok(next)
    }

    /// Step back one stage; returns false at the first stage
    pub fn back(&mut self) -> bool {
        match self.stage().previous() {
            Some(previous) => {
                self.stage = previous;
                true
            }
            None => false,
        }
    }

    fn enforce_guards(&mut self) {
        if !self.can_enter(self.stage()) {
            let fallback = self.furthest_permitted();
            debug!(from = %self.stage(), to = %fallback, "Wizard::enforce_guards: falling back");
            self.stage = fallback;
        }
    }

    pub fn set_start(&mut self, location: LocationSelection) {
        debug!(name = %location.name, "Wizard::set_start: called");
        self.start = location;
        self.enforce_guards();
    }

    pub fn set_end(&mut self, location: LocationSelection) {
        debug!(name = %location.name, "Wizard::set_end: called");
        self.end = location;
        self.enforce_guards();
    }

    pub fn add_stop(&mut self) -> bool {
        let changed = self.stops.add_stop(self.stops.active());
        self.enforce_guards();
        changed
    }

    pub fn remove_stop(&mut self, index: usize) -> bool {
        let changed = self.stops.remove_stop(index);
        self.enforce_guards();
        changed
    }

    pub fn set_active_stop(&mut self, index: usize) -> bool {
        self.stops.set_active(index)
    }

    pub fn add_attribute(&mut self, stop_index: usize, tag: &str) -> bool {
        let changed = self.stops.add_attribute(stop_index, tag);
        self.enforce_guards();
        changed
    }

    pub fn remove_attribute(&mut self, stop_index: usize, tag: &str) -> bool {
        let changed = self.stops.remove_attribute(stop_index, tag);
        self.enforce_guards();
        changed
    }

    /// Toggle a tag on the active stop
    pub fn toggle_attribute(&mut self, tag: &str) -> bool {
        let changed = self.stops.toggle_attribute(self.stops.active(), tag);
        self.enforce_guards();
        changed
    }

    /// The suggestion request for the current inputs
    ///
    /// `None` while either location is unset or the first stop has no attributes.
    pub fn suggest_key(&self) -> Option<SuggestQuery> {
        if !self.start.is_set() || !self.end.is_set() || self.stops.first_is_empty() {
            return None;
        }
        Some(SuggestQuery {
            start: self.start.coordinates,
            end: self.end.coordinates,
            attributes: self.stops.attribute_sets(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Coordinates;
    use proptest::prelude::*;

    fn bridge() -> LocationSelection {
        LocationSelection::new("Bristol Bridge", Coordinates::new(-2.5905, 51.4531))
    }

    fn clifton() -> LocationSelection {
        LocationSelection::new("Clifton", Coordinates::new(-2.6203, 51.4645))
    }

    fn located() -> Wizard {
        let mut wizard = Wizard::new();
        wizard.set_start(bridge());
        wizard.set_end(clifton());
        wizard
    }

    #[test]
    fn test_initial_stage_is_location() {
        let wizard = Wizard::new();
        assert_eq!(wizard.stage(), Stage::Location);
        assert!(!wizard.can_enter(Stage::Filter));
        assert!(wizard.suggest_key().is_none());
    }

    #[test]
    fn test_filter_requires_both_locations() {
        let mut wizard = Wizard::new();
        wizard.set_start(bridge());
        assert_eq!(wizard.advance(), Err(WizardError::LocationsRequired));

        wizard.set_end(clifton());
        assert_eq!(wizard.advance(), Ok(Stage::Filter));
    }

    #[test]
    fn test_results_requires_first_stop_attribute() {
        let mut wizard = located();
        wizard.advance().unwrap();
        assert_eq!(wizard.go_to(Stage::Results), Err(WizardError::AttributeRequired));

        wizard.toggle_attribute("Live Music");
        assert!(wizard.go_to(Stage::Results).is_ok());
        assert_eq!(wizard.advance(), Err(WizardError::NoNextStage));
    }

    #[test]
    fn test_jump_back_keeps_data() {
        let mut wizard = located();
        wizard.add_attribute(0, "Pub");
        wizard.go_to(Stage::Results).unwrap();
        wizard.go_to(Stage::Location).unwrap();

        assert_eq!(wizard.start().name, "Bristol Bridge");
        assert!(wizard.stops().stop(0).unwrap().contains("Pub"));
        assert!(wizard.go_to(Stage::Results).is_ok());
    }

    #[test]
    fn test_clearing_location_falls_back() {
        let mut wizard = located();
        wizard.add_attribute(0, "Pub");
        wizard.go_to(Stage::Results).unwrap();

        wizard.set_end(LocationSelection::unset());
        assert_eq!(wizard.stage(), Stage::Location);
    }

    #[test]
    fn test_emptying_first_stop_falls_back_to_filter() {
        let mut wizard = located();
        wizard.add_attribute(0, "Pub");
        wizard.go_to(Stage::Results).unwrap();

        wizard.remove_attribute(0, "Pub");
        assert_eq!(wizard.stage(), Stage::Filter);
    }

    #[test]
    fn test_suggest_key() {
        let mut wizard = located();
        wizard.add_attribute(0, "Live Music");

        let key = wizard.suggest_key().unwrap();
        assert_eq!(key.attributes, vec![vec!["Live Music".to_string()]]);
        assert_eq!(key.start, bridge().coordinates);
        assert_eq!(key.end, clifton().coordinates);

        // An empty trailing stop is not part of the request
        assert!(wizard.add_stop());
        assert_eq!(wizard.suggest_key().unwrap(), key);
    }

    #[derive(Debug, Clone)]
    enum Action {
        SetStart(bool),
        SetEnd(bool),
        AddStop,
        RemoveStop(usize),
        Toggle(usize),
        Remove(usize, usize),
        SelectStop(usize),
        GoTo(usize),
        Advance,
        Back,
    }

    const TAGS: [&str; 3] = ["Live Music", "Pub", "Food"];

    fn action() -> impl Strategy<Value = Action> {
        prop_oneof![
            any::<bool>().prop_map(Action::SetStart),
            any::<bool>().prop_map(Action::SetEnd),
            Just(Action::AddStop),
            (0..3usize).prop_map(Action::RemoveStop),
            (0..3usize).prop_map(Action::Toggle),
            (0..3usize, 0..3usize).prop_map(|(s, t)| Action::Remove(s, t)),
            (0..3usize).prop_map(Action::SelectStop),
            (0..3usize).prop_map(Action::GoTo),
            Just(Action::Advance),
            Just(Action::Back),
        ]
    }

    fn perform(wizard: &mut Wizard, action: &Action) {
        match *action {
            Action::SetStart(set) => wizard.set_start(if set { bridge() } else { LocationSelection::unset() }),
            Action::SetEnd(set) => wizard.set_end(if set { clifton() } else { LocationSelection::unset() }),
            Action::AddStop => {
                wizard.add_stop();
            }
            Action::RemoveStop(i) => {
                wizard.remove_stop(i);
            }
            Action::Toggle(t) => {
                wizard.toggle_attribute(TAGS[t]);
            }
            Action::Remove(s, t) => {
                wizard.remove_attribute(s, TAGS[t]);
            }
            Action::SelectStop(i) => {
                wizard.set_active_stop(i);
            }
            Action::GoTo(i) => {
                let _ = wizard.go_to(Stage::ALL[i]);
            }
            Action::Advance => {
                let _ = wizard.advance();
            }
            Action::Back => {
                wizard.back();
            }
        }
    }

    proptest! {
        #[test]
        fn prop_guards_hold_in_every_reachable_state(actions in prop::collection::vec(action(), 0..80)) {
            let mut wizard = Wizard::new();
            for action in &actions {
                perform(&mut wizard, action);

                let locations = wizard.start().is_set() && wizard.end().is_set();
                if wizard.stage() >= Stage::Filter {
                    prop_assert!(locations, "entered {} without locations after {:?}", wizard.stage(), action);
                }
                if wizard.stage() == Stage::Results {
                    prop_assert!(!wizard.stops().first_is_empty(), "entered Results with empty stop 0 after {:?}", action);
                }
                prop_assert!(wizard.stops().is_well_formed());
                prop_assert_eq!(wizard.suggest_key().is_some(), wizard.can_enter(Stage::Results));
            }
        }
    }
}
