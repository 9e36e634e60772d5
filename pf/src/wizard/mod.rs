//! Plan-creation wizard
//!
//! Pure state for the Location -> Attributes -> Results flow ([`Wizard`]), the reactive
//! suggestion layer on top of it ([`SuggestionFetcher`]) and the final save
//! ([`PlanPersister`]). Front-ends (TUI and the scripted `pf plan` command) drive these;
//! none of them render anything.

mod controller;
mod location;
mod persist;
mod script;
mod stops;
mod suggest;

pub use controller::{Stage, Wizard, WizardError};
pub use location::LocationSelection;
pub use persist::{PlanDetails, PlanPersister, SaveError};
pub use script::{ScriptError, ScriptOutcome, ScriptedPlan};
pub use stops::{Stop, StopAccumulator};
pub use suggest::{SuggestionFetcher, SuggestionState};
