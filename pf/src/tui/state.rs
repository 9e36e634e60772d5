//! TUI application state
//!
//! Pure data structures for the TUI. No rendering logic here.
//! The wizard itself lives in `crate::wizard`; this module holds what the screen needs
//! around it: text inputs, selections, modal forms and loading flags.

use chrono::{NaiveDate, NaiveTime};
use tracing::debug;

use crate::api::Credentials;
use crate::domain::{Plan, Venue};
use crate::mapping::{Place, Route};
use crate::wizard::{PlanDetails, Stage, SuggestionState, Wizard};

/// Which location input is selected on the Location tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocationField {
    #[default]
    Start,
    End,
}

impl LocationField {
    pub fn toggle(self) -> Self {
        match self {
            Self::Start => Self::End,
            Self::End => Self::Start,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Start => "Start",
            Self::End => "End",
        }
    }
}

/// Single-line text input with a cursor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    value: String,
    /// Cursor position in characters
    cursor: usize,
}

impl TextInput {
    pub fn with_value(value: impl Into<String>) -> Self {
        let value = value.into();
        let cursor = value.chars().count();
        Self { value, cursor }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn byte_offset(&self, chars: usize) -> usize {
        self.value
            .char_indices()
            .nth(chars)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    pub fn insert(&mut self, c: char) {
        let at = self.byte_offset(self.cursor);
        self.value.insert(at, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let at = self.byte_offset(self.cursor - 1);
        self.value.remove(at);
        self.cursor -= 1;
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.value.chars().count());
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    /// Value with every character replaced, for password fields
    pub fn masked(&self) -> String {
        "*".repeat(self.value.chars().count())
    }
}

/// List selection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub selected_index: usize,
}

impl SelectionState {
    pub fn select_next(&mut self, max_items: usize) {
        if max_items > 0 && self.selected_index < max_items - 1 {
            self.selected_index += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected_index = self.selected_index.saturating_sub(1);
    }

    /// Ensure selection is within bounds
    pub fn clamp(&mut self, max_items: usize) {
        if max_items == 0 {
            self.selected_index = 0;
        } else if self.selected_index >= max_items {
            self.selected_index = max_items - 1;
        }
    }
}

/// Login modal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub email: TextInput,
    pub password: TextInput,
    /// False = email focused, true = password focused
    pub password_focused: bool,
    /// Field-level error from the last attempt
    pub error: Option<String>,
    /// Continue to the save form once logged in
    pub then_save: bool,
}

impl LoginForm {
    pub fn new(then_save: bool) -> Self {
        Self {
            then_save,
            ..Default::default()
        }
    }

    pub fn focused_mut(&mut self) -> &mut TextInput {
        if self.password_focused {
            &mut self.password
        } else {
            &mut self.email
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.email.value().trim(), self.password.value())
    }
}

/// Fields of the save-details modal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveField {
    #[default]
    Name,
    Date,
    Time,
}

impl SaveField {
    pub fn next(self) -> Self {
        match self {
            Self::Name => Self::Date,
            Self::Date => Self::Time,
            Self::Time => Self::Name,
        }
    }
}

/// Save-details modal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveForm {
    pub name: TextInput,
    /// `YYYY-MM-DD`, optional
    pub date: TextInput,
    /// `HH:MM`, optional
    pub time: TextInput,
    pub focus: SaveField,
    pub error: Option<String>,
}

impl SaveForm {
    pub fn focused_mut(&mut self) -> &mut TextInput {
        match self.focus {
            SaveField::Name => &mut self.name,
            SaveField::Date => &mut self.date,
            SaveField::Time => &mut self.time,
        }
    }

    /// Parse the form; blank date/time are left unset
    pub fn details(&self) -> Result<PlanDetails, String> {
        let date = self.date.value().trim();
        let time = self.time.value().trim();

        let start_date = match date {
            "" => None,
            d => Some(NaiveDate::parse_from_str(d, "%Y-%m-%d").map_err(|_| format!("Invalid date '{}' (use YYYY-MM-DD)", d))?),
        };
        let start_time = match time {
            "" => None,
            t => Some(NaiveTime::parse_from_str(t, "%H:%M").map_err(|_| format!("Invalid time '{}' (use HH:MM)", t))?),
        };

        Ok(PlanDetails {
            name: self.name.value().to_string(),
            start_date,
            start_time,
        })
    }
}

/// Current interaction mode
#[derive(Debug, Clone, Default, PartialEq)]
pub enum InteractionMode {
    #[default]
    Normal,
    /// Typing into a location input
    EditLocation(LocationField),
    /// Choosing among geocoding candidates for a location
    ChooseLocation(LocationField),
    Login(LoginForm),
    Save(SaveForm),
    /// Showing a just-saved plan
    SavedPlan,
    Help,
}

/// Work the runner performs outside the key handler
#[derive(Debug, Clone, PartialEq)]
pub enum PendingAction {
    Geocode { field: LocationField, query: String },
    Login { credentials: Credentials, then_save: bool },
    Logout,
    Save(PlanDetails),
}

/// Independent loading indicators, one per operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Loading {
    pub attributes: bool,
    pub geocode: bool,
    pub login: bool,
    pub save: bool,
}

/// Main TUI application state
#[derive(Debug, Default)]
pub struct AppState {
    pub wizard: Wizard,
    /// Mirror of the suggestion fetcher's state
    pub suggestions: SuggestionState,
    pub interaction_mode: InteractionMode,
    pub should_quit: bool,
    pub error_message: Option<String>,
    pub status_message: Option<String>,

    // === Location tab ===
    pub location_field: LocationField,
    pub start_input: TextInput,
    pub end_input: TextInput,
    pub candidates: Vec<Place>,
    pub candidate_selection: SelectionState,

    // === Attributes / Results tabs ===
    pub attribute_selection: SelectionState,
    pub results_selection: SelectionState,

    // === Session ===
    pub logged_in: bool,
    pub user_name: Option<String>,

    pub loading: Loading,
    pub pending_action: Option<PendingAction>,
    pub saved_plan: Option<Plan>,
    /// Walking route through the saved plan, when a mapping provider is configured
    pub saved_route: Option<Route>,
}

impl AppState {
    pub fn new() -> Self {
        debug!("AppState::new: called");
        Self::default()
    }

    pub fn stage(&self) -> Stage {
        self.wizard.stage()
    }

    pub fn input(&self, field: LocationField) -> &TextInput {
        match field {
            LocationField::Start => &self.start_input,
            LocationField::End => &self.end_input,
        }
    }

    pub fn input_mut(&mut self, field: LocationField) -> &mut TextInput {
        match field {
            LocationField::Start => &mut self.start_input,
            LocationField::End => &mut self.end_input,
        }
    }

    /// Venues shown on the Results tab, in backend order
    pub fn suggested_venues(&self) -> &[Venue] {
        self.suggestions.venues().unwrap_or(&[])
    }

    pub fn set_error(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        debug!(%msg, "AppState::set_error: called");
        self.error_message = Some(msg);
    }

    pub fn clear_error(&mut self) {
        self.error_message = None;
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
    }

    /// Queue an action for the runner unless one is already waiting
    pub fn queue(&mut self, action: PendingAction) {
        debug!(?action, "AppState::queue: called");
        if self.pending_action.is_none() {
            self.pending_action = Some(action);
        }
    }
}
