//! TUI application - event handling and state management
//!
//! The App struct owns the AppState and handles all keyboard events.
//! It does not do any rendering - that's delegated to the views module.
//! Anything that needs the network is queued as a [`PendingAction`] for the runner.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{debug, trace};

use super::state::{AppState, InteractionMode, LocationField, LoginForm, PendingAction, SaveForm, TextInput};
use crate::wizard::{LocationSelection, Stage};

/// TUI application
#[derive(Debug, Default)]
pub struct App {
    state: AppState,
}

/// Result of a key press inside a modal form
enum FormOutcome {
    Stay,
    Close,
    Submit,
}

/// Apply common text-editing keys to an input; returns false if the key was not an edit
fn edit_input(input: &mut TextInput, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => input.insert(c),
        KeyCode::Backspace => input.backspace(),
        KeyCode::Left => input.left(),
        KeyCode::Right => input.right(),
        _ => return false,
    }
    true
}

impl App {
    pub fn new() -> Self {
        debug!("App::new: called");
        Self::default()
    }

    pub fn state(&self) -> &AppState {
        trace!("App::state: called");
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut AppState {
        trace!("App::state_mut: called");
        &mut self.state
    }

    /// Handle a key event
    ///
    /// Returns true if the application should exit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        debug!(?key, "App::handle_key: called");
        self.state.clear_error();

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            debug!("App::handle_key: Ctrl+C force quit");
            return true;
        }

        match &self.state.interaction_mode {
            InteractionMode::Normal => self.handle_normal_key(key),
            InteractionMode::EditLocation(field) => {
                let field = *field;
                self.handle_edit_location_key(field, key);
                false
            }
            InteractionMode::ChooseLocation(field) => {
                let field = *field;
                self.handle_choose_location_key(field, key);
                false
            }
            InteractionMode::Login(_) => {
                self.handle_login_key(key);
                false
            }
            InteractionMode::Save(_) => {
                self.handle_save_key(key);
                false
            }
            InteractionMode::SavedPlan | InteractionMode::Help => {
                if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('?') | KeyCode::Char('q')) {
                    debug!("App::handle_key: closing overlay");
                    self.state.interaction_mode = InteractionMode::Normal;
                }
                false
            }
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> bool {
        debug!(?key, stage = %self.state.stage(), "App::handle_normal_key: called");
        match key.code {
            KeyCode::Char('q') => {
                self.state.should_quit = true;
                return true;
            }
            KeyCode::Char('?') | KeyCode::F(1) => {
                self.state.interaction_mode = InteractionMode::Help;
            }
            KeyCode::Char('L') => {
                if self.state.logged_in {
                    debug!("App::handle_normal_key: logout requested");
                    self.state.queue(PendingAction::Logout);
                } else {
                    debug!("App::handle_normal_key: opening login");
                    self.state.interaction_mode = InteractionMode::Login(LoginForm::new(false));
                }
            }
            KeyCode::Tab => {
                if let Err(e) = self.state.wizard.advance() {
                    self.state.set_error(e.to_string());
                }
            }
            KeyCode::BackTab => {
                self.state.wizard.back();
            }
            KeyCode::Char(c @ '1'..='3') => {
                let stage = Stage::ALL[(c as u8 - b'1') as usize];
                if let Err(e) = self.state.wizard.go_to(stage) {
                    self.state.set_error(e.to_string());
                }
            }
            _ => match self.state.stage() {
                Stage::Location => self.handle_location_key(key),
                Stage::Filter => self.handle_filter_key(key),
                Stage::Results => self.handle_results_key(key),
            },
        }
        false
    }

    fn handle_location_key(&mut self, key: KeyEvent) {
        let field = self.state.location_field;
        match key.code {
            KeyCode::Up | KeyCode::Down | KeyCode::Char('j') | KeyCode::Char('k') => {
                self.state.location_field = field.toggle();
            }
            KeyCode::Enter | KeyCode::Char('e') => {
                debug!(?field, "App::handle_location_key: editing");
                self.state.interaction_mode = InteractionMode::EditLocation(field);
            }
            KeyCode::Char('c') => {
                debug!(?field, "App::handle_location_key: clearing");
                self.state.input_mut(field).clear();
                self.set_location(field, LocationSelection::unset());
            }
            _ => {}
        }
    }

    fn handle_edit_location_key(&mut self, field: LocationField, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.state.interaction_mode = InteractionMode::Normal;
            }
            KeyCode::Enter => {
                let query = self.state.input(field).value().trim().to_string();
                self.state.interaction_mode = InteractionMode::Normal;
                if query.is_empty() {
                    self.state.set_error("Type a place to search for");
                } else {
                    debug!(?field, %query, "App::handle_edit_location_key: searching");
                    self.state.queue(PendingAction::Geocode { field, query });
                }
            }
            _ => {
                edit_input(self.state.input_mut(field), key);
            }
        }
    }

    fn handle_choose_location_key(&mut self, field: LocationField, key: KeyEvent) {
        let count = self.state.candidates.len();
        match key.code {
            KeyCode::Esc => {
                self.state.candidates.clear();
                self.state.interaction_mode = InteractionMode::Normal;
            }
            KeyCode::Up | KeyCode::Char('k') => self.state.candidate_selection.select_prev(),
            KeyCode::Down | KeyCode::Char('j') => self.state.candidate_selection.select_next(count),
            KeyCode::Enter => {
                let index = self.state.candidate_selection.selected_index;
                let Some(place) = self.state.candidates.get(index).cloned() else {
                    return;
                };
                debug!(?field, name = %place.name, "App::handle_choose_location_key: chosen");
                *self.state.input_mut(field) = TextInput::with_value(place.name.clone());
                self.set_location(field, LocationSelection::new(place.name, place.coordinates));
                self.state.candidates.clear();
                self.state.interaction_mode = InteractionMode::Normal;
                if field == LocationField::Start {
                    self.state.location_field = LocationField::End;
                }
            }
            _ => {}
        }
    }

    fn set_location(&mut self, field: LocationField, location: LocationSelection) {
        match field {
            LocationField::Start => self.state.wizard.set_start(location),
            LocationField::End => self.state.wizard.set_end(location),
        }
    }

    fn handle_filter_key(&mut self, key: KeyEvent) {
        let count = self.state.wizard.available_attributes().len();
        let active = self.state.wizard.stops().active();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.state.attribute_selection.select_prev(),
            KeyCode::Down | KeyCode::Char('j') => self.state.attribute_selection.select_next(count),
            KeyCode::Enter | KeyCode::Char(' ') => {
                let index = self.state.attribute_selection.selected_index;
                let Some(name) = self
                    .state
                    .wizard
                    .available_attributes()
                    .get(index)
                    .map(|a| a.name.clone())
                else {
                    return;
                };
                debug!(%name, %active, "App::handle_filter_key: toggling attribute");
                self.state.wizard.toggle_attribute(&name);
            }
            KeyCode::Char('a') => {
                if !self.state.wizard.add_stop() {
                    self.state.set_error("Choose an attribute for this stop first");
                }
            }
            KeyCode::Char('x') => {
                if !self.state.wizard.remove_stop(active) {
                    self.state.set_error("Can't remove the only stop");
                }
            }
            KeyCode::Left | KeyCode::Char('h') => {
                self.state.wizard.set_active_stop(active.saturating_sub(1));
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.state.wizard.set_active_stop(active + 1);
            }
            _ => {}
        }
    }

    fn handle_results_key(&mut self, key: KeyEvent) {
        let count = self.state.suggested_venues().len();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.state.results_selection.select_prev(),
            KeyCode::Down | KeyCode::Char('j') => self.state.results_selection.select_next(count),
            KeyCode::Char('s') => {
                if count == 0 {
                    self.state.set_error("No suggestions to save");
                } else if !self.state.logged_in {
                    debug!("App::handle_results_key: login required before save");
                    self.state.set_status("Log in to save your plan");
                    self.state.interaction_mode = InteractionMode::Login(LoginForm::new(true));
                } else {
                    self.state.interaction_mode = InteractionMode::Save(SaveForm::default());
                }
            }
            _ => {}
        }
    }

    fn handle_login_key(&mut self, key: KeyEvent) {
        let InteractionMode::Login(form) = &mut self.state.interaction_mode else {
            return;
        };
        let outcome = match key.code {
            KeyCode::Esc => FormOutcome::Close,
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                form.password_focused = !form.password_focused;
                FormOutcome::Stay
            }
            KeyCode::Enter => {
                if form.email.value().trim().is_empty() {
                    form.error = Some("Email is required".to_string());
                    FormOutcome::Stay
                } else {
                    form.error = None;
                    FormOutcome::Submit
                }
            }
            _ => {
                edit_input(form.focused_mut(), key);
                FormOutcome::Stay
            }
        };

        match outcome {
            FormOutcome::Stay => {}
            FormOutcome::Close => {
                debug!("App::handle_login_key: cancelled");
                self.state.interaction_mode = InteractionMode::Normal;
            }
            FormOutcome::Submit => {
                let credentials = form.credentials();
                let then_save = form.then_save;
                self.state.queue(PendingAction::Login { credentials, then_save });
            }
        }
    }

    fn handle_save_key(&mut self, key: KeyEvent) {
        let InteractionMode::Save(form) = &mut self.state.interaction_mode else {
            return;
        };
        let outcome = match key.code {
            KeyCode::Esc => FormOutcome::Close,
            KeyCode::Tab | KeyCode::Down => {
                form.focus = form.focus.next();
                FormOutcome::Stay
            }
            KeyCode::Enter => FormOutcome::Submit,
            _ => {
                edit_input(form.focused_mut(), key);
                FormOutcome::Stay
            }
        };

        match outcome {
            FormOutcome::Stay => {}
            FormOutcome::Close => {
                self.state.interaction_mode = InteractionMode::Normal;
            }
            FormOutcome::Submit => match form.details() {
                Ok(details) => {
                    form.error = None;
                    self.state.queue(PendingAction::Save(details));
                }
                Err(e) => form.error = Some(e),
            },
        }
    }
}
