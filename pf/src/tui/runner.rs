//! TUI Runner - main loop that owns the terminal and the background work
//!
//! The TuiRunner is responsible for:
//! - Dispatching terminal events to App for handling
//! - Feeding the wizard's request key to the suggestion fetcher
//! - Running queued actions (search, login, save) as background tasks
//! - Applying task results back onto AppState

use std::sync::Arc;
use std::time::Duration;

use eyre::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::Tui;
use super::app::App;
use super::events::{Event, EventHandler};
use super::state::{AppState, InteractionMode, LocationField, LoginForm, PendingAction, SaveForm};
use super::views;
use crate::api::ApiError;
use crate::domain::{Attribute, Plan, PlanId, User};
use crate::mapping::{MapClient, MapError, Place, Route};
use crate::session::{AuthError, Session};
use crate::wizard::{PlanPersister, SaveError, SuggestionFetcher};

const TICK_RATE: Duration = Duration::from_millis(100);

/// Result from a background task
#[derive(Debug)]
pub(crate) enum TaskResult {
    Attributes(Result<Vec<Attribute>, ApiError>),
    CurrentUser(Result<User, AuthError>),
    Geocode {
        field: LocationField,
        query: String,
        result: Result<Vec<Place>, MapError>,
    },
    Login {
        result: Result<User, AuthError>,
        then_save: bool,
    },
    Saved(Result<SavedPlan, SaveError>),
}

/// A created plan, with its details when they could be fetched back
#[derive(Debug)]
pub(crate) struct SavedPlan {
    id: PlanId,
    plan: Option<Plan>,
    route: Option<Route>,
}

/// TUI Runner that manages the terminal and event loop
pub struct TuiRunner {
    app: App,
    terminal: Tui,
    event_handler: EventHandler,
    session: Arc<Session>,
    maps: Option<Arc<dyn MapClient>>,
    fetcher: SuggestionFetcher,
    persister: PlanPersister,
    result_tx: mpsc::UnboundedSender<TaskResult>,
    result_rx: mpsc::UnboundedReceiver<TaskResult>,
}

impl TuiRunner {
    pub fn new(
        terminal: Tui,
        session: Arc<Session>,
        maps: Option<Arc<dyn MapClient>>,
        persister: PlanPersister,
    ) -> Self {
        debug!(has_maps = maps.is_some(), "TuiRunner::new: called");
        let (result_tx, result_rx) = mpsc::unbounded_channel();
        let mut app = App::new();
        app.state_mut().logged_in = session.is_logged_in();

        Self {
            app,
            terminal,
            event_handler: EventHandler::new(TICK_RATE),
            fetcher: SuggestionFetcher::new(session.api().clone()),
            session,
            maps,
            persister,
            result_tx,
            result_rx,
        }
    }

    /// Run the main loop until the user quits
    pub async fn run(&mut self) -> Result<()> {
        info!("TUI started");
        self.load_attributes();
        if self.session.is_logged_in() {
            self.load_current_user();
        }

        loop {
            self.sync_suggestions();

            let app = &self.app;
            self.terminal.draw(|frame| views::render(app.state(), frame))?;

            tokio::select! {
                event = self.event_handler.next() => {
                    match event? {
                        Event::Key(key) => {
                            if self.app.handle_key(key) {
                                debug!("TuiRunner::run: quit requested");
                                break;
                            }
                        }
                        Event::Resize(..) | Event::Tick => {}
                    }
                }
                Some(result) = self.result_rx.recv() => {
                    apply_result(self.app.state_mut(), result);
                }
                _ = self.fetcher.changed() => {
                    debug!("TuiRunner::run: suggestions changed");
                }
            }

            if let Some(action) = self.app.state_mut().pending_action.take() {
                self.execute_action(action);
            }

            if self.app.state().should_quit {
                break;
            }
        }

        info!("TUI exiting");
        Ok(())
    }

    /// Push the wizard's current request key to the fetcher and mirror its state
    fn sync_suggestions(&mut self) {
        let key = self.app.state().wizard.suggest_key();
        self.fetcher.update(key);
        self.fetcher.poll();

        let state = self.app.state_mut();
        if state.suggestions != *self.fetcher.state() {
            state.suggestions = self.fetcher.state().clone();
            let count = state.suggested_venues().len();
            state.results_selection.clamp(count);
        }
    }

    fn load_attributes(&mut self) {
        debug!("TuiRunner::load_attributes: called");
        self.app.state_mut().loading.attributes = true;
        let api = self.session.api().clone();
        let tx = self.result_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(TaskResult::Attributes(api.attributes().await));
        });
    }

    fn load_current_user(&mut self) {
        debug!("TuiRunner::load_current_user: called");
        let session = self.session.clone();
        let tx = self.result_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(TaskResult::CurrentUser(session.current_user().await));
        });
    }

    fn execute_action(&mut self, action: PendingAction) {
        debug!(?action, "TuiRunner::execute_action: called");
        let tx = self.result_tx.clone();

        match action {
            PendingAction::Geocode { field, query } => {
                let Some(maps) = self.maps.clone() else {
                    self.app
                        .state_mut()
                        .set_error("Location search is not configured (missing mapping access token)");
                    return;
                };
                self.app.state_mut().loading.geocode = true;
                tokio::spawn(async move {
                    let result = maps.geocode(&query).await;
                    let _ = tx.send(TaskResult::Geocode { field, query, result });
                });
            }
            PendingAction::Login { credentials, then_save } => {
                self.app.state_mut().loading.login = true;
                let session = self.session.clone();
                tokio::spawn(async move {
                    let result = session.login(&credentials).await;
                    let _ = tx.send(TaskResult::Login { result, then_save });
                });
            }
            PendingAction::Logout => {
                let state = self.app.state_mut();
                match self.session.logout() {
                    Ok(()) => {
                        state.logged_in = false;
                        state.user_name = None;
                        state.set_status("Logged out");
                    }
                    Err(e) => state.set_error(e.to_string()),
                }
            }
            PendingAction::Save(details) => {
                self.app.state_mut().loading.save = true;
                let session = self.session.clone();
                let maps = self.maps.clone();
                let persister = self.persister.clone();
                let wizard = self.app.state().wizard.clone();
                let venues = self.app.state().suggested_venues().to_vec();
                tokio::spawn(async move {
                    let result = match persister.save(&session, &wizard, &venues, details).await {
                        Ok(id) => Ok(fetch_saved(&session, maps.as_deref(), id).await),
                        Err(e) => Err(e),
                    };
                    let _ = tx.send(TaskResult::Saved(result));
                });
            }
        }
    }
}

/// Load the created plan back, plus its walking route when mapping is available
async fn fetch_saved(session: &Session, maps: Option<&dyn MapClient>, id: PlanId) -> SavedPlan {
    let plan = match session.api().plan(id).await {
        Ok(plan) => Some(plan),
        Err(e) => {
            warn!(plan_id = %id, error = %e, "Failed to load saved plan");
            None
        }
    };

    let route = match (&plan, maps) {
        (Some(plan), Some(maps)) => maps
            .walking_route(&plan.waypoints())
            .await
            .inspect_err(|e| warn!(plan_id = %id, error = %e, "Failed to load walking route"))
            .ok(),
        _ => None,
    };

    SavedPlan { id, plan, route }
}

/// Apply a finished background task to the app state
pub(crate) fn apply_result(state: &mut AppState, result: TaskResult) {
    debug!("apply_result: called");
    match result {
        TaskResult::Attributes(result) => {
            state.loading.attributes = false;
            match result {
                Ok(attributes) => {
                    debug!(count = %attributes.len(), "apply_result: attributes loaded");
                    let count = attributes.len();
                    state.wizard.set_available_attributes(attributes);
                    state.attribute_selection.clamp(count);
                }
                Err(e) => state.set_error(format!("Failed to load attributes: {}", e)),
            }
        }
        TaskResult::CurrentUser(result) => match result {
            Ok(user) => state.user_name = Some(user.name),
            Err(e) => warn!(error = %e, "Failed to load current user"),
        },
        TaskResult::Geocode { field, query, result } => {
            state.loading.geocode = false;
            match result {
                Ok(places) if places.is_empty() => state.set_error(format!("No places found for '{}'", query)),
                Ok(places) => {
                    debug!(count = %places.len(), "apply_result: geocode candidates");
                    state.candidates = places;
                    state.candidate_selection.selected_index = 0;
                    state.location_field = field;
                    state.interaction_mode = InteractionMode::ChooseLocation(field);
                }
                Err(e) => state.set_error(format!("Location search failed: {}", e)),
            }
        }
        TaskResult::Login { result, then_save } => {
            state.loading.login = false;
            match result {
                Ok(user) => {
                    info!(user_id = %user.id, "Logged in");
                    state.logged_in = true;
                    state.set_status(format!("Logged in as {}", user.name));
                    state.user_name = Some(user.name);
                    state.interaction_mode = if then_save {
                        InteractionMode::Save(SaveForm::default())
                    } else {
                        InteractionMode::Normal
                    };
                }
                Err(e) => {
                    let message = match e.field_message() {
                        Some((_, message)) => message.to_string(),
                        None => e.to_string(),
                    };
                    match &mut state.interaction_mode {
                        InteractionMode::Login(form) => form.error = Some(message),
                        _ => state.set_error(message),
                    }
                }
            }
        }
        TaskResult::Saved(result) => {
            state.loading.save = false;
            match result {
                Ok(saved) => {
                    state.set_status(format!("Saved plan #{}", saved.id));
                    state.saved_plan = saved.plan;
                    state.saved_route = saved.route;
                    state.interaction_mode = InteractionMode::SavedPlan;
                }
                Err(SaveError::LoginRequired) => {
                    state.logged_in = false;
                    state.interaction_mode = InteractionMode::Login(LoginForm::new(true));
                }
                // Backend failures only end the loading state; the form stays open for a retry
                Err(SaveError::Api(e)) => {
                    warn!(error = %e, "Failed to save plan");
                }
                Err(e) => match &mut state.interaction_mode {
                    InteractionMode::Save(form) => form.error = Some(e.to_string()),
                    _ => state.set_error(e.to_string()),
                },
            }
        }
    }
}
