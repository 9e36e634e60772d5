//! Integration tests for Pathfinder
//!
//! These drive the session, wizard, suggestion fetcher and persister together against
//! an in-memory backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use localstore::{LocalStore, MemoryStore, Storage};
use pathfinder::api::{ApiError, AuthResponse, Credentials, NewPlan, PathfinderApi, Registration, SuggestQuery};
use pathfinder::domain::{
    Attribute, Coordinates, NamedPoint, Plan, PlanId, PlanSummary, Rating, User, UserId, Venue, VenueId,
};
use pathfinder::session::{AuthError, Session, TOKEN_KEY, USER_ID_KEY};
use pathfinder::wizard::{
    LocationSelection, PlanDetails, PlanPersister, SaveError, Stage, SuggestionFetcher, SuggestionState, Wizard,
};
use tempfile::TempDir;

// =============================================================================
// In-memory backend
// =============================================================================

#[derive(Default)]
struct Backend {
    /// Canned suggestions keyed by `stop|stop` with tags joined by `+`
    suggestions: HashMap<String, Vec<Venue>>,
    suggest_calls: Mutex<Vec<SuggestQuery>>,
    created: Mutex<Vec<NewPlan>>,
}

impl Backend {
    fn with_suggestions(mut self, key: &str, venues: Vec<Venue>) -> Self {
        self.suggestions.insert(key.to_string(), venues);
        self
    }

    fn key(query: &SuggestQuery) -> String {
        query
            .attributes
            .iter()
            .map(|s| s.join("+"))
            .collect::<Vec<_>>()
            .join("|")
    }

    fn user() -> User {
        User {
            id: UserId(42),
            name: "Alex".to_string(),
            email: "alex@example.com".to_string(),
        }
    }

    fn created(&self) -> Vec<NewPlan> {
        self.created.lock().unwrap().clone()
    }
}

fn venue(id: u64, name: &str) -> Venue {
    Venue::new(id, name, Coordinates::new(-2.6, 51.45 + id as f64 / 1000.0))
}

#[async_trait]
impl PathfinderApi for Backend {
    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        if credentials.email == "alex@example.com" && credentials.password == "hunter2" {
            Ok(AuthResponse {
                token: "token-42".to_string(),
                user: Self::user(),
            })
        } else {
            Err(ApiError::Unauthorized("These credentials do not match our records.".to_string()))
        }
    }

    async fn register(&self, registration: &Registration) -> Result<AuthResponse, ApiError> {
        Ok(AuthResponse {
            token: "token-new".to_string(),
            user: User {
                id: UserId(43),
                name: registration.name.clone(),
                email: registration.email.clone(),
            },
        })
    }

    async fn current_user(&self) -> Result<User, ApiError> {
        Ok(Self::user())
    }

    async fn venues(&self) -> Result<Vec<Venue>, ApiError> {
        Ok(vec![venue(1, "A"), venue(2, "B"), venue(3, "C")])
    }

    async fn venue(&self, id: VenueId) -> Result<Venue, ApiError> {
        Ok(venue(id.get(), "Venue"))
    }

    async fn search_venues(&self, _name: &str) -> Result<Vec<Venue>, ApiError> {
        Ok(Vec::new())
    }

    async fn attributes(&self) -> Result<Vec<Attribute>, ApiError> {
        Ok(vec![Attribute {
            id: 1,
            name: "Live Music".to_string(),
        }])
    }

    async fn suggest(&self, query: &SuggestQuery) -> Result<Vec<Venue>, ApiError> {
        self.suggest_calls.lock().unwrap().push(query.clone());
        Ok(self.suggestions.get(&Self::key(query)).cloned().unwrap_or_default())
    }

    async fn create_plan(&self, plan: &NewPlan) -> Result<PlanId, ApiError> {
        let mut created = self.created.lock().unwrap();
        created.push(plan.clone());
        Ok(PlanId(500 + created.len() as u64))
    }

    async fn plan(&self, id: PlanId) -> Result<Plan, ApiError> {
        Ok(Plan {
            id,
            name: "Plan".to_string(),
            start_date: None,
            start_time: None,
            start: NamedPoint::new("Start", Coordinates::new(-2.59, 51.45)),
            end: NamedPoint::new("End", Coordinates::new(-2.62, 51.46)),
            venues: Vec::new(),
            is_public: false,
        })
    }

    async fn public_plans(&self) -> Result<Vec<PlanSummary>, ApiError> {
        Ok(Vec::new())
    }

    async fn random_public_plan(&self) -> Result<Plan, ApiError> {
        Err(ApiError::NotFound("no public plans".to_string()))
    }

    async fn rate_venue(&self, _id: VenueId, _rating: Rating) -> Result<(), ApiError> {
        Ok(())
    }

    async fn venue_rating(&self, _id: VenueId) -> Result<Option<Rating>, ApiError> {
        Ok(None)
    }

    async fn favourite_venues(&self) -> Result<Vec<Venue>, ApiError> {
        Ok(Vec::new())
    }
}

fn bristol_wizard() -> Wizard {
    let mut wizard = Wizard::new();
    wizard.set_start(LocationSelection::new("Bristol Bridge", Coordinates::new(-2.5905, 51.4531)));
    wizard.set_end(LocationSelection::new("Clifton", Coordinates::new(-2.6203, 51.4645)));
    wizard
}

// =============================================================================
// Wizard + suggestions + save
// =============================================================================

#[tokio::test]
async fn test_bristol_scenario_saves_in_suggestion_order() {
    let backend = Arc::new(
        Backend::default().with_suggestions("Live Music", vec![venue(11, "A"), venue(7, "B"), venue(9, "C")]),
    );
    let session = Session::restore(backend.clone(), Arc::new(MemoryStore::new()));
    session
        .login(&Credentials::new("alex@example.com", "hunter2"))
        .await
        .unwrap();

    let mut wizard = bristol_wizard();
    assert!(wizard.add_attribute(0, "Live Music"));
    wizard.go_to(Stage::Results).unwrap();

    let mut fetcher = SuggestionFetcher::new(backend.clone());
    fetcher.update(wizard.suggest_key());
    let venues = fetcher.settle().await.venues().unwrap().to_vec();

    let queries = backend.suggest_calls.lock().unwrap().clone();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].attributes, vec![vec!["Live Music".to_string()]]);

    let id = PlanPersister::new("My Pathfinder Plan")
        .save(&session, &wizard, &venues, PlanDetails::default())
        .await
        .unwrap();

    assert_eq!(id, PlanId(501));
    let created = backend.created();
    assert_eq!(created[0].venues, vec![VenueId(11), VenueId(7), VenueId(9)]);
    assert_eq!(created[0].name, "My Pathfinder Plan");
}

#[tokio::test]
async fn test_logged_out_save_waits_for_login() {
    let backend = Arc::new(Backend::default().with_suggestions("Live Music", vec![venue(1, "A")]));
    let session = Session::restore(backend.clone(), Arc::new(MemoryStore::new()));
    let persister = PlanPersister::new("Default");

    let mut wizard = bristol_wizard();
    wizard.add_attribute(0, "Live Music");
    let venues = vec![venue(1, "A")];

    let result = persister
        .save(&session, &wizard, &venues, PlanDetails::default())
        .await;
    assert!(matches!(result, Err(SaveError::LoginRequired)));
    assert!(backend.created().is_empty());

    session
        .login(&Credentials::new("alex@example.com", "hunter2"))
        .await
        .unwrap();
    persister
        .save(&session, &wizard, &venues, PlanDetails::default())
        .await
        .unwrap();
    assert_eq!(backend.created().len(), 1);
}

#[tokio::test]
async fn test_cascade_at_first_stop_with_successor() {
    let backend = Arc::new(Backend::default().with_suggestions("Club", vec![venue(3, "C")]));
    let mut wizard = bristol_wizard();
    wizard.add_attribute(0, "Live Music");
    assert!(wizard.add_stop());
    wizard.add_attribute(1, "Club");
    wizard.go_to(Stage::Results).unwrap();

    assert!(wizard.remove_attribute(0, "Live Music"));

    assert_eq!(wizard.stops().len(), 1);
    assert!(wizard.stops().stop(0).unwrap().contains("Club"));
    assert_eq!(wizard.stage(), Stage::Results);

    let mut fetcher = SuggestionFetcher::new(backend);
    fetcher.update(wizard.suggest_key());
    assert_eq!(fetcher.settle().await.venues().map(|v| v.len()), Some(1));
}

#[tokio::test]
async fn test_emptying_sole_stop_locks_results() {
    let backend = Arc::new(Backend::default());
    let mut wizard = bristol_wizard();
    wizard.add_attribute(0, "Live Music");
    wizard.go_to(Stage::Results).unwrap();

    wizard.remove_attribute(0, "Live Music");

    assert_eq!(wizard.stops().len(), 1);
    assert!(wizard.stops().first_is_empty());
    assert_eq!(wizard.stage(), Stage::Filter);
    assert!(wizard.suggest_key().is_none());

    let mut fetcher = SuggestionFetcher::new(backend.clone());
    fetcher.update(wizard.suggest_key());
    assert_eq!(fetcher.settle().await, &SuggestionState::Disabled);
    assert!(backend.suggest_calls.lock().unwrap().is_empty());
}

// =============================================================================
// Session persistence
// =============================================================================

#[tokio::test]
async fn test_session_survives_restart() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("storage.json");
    let backend = Arc::new(Backend::default());

    {
        let storage = Arc::new(LocalStore::open(&path).unwrap());
        let session = Session::restore(backend.clone(), storage);
        assert!(!session.is_logged_in());
        session
            .login(&Credentials::new("alex@example.com", "hunter2"))
            .await
            .unwrap();
    }

    let storage = Arc::new(LocalStore::open(&path).unwrap());
    assert_eq!(storage.get_item(TOKEN_KEY).as_deref(), Some("token-42"));
    assert_eq!(storage.get_item(USER_ID_KEY).as_deref(), Some("42"));

    let session = Session::restore(backend, storage.clone());
    assert!(session.is_logged_in());
    assert_eq!(session.user_id(), Some(UserId(42)));

    session.logout().unwrap();
    assert!(!session.is_logged_in());
    assert!(storage.get_item(TOKEN_KEY).is_none());
    assert!(LocalStore::open(&path).unwrap().get_item(USER_ID_KEY).is_none());
}

#[tokio::test]
async fn test_wrong_password_leaves_session_untouched() {
    let storage = Arc::new(MemoryStore::new());
    let session = Session::restore(Arc::new(Backend::default()), storage.clone());

    let err = session
        .login(&Credentials::new("alex@example.com", "wrong"))
        .await
        .unwrap_err();

    match err {
        AuthError::InvalidCredentials { field, message } => {
            assert_eq!(field, "email");
            assert!(message.contains("do not match"));
        }
        other => panic!("expected invalid credentials, got {other:?}"),
    }
    assert!(!session.is_logged_in());
    assert!(storage.get_item(TOKEN_KEY).is_none());
}

#[tokio::test]
async fn test_register_logs_in() {
    let storage = Arc::new(MemoryStore::new());
    let session = Session::restore(Arc::new(Backend::default()), storage.clone());

    let user = session
        .register(&Registration::new("Robin", "robin@example.com", "pw12345678"))
        .await
        .unwrap();

    assert_eq!(user.id, UserId(43));
    assert!(session.is_logged_in());
    assert_eq!(storage.get_item(TOKEN_KEY).as_deref(), Some("token-new"));
}
