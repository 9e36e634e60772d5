//! Authenticated-identity state
//!
//! A [`Session`] is created once at startup and handed to everything that needs to know
//! who the user is. The only transitions are [`Session::login`], [`Session::register`]
//! and [`Session::logout`]; nothing else writes the token.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use localstore::Storage;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{ApiError, AuthResponse, Credentials, PathfinderApi, Registration};
use crate::domain::{User, UserId};

/// Storage key holding the bearer token
pub const TOKEN_KEY: &str = "token";

/// Storage key holding the logged-in user's id
pub const USER_ID_KEY: &str = "user_id";

/// Why a login or registration did not produce a session
#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong credentials; `field` names the form field the message belongs to
    #[error("{message}")]
    InvalidCredentials { field: String, message: String },

    #[error("{message}")]
    Validation {
        message: String,
        errors: BTreeMap<String, Vec<String>>,
    },

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Failed to persist session: {0}")]
    Storage(String),

    #[error(transparent)]
    Transport(ApiError),
}

impl AuthError {
    fn from_api(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized(message) => AuthError::InvalidCredentials {
                field: "email".to_string(),
                message,
            },
            ApiError::Validation { message, errors } => AuthError::Validation { message, errors },
            other => AuthError::Transport(other),
        }
    }

    /// The form field and message to show next to it, if the error is field-level
    pub fn field_message(&self) -> Option<(&str, &str)> {
        match self {
            AuthError::InvalidCredentials { field, message } => Some((field.as_str(), message.as_str())),
            AuthError::Validation { errors, .. } => errors
                .iter()
                .find_map(|(field, messages)| messages.first().map(|m| (field.as_str(), m.as_str()))),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct SessionState {
    logged_in: bool,
    user_id: Option<UserId>,
    user: Option<User>,
}

/// The current client's session
pub struct Session {
    api: Arc<dyn PathfinderApi>,
    storage: Arc<dyn Storage>,
    state: RwLock<SessionState>,
}

impl Session {
    /// Derive the session from storage: a stored token means logged in
    ///
    /// The token is not validated against the backend here.
    pub fn restore(api: Arc<dyn PathfinderApi>, storage: Arc<dyn Storage>) -> Self {
        let logged_in = storage.get_item(TOKEN_KEY).is_some_and(|t| !t.is_empty());
        let user_id = if logged_in {
            storage.get_item(USER_ID_KEY).and_then(|id| id.parse().ok())
        } else {
            None
        };
        debug!(%logged_in, ?user_id, "Session::restore: called");

        Self {
            api,
            storage,
            state: RwLock::new(SessionState {
                logged_in,
                user_id,
                user: None,
            }),
        }
    }

    pub fn api(&self) -> &Arc<dyn PathfinderApi> {
        &self.api
    }

    pub fn is_logged_in(&self) -> bool {
        self.read().logged_in
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.read().user_id
    }

    /// The user returned by the last login, registration or `current_user` call
    pub fn user(&self) -> Option<User> {
        self.read().user.clone()
    }

    /// Log in; on failure the session is left unchanged
    pub async fn login(&self, credentials: &Credentials) -> Result<User, AuthError> {
        debug!(email = %credentials.email, "Session::login: called");
        let response = self.api.login(credentials).await.map_err(|e| {
            warn!(error = %e, "Session::login: rejected");
            AuthError::from_api(e)
        })?;
        self.establish(response)
    }

    /// Register and log in as the new user
    pub async fn register(&self, registration: &Registration) -> Result<User, AuthError> {
        debug!(email = %registration.email, "Session::register: called");
        let response = self.api.register(registration).await.map_err(|e| {
            warn!(error = %e, "Session::register: rejected");
            AuthError::from_api(e)
        })?;
        self.establish(response)
    }

    /// Clear the stored token and user id
    ///
    /// The in-memory flag is cleared even if storage fails.
    pub fn logout(&self) -> Result<(), AuthError> {
        debug!("Session::logout: called");
        *self.write() = SessionState::default();

        let token = self.storage.remove_item(TOKEN_KEY);
        let user_id = self.storage.remove_item(USER_ID_KEY);
        token
            .and(user_id)
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        info!("Logged out");
        Ok(())
    }

    /// Fetch the logged-in user from the backend
    pub async fn current_user(&self) -> Result<User, AuthError> {
        debug!("Session::current_user: called");
        if !self.is_logged_in() {
            return Err(AuthError::NotLoggedIn);
        }
        let user = self.api.current_user().await.map_err(AuthError::from_api)?;
        let mut state = self.write();
        state.user_id = Some(user.id);
        state.user = Some(user.clone());
        Ok(user)
    }

    fn establish(&self, response: AuthResponse) -> Result<User, AuthError> {
        let AuthResponse { token, user } = response;

        self.storage
            .set_item(TOKEN_KEY, &token)
            .map_err(|e| AuthError::Storage(e.to_string()))?;
        if let Err(e) = self.storage.set_item(USER_ID_KEY, &user.id.to_string()) {
            if let Err(cleanup) = self.storage.remove_item(TOKEN_KEY) {
                warn!(error = %cleanup, "Session::establish: failed to roll back token");
            }
            return Err(AuthError::Storage(e.to_string()));
        }

        *self.write() = SessionState {
            logged_in: true,
            user_id: Some(user.id),
            user: Some(user.clone()),
        };
        info!(user_id = %user.id, "Logged in as {}", user.email);
        Ok(user)
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(|p| p.into_inner())
    }
}
