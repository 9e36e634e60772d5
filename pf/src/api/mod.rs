//! Backend REST API client
//!
//! [`PathfinderApi`] is the seam between the application and the backend. The HTTP
//! implementation handles bearer authentication, the CSRF cookie bootstrap, response
//! envelopes and error mapping; everything it returns is already a domain type.

use std::sync::Arc;

use localstore::Storage;
use tracing::debug;

pub mod client;
mod error;
mod http;
mod types;

pub use client::PathfinderApi;
pub use error::ApiError;
pub use http::HttpApiClient;
pub use types::{AuthResponse, Credentials, NewPlan, Registration, SuggestQuery};

use crate::config::Config;

/// Create the backend client described by the config
///
/// The client reads the session token from `storage` on every request.
pub fn create_client(config: &Config, storage: Arc<dyn Storage>) -> Result<Arc<dyn PathfinderApi>, ApiError> {
    debug!(base_url = %config.api.base_url, "create_client: called");
    Ok(Arc::new(HttpApiClient::from_config(&config.api, storage)?))
}
