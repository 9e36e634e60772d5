//! Mapping provider: place search and walking directions
//!
//! Location selection needs autocomplete candidates for free text, and a saved plan
//! can be shown as a walking route through its venues. Both go through [`MapClient`].

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

mod mapbox;

pub use mapbox::MapboxClient;

use crate::config::MappingConfig;
use crate::domain::Coordinates;

/// Errors from the mapping provider
#[derive(Debug, Error)]
pub enum MapError {
    #[error("Mapping provider not configured: {0}")]
    NotConfigured(String),

    #[error("Mapping provider error {status}: {message}")]
    Status { status: u16, message: String },

    #[error("No route found: {0}")]
    NoRoute(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// A geocoding candidate
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    /// Full display name, e.g. "Bristol Bridge, Bristol, England"
    pub name: String,
    pub coordinates: Coordinates,
}

/// A walking route
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub distance_m: f64,
    pub duration_s: f64,
    /// Route geometry as a line of points
    pub coordinates: Vec<Coordinates>,
}

impl Route {
    /// Walking time rounded to whole minutes
    pub fn minutes(&self) -> u64 {
        (self.duration_s / 60.0).round() as u64
    }

    pub fn kilometres(&self) -> f64 {
        self.distance_m / 1000.0
    }
}

#[async_trait]
pub trait MapClient: Send + Sync {
    /// Autocomplete candidates for free text, best match first
    async fn geocode(&self, query: &str) -> Result<Vec<Place>, MapError>;

    /// Walking route through `waypoints` in order (at least two)
    async fn walking_route(&self, waypoints: &[Coordinates]) -> Result<Route, MapError>;
}

/// Create the mapping client described by the config
///
/// Fails when the access token environment variable is unset.
pub fn create_map_client(config: &MappingConfig) -> Result<Arc<dyn MapClient>, MapError> {
    debug!(base_url = %config.base_url, "create_map_client: called");
    Ok(Arc::new(MapboxClient::from_config(config)?))
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;

    /// Canned geocoder keyed by lowercase query
    #[derive(Default)]
    pub struct MockMapClient {
        pub places: HashMap<String, Vec<Place>>,
    }

    impl MockMapClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_place(mut self, query: &str, name: &str, coordinates: Coordinates) -> Self {
            self.places.entry(query.to_lowercase()).or_default().push(Place {
                name: name.to_string(),
                coordinates,
            });
            self
        }
    }

    #[async_trait]
    impl MapClient for MockMapClient {
        async fn geocode(&self, query: &str) -> Result<Vec<Place>, MapError> {
            Ok(self.places.get(&query.to_lowercase()).cloned().unwrap_or_default())
        }

        async fn walking_route(&self, waypoints: &[Coordinates]) -> Result<Route, MapError> {
            if waypoints.len() < 2 {
                return Err(MapError::NoRoute("need at least two waypoints".to_string()));
            }
            Ok(Route {
                distance_m: 1000.0 * (waypoints.len() - 1) as f64,
                duration_s: 720.0 * (waypoints.len() - 1) as f64,
                coordinates: waypoints.to_vec(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_units() {
        let route = Route {
            distance_m: 2450.0,
            duration_s: 1789.0,
            coordinates: vec![],
        };
        assert_eq!(route.minutes(), 30);
        assert!((route.kilometres() - 2.45).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_mock_geocode_case_insensitive() {
        let client = mock::MockMapClient::new().with_place("Clifton", "Clifton, Bristol", Coordinates::new(-2.62, 51.46));
        let places = client.geocode("CLIFTON").await.unwrap();
        assert_eq!(places.len(), 1);
        assert!(client.geocode("Bath").await.unwrap().is_empty());
    }
}
