//! Mapbox geocoding (v5) and directions (v5, walking profile)

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{MapClient, MapError, Place, Route};
use crate::config::MappingConfig;
use crate::domain::Coordinates;

pub struct MapboxClient {
    base_url: Url,
    access_token: String,
    http: Client,
    proximity: Option<[f64; 2]>,
    limit: u8,
    countries: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    place_name: String,
    center: [f64; 2],
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<WireRoute>,
}

#[derive(Debug, Deserialize)]
struct WireRoute {
    distance: f64,
    duration: f64,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    coordinates: Vec<[f64; 2]>,
}

impl MapboxClient {
    pub fn from_config(config: &MappingConfig) -> Result<Self, MapError> {
        debug!(base_url = %config.base_url, "MapboxClient::from_config: called");
        let access_token = config
            .access_token()
            .map_err(|e| MapError::NotConfigured(e.to_string()))?;
        let base_url = Url::parse(&config.base_url).map_err(|e| MapError::NotConfigured(e.to_string()))?;
        let http = Client::builder().build().map_err(MapError::Network)?;

        Ok(Self {
            base_url,
            access_token,
            http,
            proximity: config.proximity,
            limit: config.autocomplete_limit,
            countries: config.countries.clone(),
        })
    }

    fn geocode_url(&self, query: &str) -> Result<Url, MapError> {
        let file = format!("{}.json", query.trim());
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| MapError::NotConfigured(format!("base URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(["geocoding", "v5", "mapbox.places", file.as_str()]);

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("access_token", &self.access_token);
            pairs.append_pair("autocomplete", "true");
            pairs.append_pair("limit", &self.limit.to_string());
            if let Some([lng, lat]) = self.proximity {
                pairs.append_pair("proximity", &format!("{},{}", lng, lat));
            }
            if !self.countries.is_empty() {
                pairs.append_pair("country", &self.countries.join(","));
            }
        }
        Ok(url)
    }

    fn directions_url(&self, waypoints: &[Coordinates]) -> Result<Url, MapError> {
        let path = waypoints
            .iter()
            .map(|c| format!("{},{}", c.longitude, c.latitude))
            .collect::<Vec<_>>()
            .join(";");

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| MapError::NotConfigured(format!("base URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(["directions", "v5", "mapbox", "walking", path.as_str()]);
        url.query_pairs_mut()
            .append_pair("geometries", "geojson")
            .append_pair("access_token", &self.access_token);
        Ok(url)
    }

    async fn fetch(&self, url: Url) -> Result<String, MapError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            warn!(status = %status.as_u16(), "MapboxClient::fetch: request failed");
            return Err(MapError::Status {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(body)
    }
}

fn parse_places(body: &str) -> Result<Vec<Place>, MapError> {
    let response: GeocodeResponse =
        serde_json::from_str(body).map_err(|e| MapError::InvalidResponse(e.to_string()))?;
    Ok(response
        .features
        .into_iter()
        .map(|f| Place {
            name: f.place_name,
            coordinates: Coordinates::new(f.center[0], f.center[1]),
        })
        .collect())
}

fn parse_route(body: &str) -> Result<Route, MapError> {
    let response: DirectionsResponse =
        serde_json::from_str(body).map_err(|e| MapError::InvalidResponse(e.to_string()))?;
    if response.code != "Ok" {
        return Err(MapError::NoRoute(response.message.unwrap_or(response.code)));
    }
    let route = response
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| MapError::NoRoute("no routes returned".to_string()))?;
    Ok(Route {
        distance_m: route.distance,
        duration_s: route.duration,
        coordinates: route
            .geometry
            .coordinates
            .into_iter()
            .map(|[lng, lat]| Coordinates::new(lng, lat))
            .collect(),
    })
}

#[async_trait]
impl MapClient for MapboxClient {
    async fn geocode(&self, query: &str) -> Result<Vec<Place>, MapError> {
        debug!(%query, "MapboxClient::geocode: called");
        if query.trim().is_empty() {
            debug!("MapboxClient::geocode: empty query");
            return Ok(Vec::new());
        }
        parse_places(&self.fetch(self.geocode_url(query)?).await?)
    }

    async fn walking_route(&self, waypoints: &[Coordinates]) -> Result<Route, MapError> {
        debug!(count = %waypoints.len(), "MapboxClient::walking_route: called");
        if waypoints.len() < 2 {
            return Err(MapError::NoRoute("need at least two waypoints".to_string()));
        }
        parse_route(&self.fetch(self.directions_url(waypoints)?).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> MapboxClient {
        MapboxClient {
            base_url: Url::parse("https://api.mapbox.com").unwrap(),
            access_token: "pk.test".to_string(),
            http: Client::new(),
            proximity: Some([-2.5879, 51.4545]),
            limit: 5,
            countries: vec!["gb".to_string()],
        }
    }

    #[test]
    fn test_geocode_url() {
        let url = client().geocode_url("Bristol Bridge").unwrap();
        assert_eq!(url.path(), "/geocoding/v5/mapbox.places/Bristol%20Bridge.json");
        let query = url.query().unwrap();
        assert!(query.contains("access_token=pk.test"));
        assert!(query.contains("limit=5"));
        assert!(query.contains("country=gb"));
    }

    #[test]
    fn test_directions_url() {
        let waypoints = [Coordinates::new(-2.59, 51.45), Coordinates::new(-2.62, 51.46)];
        let url = client().directions_url(&waypoints).unwrap();
        assert!(url.path().starts_with("/directions/v5/mapbox/walking/-2.59,51.45"));
        assert!(url.query().unwrap().contains("geometries=geojson"));
    }

    #[test]
    fn test_parse_places() {
        let body = r#"{"type":"FeatureCollection","features":[
            {"place_name":"Clifton, Bristol, England","center":[-2.6203,51.4645],"text":"Clifton"}
        ]}"#;
        let places = parse_places(body).unwrap();
        assert_eq!(places[0].name, "Clifton, Bristol, England");
        assert_eq!(places[0].coordinates, Coordinates::new(-2.6203, 51.4645));
    }

    #[test]
    fn test_parse_route() {
        let body = r#"{"code":"Ok","routes":[{"distance":1520.4,"duration":1100.2,
            "geometry":{"type":"LineString","coordinates":[[-2.59,51.45],[-2.60,51.455]]}}]}"#;
        let route = parse_route(body).unwrap();
        assert_eq!(route.coordinates.len(), 2);
        assert_eq!(route.minutes(), 18);
    }

    #[test]
    fn test_parse_route_no_route() {
        let body = r#"{"code":"NoRoute","message":"No route found","routes":[]}"#;
        assert!(matches!(parse_route(body), Err(MapError::NoRoute(m)) if m == "No route found"));
    }
}
