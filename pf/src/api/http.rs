//! HTTP implementation of the backend API
//!
//! Every request reads the bearer token from storage, so a login or logout in one part
//! of the program is seen by the next request everywhere else. Mutating requests carry
//! the CSRF token obtained from the cookie bootstrap endpoint; the token is fetched
//! lazily on the first POST and cached until the backend answers 419.

use async_trait::async_trait;
use localstore::Storage;
use reqwest::header::{ACCEPT, AUTHORIZATION, COOKIE, HeaderMap, SET_COOKIE};
use reqwest::{Client, Method, Url};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

use super::types::{
    WireAttribute, WireAuth, WireCreated, WirePlan, WireRating, WireUser, WireVenue, parse_envelope, parse_venues,
};
use super::{ApiError, AuthResponse, Credentials, NewPlan, PathfinderApi, Registration, SuggestQuery};
use crate::config::ApiConfig;
use crate::domain::{Attribute, Plan, PlanId, PlanSummary, Rating, User, Venue, VenueId};
use crate::session::TOKEN_KEY;

/// Name of the cookie the backend stores its CSRF token in
const XSRF_COOKIE: &str = "XSRF-TOKEN";

/// Header the backend expects the decoded CSRF token in
const XSRF_HEADER: &str = "X-XSRF-TOKEN";

/// Cached CSRF bootstrap result
#[derive(Debug, Clone, PartialEq)]
struct CsrfState {
    token: String,
    cookie_header: String,
}

/// reqwest-backed backend client
pub struct HttpApiClient {
    base_url: Url,
    csrf_url: Url,
    http: Client,
    storage: Arc<dyn Storage>,
    csrf: Mutex<Option<CsrfState>>,
}

impl HttpApiClient {
    /// Create a new client from configuration
    pub fn from_config(config: &ApiConfig, storage: Arc<dyn Storage>) -> Result<Self, ApiError> {
        debug!(?config, "HttpApiClient::from_config: called");
        let base_url = parse_base_url(&config.base_url)?;
        let csrf_url = Url::parse(&config.csrf_url).map_err(|e| ApiError::Url(format!("{}: {}", config.csrf_url, e)))?;

        let mut builder = Client::builder();
        if let Some(ms) = config.timeout_ms {
            debug!(%ms, "HttpApiClient::from_config: request timeout set");
            builder = builder.timeout(Duration::from_millis(ms));
        }
        let http = builder.build().map_err(ApiError::Network)?;

        Ok(Self {
            base_url,
            csrf_url,
            http,
            storage,
            csrf: Mutex::new(None),
        })
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::Url(format!("{}: {}", path, e)))
    }

    fn cached_csrf(&self) -> Option<CsrfState> {
        self.csrf.lock().map(|guard| guard.clone()).unwrap_or_else(|p| p.into_inner().clone())
    }

    fn store_csrf(&self, state: Option<CsrfState>) {
        match self.csrf.lock() {
            Ok(mut guard) => *guard = state,
            Err(poisoned) => *poisoned.into_inner() = state,
        }
    }

    /// Fetch the CSRF cookie unless one is already cached
    async fn ensure_csrf(&self) -> Result<CsrfState, ApiError> {
        if let Some(state) = self.cached_csrf() {
            debug!("HttpApiClient::ensure_csrf: using cached token");
            return Ok(state);
        }

        debug!(url = %self.csrf_url, "HttpApiClient::ensure_csrf: bootstrapping");
        let response = self
            .http
            .get(self.csrf_url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status.as_u16(), &body));
        }

        let state = csrf_from_headers(response.headers())
            .ok_or_else(|| ApiError::InvalidResponse(format!("{} cookie missing from CSRF response", XSRF_COOKIE)))?;
        self.store_csrf(Some(state.clone()));
        Ok(state)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<String, ApiError> {
        let url = self.url(path)?;
        debug!(%method, %url, "HttpApiClient::send: called");

        let mut request = self
            .http
            .request(method.clone(), url)
            .header(ACCEPT, "application/json");

        if !query.is_empty() {
            request = request.query(query);
        }

        if let Some(token) = self.storage.get_item(TOKEN_KEY) {
            debug!("HttpApiClient::send: attaching bearer token");
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        if method != Method::GET {
            let csrf = self.ensure_csrf().await?;
            request = request.header(XSRF_HEADER, csrf.token).header(COOKIE, csrf.cookie_header);
        }

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            debug!(status = %status.as_u16(), "HttpApiClient::send: success");
            return Ok(text);
        }

        warn!(status = %status.as_u16(), path, "HttpApiClient::send: request failed");
        let err = ApiError::from_status(status.as_u16(), &text);
        if matches!(err, ApiError::CsrfMismatch) {
            debug!("HttpApiClient::send: CSRF rejected, clearing cached token");
            self.store_csrf(None);
        }
        Err(err)
    }

    async fn get(&self, path: &str) -> Result<String, ApiError> {
        self.send(Method::GET, path, &[], None).await
    }

    async fn get_query(&self, path: &str, query: &[(String, String)]) -> Result<String, ApiError> {
        self.send(Method::GET, path, query, None).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<String, ApiError> {
        self.send(Method::POST, path, &[], Some(body)).await
    }
}

/// Parse the base URL, ensuring relative joins append to its path
fn parse_base_url(raw: &str) -> Result<Url, ApiError> {
    let with_slash = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    Url::parse(&with_slash).map_err(|e| ApiError::Url(format!("{}: {}", raw, e)))
}

/// Build the CSRF state from a bootstrap response's `Set-Cookie` headers
fn csrf_from_headers(headers: &HeaderMap) -> Option<CsrfState> {
    let cookies: Vec<&str> = headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    csrf_from_cookies(&cookies)
}

fn csrf_from_cookies(set_cookies: &[&str]) -> Option<CsrfState> {
    let pairs: Vec<(&str, &str)> = set_cookies
        .iter()
        .filter_map(|c| c.split(';').next())
        .filter_map(|pair| pair.trim().split_once('='))
        .collect();

    let raw = pairs.iter().find(|(name, _)| *name == XSRF_COOKIE).map(|(_, v)| *v)?;
    let token = percent_decode(raw)?;

    let cookie_header = pairs
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("; ");

    Some(CsrfState { token, cookie_header })
}

/// Decode a percent-encoded cookie value
fn percent_decode(raw: &str) -> Option<String> {
    let url = Url::parse(&format!("http://localhost/?v={}", raw.replace('+', "%2B"))).ok()?;
    url.query_pairs().find(|(k, _)| k == "v").map(|(_, v)| v.into_owned())
}

#[async_trait]
impl PathfinderApi for HttpApiClient {
    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        debug!(email = %credentials.email, "HttpApiClient::login: called");
        let body = self.post("login", &serde_json::to_value(credentials)?).await?;
        parse_envelope::<WireAuth>(&body)?.into_domain()
    }

    async fn register(&self, registration: &Registration) -> Result<AuthResponse, ApiError> {
        debug!(email = %registration.email, "HttpApiClient::register: called");
        let body = self.post("register", &serde_json::to_value(registration)?).await?;
        parse_envelope::<WireAuth>(&body)?.into_domain()
    }

    async fn current_user(&self) -> Result<User, ApiError> {
        debug!("HttpApiClient::current_user: called");
        let body = self.get("user").await?;
        parse_envelope::<WireUser>(&body)?.into_domain()
    }

    async fn venues(&self) -> Result<Vec<Venue>, ApiError> {
        debug!("HttpApiClient::venues: called");
        parse_venues(&self.get("venues").await?)
    }

    async fn venue(&self, id: VenueId) -> Result<Venue, ApiError> {
        debug!(%id, "HttpApiClient::venue: called");
        let body = self.get(&format!("venues/{}", id)).await?;
        parse_envelope::<WireVenue>(&body)?.into_domain()
    }

    async fn search_venues(&self, name: &str) -> Result<Vec<Venue>, ApiError> {
        debug!(%name, "HttpApiClient::search_venues: called");
        let query = [("name".to_string(), name.to_string())];
        parse_venues(&self.get_query("venue_name_search", &query).await?)
    }

    async fn attributes(&self) -> Result<Vec<Attribute>, ApiError> {
        debug!("HttpApiClient::attributes: called");
        let body = self.get("attributes").await?;
        parse_envelope::<Vec<WireAttribute>>(&body)?
            .into_iter()
            .map(WireAttribute::into_domain)
            .collect()
    }

    async fn suggest(&self, query: &SuggestQuery) -> Result<Vec<Venue>, ApiError> {
        debug!(stops = %query.attributes.len(), "HttpApiClient::suggest: called");
        parse_venues(&self.get_query("venues/suggest/shortest", &query.to_query_pairs()).await?)
    }

    async fn create_plan(&self, plan: &NewPlan) -> Result<PlanId, ApiError> {
        debug!(name = %plan.name, venues = %plan.venues.len(), "HttpApiClient::create_plan: called");
        let body = self.post("paths", &plan.to_body()).await?;
        parse_envelope::<WireCreated>(&body)?.plan_id()
    }

    async fn plan(&self, id: PlanId) -> Result<Plan, ApiError> {
        debug!(%id, "HttpApiClient::plan: called");
        let body = self.get(&format!("paths/{}", id)).await?;
        parse_envelope::<WirePlan>(&body)?.into_domain()
    }

    async fn public_plans(&self) -> Result<Vec<PlanSummary>, ApiError> {
        debug!("HttpApiClient::public_plans: called");
        let body = self.get("paths/public/all").await?;
        parse_envelope::<Vec<WirePlan>>(&body)?
            .into_iter()
            .map(WirePlan::into_summary)
            .collect()
    }

    async fn random_public_plan(&self) -> Result<Plan, ApiError> {
        debug!("HttpApiClient::random_public_plan: called");
        let body = self.get("paths/public/random").await?;
        parse_envelope::<WirePlan>(&body)?.into_domain()
    }

    async fn rate_venue(&self, id: VenueId, rating: Rating) -> Result<(), ApiError> {
        debug!(%id, %rating, "HttpApiClient::rate_venue: called");
        let body = serde_json::json!({ "rating": rating.value() });
        self.post(&format!("venues/{}/rate", id), &body).await?;
        Ok(())
    }

    async fn venue_rating(&self, id: VenueId) -> Result<Option<Rating>, ApiError> {
        debug!(%id, "HttpApiClient::venue_rating: called");
        let body = self.get(&format!("venues/{}/rating", id)).await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        parse_envelope::<WireRating>(&body)?.into_domain()
    }

    async fn favourite_venues(&self) -> Result<Vec<Venue>, ApiError> {
        debug!("HttpApiClient::favourite_venues: called");
        parse_venues(&self.get("venues/user/favourites").await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use localstore::MemoryStore;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn client(base_url: &str) -> HttpApiClient {
        let config = ApiConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        };
        HttpApiClient::from_config(&config, Arc::new(MemoryStore::new())).unwrap()
    }

    #[test]
    fn test_url_join_keeps_base_path() {
        let api = client("http://localhost:8000/api");
        assert_eq!(api.url("venues/3").unwrap().as_str(), "http://localhost:8000/api/venues/3");
        assert_eq!(
            api.url("/paths/public/all").unwrap().as_str(),
            "http://localhost:8000/api/paths/public/all"
        );
    }

    #[test]
    fn test_from_config_rejects_bad_url() {
        let config = ApiConfig {
            base_url: "::nope".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            HttpApiClient::from_config(&config, Arc::new(MemoryStore::new())),
            Err(ApiError::Url(_))
        ));
    }

    #[test]
    fn test_csrf_from_cookies_decodes_token() {
        let cookies = [
            "XSRF-TOKEN=eyJpdiI6Ik1%3D%3D; expires=Sun, 19-Oct-2026 12:00:00 GMT; Max-Age=7200; path=/; samesite=lax",
            "laravel_session=abc123; path=/; httponly",
        ];
        let state = csrf_from_cookies(&cookies).unwrap();

        assert_eq!(state.token, "eyJpdiI6Ik1==");
        assert_eq!(state.cookie_header, "XSRF-TOKEN=eyJpdiI6Ik1%3D%3D; laravel_session=abc123");
    }

    #[test]
    fn test_csrf_from_cookies_missing_token() {
        assert!(csrf_from_cookies(&["laravel_session=abc123; path=/"]).is_none());
        assert!(csrf_from_cookies(&[]).is_none());
    }

    #[test]
    fn test_percent_decode_keeps_plus() {
        assert_eq!(percent_decode("a+b%2Fc").as_deref(), Some("a+b/c"));
    }

    #[test]
    fn test_csrf_cache_cleared() {
        let api = client("http://localhost:8000/api/");
        assert!(api.cached_csrf().is_none());

        let state = CsrfState {
            token: "t".to_string(),
            cookie_header: "XSRF-TOKEN=t".to_string(),
        };
        api.store_csrf(Some(state.clone()));
        assert_eq!(api.cached_csrf(), Some(state));

        api.store_csrf(None);
        assert!(api.cached_csrf().is_none());
    }

    /// One request as seen by [`Backend`]
    #[derive(Debug, Clone)]
    struct Seen {
        method: String,
        path: String,
        headers: HashMap<String, String>,
    }

    impl Seen {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers.get(name).map(String::as_str)
        }
    }

    /// Minimal HTTP/1.1 backend serving the CSRF bootstrap, venue listing and rating routes
    struct Backend {
        addr: std::net::SocketAddr,
        seen: Arc<Mutex<Vec<Seen>>>,
        reject_next_post: Arc<AtomicBool>,
    }

    impl Backend {
        async fn start() -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let seen = Arc::new(Mutex::new(Vec::new()));
            let reject_next_post = Arc::new(AtomicBool::new(false));

            let (log, reject) = (seen.clone(), reject_next_post.clone());
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let (log, reject) = (log.clone(), reject.clone());
                    tokio::spawn(async move { serve(stream, log, reject).await });
                }
            });

            Self {
                addr,
                seen,
                reject_next_post,
            }
        }

        fn client(&self, storage: MemoryStore) -> HttpApiClient {
            let config = ApiConfig {
                base_url: format!("http://{}/api", self.addr),
                csrf_url: format!("http://{}/sanctum/csrf-cookie", self.addr),
                timeout_ms: Some(5000),
            };
            HttpApiClient::from_config(&config, Arc::new(storage)).unwrap()
        }

        fn seen(&self) -> Vec<Seen> {
            self.seen.lock().unwrap().clone()
        }

        fn requests(&self) -> Vec<String> {
            self.seen().iter().map(|s| format!("{} {}", s.method, s.path)).collect()
        }
    }

    async fn serve(mut stream: TcpStream, log: Arc<Mutex<Vec<Seen>>>, reject: Arc<AtomicBool>) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        let head_end = loop {
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos;
            }
            match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
            }
        };

        let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
        let mut lines = head.split("\r\n");
        let mut request_line = lines.next().unwrap_or_default().split_whitespace();
        let method = request_line.next().unwrap_or_default().to_string();
        let path = request_line.next().unwrap_or_default().to_string();
        let headers: HashMap<String, String> = lines
            .filter_map(|line| line.split_once(':'))
            .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
            .collect();

        let length: usize = headers.get("content-length").and_then(|v| v.parse().ok()).unwrap_or(0);
        while buf.len() < head_end + 4 + length {
            match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
            }
        }

        log.lock().unwrap().push(Seen {
            method: method.clone(),
            path: path.clone(),
            headers,
        });

        let (status, extra, body) = match (method.as_str(), path.as_str()) {
            ("GET", "/sanctum/csrf-cookie") => (
                "200 OK",
                "Set-Cookie: XSRF-TOKEN=abc%3D; path=/\r\nSet-Cookie: laravel_session=s1; path=/\r\n",
                "",
            ),
            ("POST", "/api/venues/1/rate") if reject.swap(false, Ordering::SeqCst) => {
                ("419 Page Expired", "", r#"{"message":"CSRF token mismatch."}"#)
            }
            ("POST", "/api/venues/1/rate") => ("200 OK", "", "{}"),
            ("GET", "/api/venues") => ("200 OK", "", "[]"),
            _ => ("404 Not Found", "", r#"{"message":"Not Found"}"#),
        };
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\n{extra}Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let _ = stream.write_all(response.as_bytes()).await;
        let _ = stream.shutdown().await;
    }

    fn logged_in() -> MemoryStore {
        MemoryStore::with_items([(TOKEN_KEY, "tok123")])
    }

    #[tokio::test]
    async fn test_get_sends_bearer_without_csrf() {
        let backend = Backend::start().await;
        let api = backend.client(logged_in());

        assert!(api.venues().await.unwrap().is_empty());

        let seen = backend.seen();
        assert_eq!(backend.requests(), vec!["GET /api/venues"]);
        assert_eq!(seen[0].header("authorization"), Some("Bearer tok123"));
        assert_eq!(seen[0].header("x-xsrf-token"), None);
        assert!(api.cached_csrf().is_none());
    }

    #[tokio::test]
    async fn test_get_without_token_sends_no_bearer() {
        let backend = Backend::start().await;
        let api = backend.client(MemoryStore::new());

        api.venues().await.unwrap();

        assert_eq!(backend.seen()[0].header("authorization"), None);
    }

    #[tokio::test]
    async fn test_post_bootstraps_csrf_once() {
        let backend = Backend::start().await;
        let api = backend.client(logged_in());
        let rating = Rating::new(4).unwrap();

        api.rate_venue(VenueId(1), rating).await.unwrap();
        api.rate_venue(VenueId(1), rating).await.unwrap();

        assert_eq!(
            backend.requests(),
            vec!["GET /sanctum/csrf-cookie", "POST /api/venues/1/rate", "POST /api/venues/1/rate"]
        );
        for post in &backend.seen()[1..] {
            assert_eq!(post.header("authorization"), Some("Bearer tok123"));
            assert_eq!(post.header("x-xsrf-token"), Some("abc="));
            assert_eq!(post.header("cookie"), Some("XSRF-TOKEN=abc%3D; laravel_session=s1"));
        }
    }

    #[tokio::test]
    async fn test_csrf_mismatch_forces_new_bootstrap() {
        let backend = Backend::start().await;
        let api = backend.client(logged_in());
        let rating = Rating::new(4).unwrap();
        backend.reject_next_post.store(true, Ordering::SeqCst);

        let first = api.rate_venue(VenueId(1), rating).await;
        assert!(matches!(first, Err(ApiError::CsrfMismatch)));
        assert!(api.cached_csrf().is_none());

        api.rate_venue(VenueId(1), rating).await.unwrap();

        assert_eq!(
            backend.requests(),
            vec![
                "GET /sanctum/csrf-cookie",
                "POST /api/venues/1/rate",
                "GET /sanctum/csrf-cookie",
                "POST /api/venues/1/rate",
            ]
        );
    }
}
