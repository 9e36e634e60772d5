//! Request types and wire shapes for the Pathfinder backend
//!
//! Responses are parsed into private `Wire*` structs and then converted into domain
//! types with validation, so a malformed body fails here instead of at a use site.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::ApiError;
use crate::domain::{
    Attribute, Coordinates, NamedPoint, Plan, PlanId, PlanSummary, Rating, User, UserId, Venue, VenueId,
};

/// Login credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Registration details
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

impl Registration {
    pub fn new(name: impl Into<String>, email: impl Into<String>, password: impl Into<String>) -> Self {
        let password = password.into();
        Self {
            name: name.into(),
            email: email.into(),
            password_confirmation: password.clone(),
            password,
        }
    }
}

/// Successful login/register response
#[derive(Debug, Clone, PartialEq)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// Inputs of a suggestion request
///
/// Also serves as the request key: two equal queries describe the same request.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestQuery {
    pub start: Coordinates,
    pub end: Coordinates,
    /// One attribute set per stop, in stop order
    pub attributes: Vec<Vec<String>>,
}

impl SuggestQuery {
    /// Query string pairs in Laravel bracket form
    ///
    /// `start_coords[0]=lng&start_coords[1]=lat&...&attributes[0][0]=Live Music`
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for (name, coords) in [("start_coords", self.start), ("end_coords", self.end)] {
            for (i, v) in coords.as_lng_lat().iter().enumerate() {
                pairs.push((format!("{name}[{i}]"), v.to_string()));
            }
        }
        for (stop, tags) in self.attributes.iter().enumerate() {
            for (i, tag) in tags.iter().enumerate() {
                pairs.push((format!("attributes[{stop}][{i}]"), tag.clone()));
            }
        }
        pairs
    }
}

/// A plan ready to be created on the backend
#[derive(Debug, Clone, PartialEq)]
pub struct NewPlan {
    pub name: String,
    pub start_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    /// Venue ids in walking order
    pub venues: Vec<VenueId>,
    pub start: NamedPoint,
    pub end: NamedPoint,
}

impl NewPlan {
    /// JSON body for `POST paths`
    pub fn to_body(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "start_date": self.start_date.map(|d| d.format("%Y-%m-%d").to_string()),
            "start_time": self.start_time.map(|t| t.format("%H:%M").to_string()),
            "venues": self.venues,
            "startpoint_name": self.start.name,
            "startpoint_lat": self.start.coordinates.latitude,
            "startpoint_long": self.start.coordinates.longitude,
            "endpoint_name": self.end.name,
            "endpoint_lat": self.end.coordinates.latitude,
            "endpoint_long": self.end.coordinates.longitude,
        })
    }
}

// === Wire shapes ===

/// Bodies may be bare or wrapped in `{"data": ...}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    pub(crate) fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(inner) => inner,
        }
    }
}

/// Decimal columns arrive as JSON numbers or numeric strings
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum Number {
    Float(f64),
    Text(String),
}

impl Number {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Number::Float(v) => Some(*v),
            Number::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Ids arrive as JSON numbers or numeric strings
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum WireId {
    Int(u64),
    Text(String),
}

impl WireId {
    fn parse(&self, what: &str) -> Result<u64, ApiError> {
        match self {
            WireId::Int(v) => Ok(*v),
            WireId::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| ApiError::InvalidResponse(format!("{what} id is not numeric: {s}"))),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireUser {
    id: WireId,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

impl WireUser {
    pub(crate) fn into_domain(self) -> Result<User, ApiError> {
        Ok(User {
            id: UserId(self.id.parse("user")?),
            name: self.name.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireAuth {
    #[serde(alias = "access_token")]
    token: Option<String>,
    user: Option<WireUser>,
}

impl WireAuth {
    pub(crate) fn into_domain(self) -> Result<AuthResponse, ApiError> {
        let token = self
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::InvalidResponse("auth response has no token".to_string()))?;
        let user = self
            .user
            .ok_or_else(|| ApiError::InvalidResponse("auth response has no user".to_string()))?
            .into_domain()?;
        Ok(AuthResponse { token, user })
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum WireAttribute {
    Full { id: WireId, name: String },
    Name(String),
}

impl WireAttribute {
    fn name(&self) -> &str {
        match self {
            WireAttribute::Full { name, .. } => name,
            WireAttribute::Name(name) => name,
        }
    }

    pub(crate) fn into_domain(self) -> Result<Attribute, ApiError> {
        match self {
            WireAttribute::Full { id, name } => Ok(Attribute {
                id: id.parse("attribute")?,
                name,
            }),
            WireAttribute::Name(name) => Ok(Attribute { id: 0, name }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireVenue {
    id: WireId,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default, alias = "lat")]
    latitude: Option<Number>,
    #[serde(default, alias = "long", alias = "lng")]
    longitude: Option<Number>,
    #[serde(default)]
    attributes: Vec<WireAttribute>,
    #[serde(default, alias = "average_rating")]
    rating: Option<Number>,
}

impl WireVenue {
    pub(crate) fn into_domain(self) -> Result<Venue, ApiError> {
        let id = self.id.parse("venue")?;
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| ApiError::InvalidResponse(format!("venue {id} has no name")))?;
        let coordinates = Coordinates::new(
            self.longitude.as_ref().and_then(Number::as_f64).unwrap_or_default(),
            self.latitude.as_ref().and_then(Number::as_f64).unwrap_or_default(),
        );
        if !coordinates.is_valid() {
            return Err(ApiError::InvalidResponse(format!("venue {id} has invalid coordinates")));
        }

        Ok(Venue {
            id: VenueId(id),
            name,
            address: self.address.filter(|a| !a.is_empty()),
            coordinates,
            attributes: self.attributes.iter().map(|a| a.name().to_string()).collect(),
            rating: self.rating.as_ref().and_then(Number::as_f64).map(|r| r as f32),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WirePlan {
    id: WireId,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    start_time: Option<String>,
    #[serde(default)]
    startpoint_name: Option<String>,
    #[serde(default)]
    startpoint_lat: Option<Number>,
    #[serde(default)]
    startpoint_long: Option<Number>,
    #[serde(default)]
    endpoint_name: Option<String>,
    #[serde(default)]
    endpoint_lat: Option<Number>,
    #[serde(default)]
    endpoint_long: Option<Number>,
    #[serde(default)]
    venues: Vec<WireVenue>,
    #[serde(default)]
    venues_count: Option<usize>,
    #[serde(default)]
    is_public: Option<Value>,
}

fn point(name: Option<String>, lat: Option<Number>, long: Option<Number>) -> NamedPoint {
    NamedPoint::new(
        name.unwrap_or_default(),
        Coordinates::new(
            long.as_ref().and_then(Number::as_f64).unwrap_or_default(),
            lat.as_ref().and_then(Number::as_f64).unwrap_or_default(),
        ),
    )
}

fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?.trim();
    // Timestamps like 2024-05-01T00:00:00.000000Z carry the date in the first 10 chars
    NaiveDate::parse_from_str(raw.get(..10).unwrap_or(raw), "%Y-%m-%d").ok()
}

fn parse_time(raw: Option<&str>) -> Option<NaiveTime> {
    let raw = raw?.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0) != 0,
        Some(Value::String(s)) => matches!(s.as_str(), "1" | "true"),
        _ => false,
    }
}

impl WirePlan {
    pub(crate) fn into_domain(self) -> Result<Plan, ApiError> {
        let id = PlanId(self.id.parse("plan")?);
        debug!(%id, venue_count = self.venues.len(), "WirePlan::into_domain: called");
        let venues = self
            .venues
            .into_iter()
            .map(WireVenue::into_domain)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Plan {
            id,
            name: self.name.unwrap_or_default(),
            start_date: parse_date(self.start_date.as_deref()),
            start_time: parse_time(self.start_time.as_deref()),
            start: point(self.startpoint_name, self.startpoint_lat, self.startpoint_long),
            end: point(self.endpoint_name, self.endpoint_lat, self.endpoint_long),
            venues,
            is_public: truthy(self.is_public.as_ref()),
        })
    }

    pub(crate) fn into_summary(self) -> Result<PlanSummary, ApiError> {
        let venue_count = self.venues_count.unwrap_or(self.venues.len());
        Ok(PlanSummary {
            id: PlanId(self.id.parse("plan")?),
            name: self.name.unwrap_or_default(),
            start_date: parse_date(self.start_date.as_deref()),
            start_time: parse_time(self.start_time.as_deref()),
            venue_count,
        })
    }
}

/// Response to a create call: at least the new record's id
#[derive(Debug, Deserialize)]
pub(crate) struct WireCreated {
    id: WireId,
}

impl WireCreated {
    pub(crate) fn plan_id(&self) -> Result<PlanId, ApiError> {
        Ok(PlanId(self.id.parse("plan")?))
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum WireRating {
    Object { rating: Option<Number> },
    Bare(Option<Number>),
}

impl WireRating {
    pub(crate) fn into_domain(self) -> Result<Option<Rating>, ApiError> {
        let raw = match self {
            WireRating::Object { rating } => rating,
            WireRating::Bare(rating) => rating,
        };
        match raw.as_ref().and_then(Number::as_f64) {
            None => Ok(None),
            Some(v) if v == 0.0 => Ok(None),
            Some(v) => Rating::new(v.round() as u8)
                .map(Some)
                .map_err(|e| ApiError::InvalidResponse(e.to_string())),
        }
    }
}

/// Parse a body that may be wrapped in `{"data": ...}`
pub(crate) fn parse_envelope<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    let envelope: Envelope<T> = serde_json::from_str(body)?;
    Ok(envelope.into_inner())
}

pub(crate) fn parse_venues(body: &str) -> Result<Vec<Venue>, ApiError> {
    parse_envelope::<Vec<WireVenue>>(body)?
        .into_iter()
        .map(WireVenue::into_domain)
        .collect()
}
