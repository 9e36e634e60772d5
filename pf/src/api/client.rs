//! PathfinderApi trait definition

use async_trait::async_trait;

use super::{ApiError, AuthResponse, Credentials, NewPlan, Registration, SuggestQuery};
use crate::domain::{Attribute, Plan, PlanId, PlanSummary, Rating, User, Venue, VenueId};

/// The backend REST collaborator
///
/// One method per endpoint. Implementations attach authentication themselves; callers
/// never pass tokens. Ranking and route selection happen on the backend: callers must
/// preserve the order of returned venue lists.
#[async_trait]
pub trait PathfinderApi: Send + Sync {
    /// POST `login`
    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError>;

    /// POST `register`
    async fn register(&self, registration: &Registration) -> Result<AuthResponse, ApiError>;

    /// GET `user` (requires a bearer token)
    async fn current_user(&self) -> Result<User, ApiError>;

    /// GET `venues`
    async fn venues(&self) -> Result<Vec<Venue>, ApiError>;

    /// GET `venues/{id}`
    async fn venue(&self, id: VenueId) -> Result<Venue, ApiError>;

    /// GET `venue_name_search?name=`
    async fn search_venues(&self, name: &str) -> Result<Vec<Venue>, ApiError>;

    /// GET `attributes`
    async fn attributes(&self) -> Result<Vec<Attribute>, ApiError>;

    /// GET `venues/suggest/shortest`, ordered by the backend
    async fn suggest(&self, query: &SuggestQuery) -> Result<Vec<Venue>, ApiError>;

    /// POST `paths`
    async fn create_plan(&self, plan: &NewPlan) -> Result<PlanId, ApiError>;

    /// GET `paths/{id}`
    async fn plan(&self, id: PlanId) -> Result<Plan, ApiError>;

    /// GET `paths/public/all`
    async fn public_plans(&self) -> Result<Vec<PlanSummary>, ApiError>;

    /// GET `paths/public/random`
    async fn random_public_plan(&self) -> Result<Plan, ApiError>;

    /// POST `venues/{id}/rate`
    async fn rate_venue(&self, id: VenueId, rating: Rating) -> Result<(), ApiError>;

    /// GET `venues/{id}/rating`: the current user's rating, if any
    async fn venue_rating(&self, id: VenueId) -> Result<Option<Rating>, ApiError>;

    /// GET `venues/user/favourites`
    async fn favourite_venues(&self) -> Result<Vec<Venue>, ApiError>;
}
