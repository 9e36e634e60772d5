//! User type

use serde::{Deserialize, Serialize};

use super::UserId;

/// A registered user as returned by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
}
