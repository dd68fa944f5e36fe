//! User model and related functionality

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User entity
///
/// Users are reference data: they are created administratively (or seeded)
/// and only ever referenced by events, never created by event submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password_hash: Option<String>,
}

/// New user creation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
}
