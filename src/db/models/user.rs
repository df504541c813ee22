//! User model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Password hash; never serialized into responses
    #[serde(skip_serializing)]
    pub password: String,
    pub role: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields required to insert a user. `password_hash` must already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
}
